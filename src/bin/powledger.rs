#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use powledger::cli::{render, Command, Reply, Session, HELP};
use powledger::config::{load_config_from, DEFAULT_CONFIG_PATH};
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Append-only proof-of-work ledger", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured difficulty
    #[arg(long, allow_hyphen_values = true)]
    difficulty: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine a few sample transfers and print the resulting ledger
    Demo,
    /// Interactive session against one in-memory ledger
    Shell,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let session = Session::from_config(&config)?;
    if let Some(difficulty) = cli.difficulty {
        session.ledger().set_difficulty(difficulty)?;
    }

    match cli.command {
        Commands::Demo => demo(&session),
        Commands::Shell => shell(&session),
    }
}

fn demo(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "PowLedger demo".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());

    let transfers = [
        ("Chantalle", "Manny Riskin", Decimal::new(1000, 2)),
        ("Leah Belfort", "Jordan Belfort", Decimal::new(2550, 2)),
        ("Aunt Emma", "Chantalle", Decimal::new(499, 2)),
    ];

    for (sender, receiver, amount) in transfers {
        let command = Command::Add {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
        };
        println!("{}", run(session, command)?);
    }

    println!("{}", run(session, Command::List)?);
    println!("{}", run(session, Command::Validate)?);
    Ok(())
}

fn shell(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "PowLedger shell".bright_cyan().bold());
    println!(
        "Difficulty {}, {} participants. Type {} for commands.",
        session.ledger().difficulty().to_string().yellow(),
        session.address_book().len(),
        "help".bright_white()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", "ledger>".bright_green());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if command == Command::Help {
            println!("{}", HELP);
            continue;
        }

        match run(session, command) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }
    Ok(())
}

/// Execute one command, showing a spinner while a block is being mined.
fn run(session: &Session, command: Command) -> Result<String, powledger::LedgerError> {
    let spinner = matches!(command, Command::Add { .. }).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!(
            "Mining at difficulty {}...",
            session.ledger().difficulty()
        ));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let reply = session.execute(command);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let reply: Reply = reply?;
    render(&reply)
}
