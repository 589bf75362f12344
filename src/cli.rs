//! Command parsing, session state and table rendering shared by the CLI
//!
//! A [`Session`] owns the one [`SharedLedger`] a process works against and
//! turns parsed [`Command`]s into [`Reply`] values; [`render`] formats replies
//! for a terminal.

use crate::addressbook::{AddressBook, Participant};
use crate::blockchain::{BlockView, Payload, SharedLedger};
use crate::config::Config;
use crate::error::LedgerError;
use crate::record::{parse_amount, Record};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use rust_decimal::Decimal;
use std::time::Duration;

pub const HELP: &str = r#"Commands:
  add <sender> <receiver> <amount>   mine a block for a transfer (quote names with spaces)
  validate                           check every block links to its predecessor
  inspect <index> [--json]           show one block
  list                               show the whole ledger
  difficulty <n>                     set leading-zero target for new blocks
  participants                       show the address book
  help                               show this text
  quit                               leave the session"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        sender: String,
        receiver: String,
        amount: Decimal,
    },
    Validate,
    Inspect {
        index: usize,
        json: bool,
    },
    List,
    Difficulty(i64),
    Participants,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, LedgerError> {
        let words = tokenize(line)?;
        let Some((head, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (head.to_lowercase().as_str(), args) {
            ("add", [sender, receiver, amount]) => Command::Add {
                sender: sender.clone(),
                receiver: receiver.clone(),
                amount: parse_amount(amount)?,
            },
            ("add", _) => return Err(usage("add <sender> <receiver> <amount>")),
            ("validate", []) => Command::Validate,
            ("inspect", [index]) => Command::Inspect {
                index: parse_index(index)?,
                json: false,
            },
            ("inspect", [index, flag]) if flag == "--json" => Command::Inspect {
                index: parse_index(index)?,
                json: true,
            },
            ("inspect", _) => return Err(usage("inspect <index> [--json]")),
            ("list", []) => Command::List,
            ("difficulty", [value]) => Command::Difficulty(value.parse().map_err(|_| {
                LedgerError::InvalidConfig(format!("Difficulty must be an integer: {}", value))
            })?),
            ("difficulty", _) => return Err(usage("difficulty <n>")),
            ("participants", []) => Command::Participants,
            ("help", _) => Command::Help,
            ("quit", []) | ("exit", []) => Command::Quit,
            (other, _) => {
                return Err(LedgerError::InvalidConfig(format!(
                    "Unknown command '{}'; type 'help'",
                    other
                )))
            }
        };
        Ok(Some(command))
    }
}

fn usage(form: &str) -> LedgerError {
    LedgerError::InvalidConfig(format!("Usage: {}", form))
}

fn parse_index(text: &str) -> Result<usize, LedgerError> {
    text.parse()
        .map_err(|_| LedgerError::InvalidConfig(format!("Block index must be a number: {}", text)))
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, LedgerError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err(LedgerError::InvalidConfig("Unterminated quote".to_string()));
    }
    if pending {
        words.push(current);
    }
    Ok(words)
}

/// Result of executing a command, ready for [`render`].
#[derive(Debug, Clone)]
pub enum Reply {
    Added(BlockView),
    Validation(Result<(), LedgerError>),
    Block { view: BlockView, json: bool },
    Ledger(Vec<BlockView>),
    DifficultySet(u32),
    Participants(Vec<Participant>),
    Help,
    Quit,
}

/// One long-lived ledger plus the collaborators that feed it.
#[derive(Debug, Clone)]
pub struct Session {
    ledger: SharedLedger,
    book: AddressBook,
    mining_timeout: Option<Duration>,
}

impl Session {
    pub fn new(ledger: SharedLedger, book: AddressBook, mining_timeout: Option<Duration>) -> Self {
        Session {
            ledger,
            book,
            mining_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, LedgerError> {
        Ok(Session::new(
            SharedLedger::new(config.build_ledger()?),
            config.address_book()?,
            config.mining_timeout(),
        ))
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    pub fn execute(&self, command: Command) -> Result<Reply, LedgerError> {
        match command {
            Command::Add {
                sender,
                receiver,
                amount,
            } => self.add(&sender, &receiver, amount).map(Reply::Added),
            Command::Validate => Ok(Reply::Validation(self.ledger.validate())),
            Command::Inspect { index, json } => Ok(Reply::Block {
                view: self.ledger.view(index)?,
                json,
            }),
            Command::List => Ok(Reply::Ledger(self.ledger.views())),
            Command::Difficulty(value) => {
                self.ledger.set_difficulty(value)?;
                Ok(Reply::DifficultySet(self.ledger.difficulty()))
            }
            Command::Participants => Ok(Reply::Participants(self.book.list())),
            Command::Help => Ok(Reply::Help),
            Command::Quit => Ok(Reply::Quit),
        }
    }

    /// Resolve both parties, stamp the sender's creator id, then mine.
    pub fn add(&self, sender: &str, receiver: &str, amount: Decimal) -> Result<BlockView, LedgerError> {
        let sender = self.book.resolve(sender)?;
        let receiver = self.book.resolve(receiver)?;
        if amount.is_zero() {
            return Err(LedgerError::InvalidRecord(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let record = Record::new(sender.name, receiver.name, amount)?;
        self.ledger
            .append_record(record, sender.creator_id, self.mining_timeout)
    }
}

/// Shorten a 64-char hash for table cells.
pub fn format_hash(hash: &str) -> String {
    if hash.len() > 20 {
        format!("{}...{}", &hash[..10], &hash[hash.len() - 10..])
    } else {
        hash.to_string()
    }
}

fn payload_columns(payload: &Payload) -> (String, String, String) {
    match payload {
        Payload::Genesis { label } => (label.clone(), "-".to_string(), "-".to_string()),
        Payload::Record(record) => (
            record.sender().to_string(),
            record.receiver().to_string(),
            format!("{:.2}", record.amount()),
        ),
    }
}

pub fn ledger_table(views: &[BlockView]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
            Cell::new("Creator").add_attribute(Attribute::Bold),
            Cell::new("Sender").add_attribute(Attribute::Bold),
            Cell::new("Receiver").add_attribute(Attribute::Bold),
            Cell::new("Amount").add_attribute(Attribute::Bold),
            Cell::new("Nonce").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
        ]);

    for view in views {
        let (sender, receiver, amount) = payload_columns(&view.payload);
        let color = if view.payload.is_genesis() {
            TableColor::Yellow
        } else {
            TableColor::Green
        };
        table.add_row(vec![
            Cell::new(view.index),
            Cell::new(&view.timestamp),
            Cell::new(view.creator_id),
            Cell::new(sender).fg(color),
            Cell::new(receiver),
            Cell::new(amount),
            Cell::new(view.nonce),
            Cell::new(format_hash(&view.hash)).fg(TableColor::Cyan),
        ]);
    }
    table
}

pub fn block_table(view: &BlockView) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

    table.add_row(vec!["Record #".to_string(), view.index.to_string()]);
    table.add_row(vec!["Created".to_string(), view.timestamp.clone()]);
    table.add_row(vec!["Creator Id".to_string(), view.creator_id.to_string()]);
    table.add_row(vec!["Previous Hash".to_string(), view.prev_hash.clone()]);
    table.add_row(vec!["Hash".to_string(), view.hash.clone()]);
    table.add_row(vec!["Nonce".to_string(), view.nonce.to_string()]);
    match &view.payload {
        Payload::Genesis { label } => {
            table.add_row(vec!["Record".to_string(), label.clone()]);
        }
        Payload::Record(record) => {
            table.add_row(vec!["Sender".to_string(), record.sender().to_string()]);
            table.add_row(vec!["Receiver".to_string(), record.receiver().to_string()]);
            table.add_row(vec!["Amount".to_string(), format!("{:.2}", record.amount())]);
        }
    }
    table
}

pub fn participants_table(participants: &[Participant]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Creator Id").add_attribute(Attribute::Bold),
    ]);
    for participant in participants {
        table.add_row(vec![
            Cell::new(&participant.name),
            Cell::new(participant.creator_id),
        ]);
    }
    table
}

/// Format a reply for the terminal.
pub fn render(reply: &Reply) -> Result<String, LedgerError> {
    let text = match reply {
        Reply::Added(view) => {
            let (sender, receiver, amount) = payload_columns(&view.payload);
            format!(
                "{} Block #{} from {} to {} amount ${} (nonce {})\n  Reference: {}",
                "✅".green(),
                view.index,
                sender.bold(),
                receiver.bold(),
                amount,
                view.nonce,
                view.hash.cyan()
            )
        }
        Reply::Validation(Ok(())) => format!("{}", "✅ Chain validation passed".green().bold()),
        Reply::Validation(Err(e)) => format!(
            "{}\n  {}",
            "🚨 Chain validation failed".red().bold(),
            e.to_string().red()
        ),
        Reply::Block { view, json: true } => serde_json::to_string_pretty(view)
            .map_err(|e| LedgerError::Io(format!("Failed to serialize block: {}", e)))?,
        Reply::Block { view, json: false } => block_table(view).to_string(),
        Reply::Ledger(views) => ledger_table(views).to_string(),
        Reply::DifficultySet(difficulty) => format!(
            "Difficulty target set to {} leading zero{}",
            difficulty.to_string().yellow(),
            if *difficulty == 1 { "" } else { "s" }
        ),
        Reply::Participants(participants) => participants_table(participants).to_string(),
        Reply::Help => HELP.to_string(),
        Reply::Quit => String::new(),
    };
    Ok(text)
}
