//! Configuration management for PowLedger

use crate::addressbook::{default_participants, AddressBook, Participant};
use crate::blockchain::{Block, Ledger, DEFAULT_DIFFICULTY, GENESIS_LABEL};
use crate::error::LedgerError;
use crate::miner::MAX_DIFFICULTY;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "powledger.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default = "default_participants")]
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Negative values are rejected by [`Config::validate`].
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    #[serde(default = "default_genesis_label")]
    pub genesis_label: String,
    /// Abandon a proof-of-work search after this many seconds. Unset means
    /// search until a nonce is found.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ledger: LedgerSettings::default(),
            participants: default_participants(),
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            difficulty: default_difficulty(),
            genesis_label: default_genesis_label(),
            mining_timeout_secs: None,
        }
    }
}

fn default_difficulty() -> i64 {
    i64::from(DEFAULT_DIFFICULTY)
}

fn default_genesis_label() -> String {
    GENESIS_LABEL.to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.difficulty()?;

        if self.ledger.genesis_label.trim().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "ledger.genesis_label must not be empty".to_string(),
            ));
        }

        if self.ledger.mining_timeout_secs == Some(0) {
            return Err(LedgerError::InvalidConfig(
                "ledger.mining_timeout_secs must be greater than zero".to_string(),
            ));
        }

        // Rejects duplicate or malformed participants
        self.address_book()?;
        Ok(())
    }

    /// The configured difficulty as a mining target.
    pub fn difficulty(&self) -> Result<u32, LedgerError> {
        let difficulty = self.ledger.difficulty;
        match u32::try_from(difficulty) {
            Ok(target) if target <= MAX_DIFFICULTY => Ok(target),
            Ok(_) => Err(LedgerError::InvalidConfig(format!(
                "ledger.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, difficulty
            ))),
            Err(_) if difficulty < 0 => Err(LedgerError::InvalidConfig(format!(
                "ledger.difficulty cannot be negative, got {}",
                difficulty
            ))),
            Err(_) => Err(LedgerError::InvalidConfig(format!(
                "ledger.difficulty out of range: {}",
                difficulty
            ))),
        }
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.ledger.mining_timeout_secs.map(Duration::from_secs)
    }

    /// A fresh genesis-only ledger built from these settings.
    pub fn build_ledger(&self) -> Result<Ledger, LedgerError> {
        Ledger::with_genesis(
            Block::genesis(self.ledger.genesis_label.trim()),
            self.difficulty()?,
        )
    }

    pub fn address_book(&self) -> Result<AddressBook, LedgerError> {
        AddressBook::from_participants(self.participants.clone())
    }
}

/// Parse and validate configuration text.
pub fn parse_config(text: &str) -> Result<Config, LedgerError> {
    let config: Config = if text.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(text)?
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`. A missing or empty file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, LedgerError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    parse_config(&text)
}

pub fn load_config() -> Result<Config, LedgerError> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.difficulty().unwrap(), DEFAULT_DIFFICULTY);
        assert_eq!(config.ledger.genesis_label, GENESIS_LABEL);
        assert!(config.mining_timeout().is_none());
        assert_eq!(config.participants.len(), 5);
    }

    #[test]
    fn test_empty_text_yields_defaults() {
        let config = parse_config("   \n").unwrap();
        assert_eq!(config.difficulty().unwrap(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("powledger.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[ledger]
difficulty = 3
genesis_label = "Origin"
mining_timeout_secs = 10

[[participants]]
name = "Alice"
creator_id = 1

[[participants]]
name = "Bob"
creator_id = 2
"#
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.ledger.difficulty, 3);
        assert_eq!(config.mining_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.participants.len(), 2);

        let ledger = config.build_ledger().unwrap();
        assert_eq!(ledger.difficulty(), 3);
        assert_eq!(ledger.len(), 1);
        assert!(matches!(
            ledger.genesis().payload(),
            crate::blockchain::Payload::Genesis { label } if label == "Origin"
        ));

        let book = config.address_book().unwrap();
        assert_eq!(book.resolve("bob").unwrap().creator_id, 2);
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config = parse_config("[ledger]\ndifficulty = 1\n").unwrap();
        assert_eq!(config.ledger.difficulty, 1);
        assert_eq!(config.ledger.genesis_label, GENESIS_LABEL);
        assert_eq!(config.participants.len(), 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_config("[ledger]\ndifficulty = 65\n"),
            Err(LedgerError::InvalidConfig(_))
        ));
        assert!(parse_config("[ledger]\ngenesis_label = \" \"\n").is_err());
        assert!(parse_config("[ledger]\nmining_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_negative_difficulty_is_a_config_error() {
        assert!(matches!(
            parse_config("[ledger]\ndifficulty = -1\n"),
            Err(LedgerError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_config("[ledger]\ndifficulty = 5000000000\n"),
            Err(LedgerError::InvalidConfig(_))
        ));

        let config = Config {
            ledger: LedgerSettings {
                difficulty: -3,
                ..LedgerSettings::default()
            },
            ..Config::default()
        };
        assert!(matches!(
            config.build_ledger(),
            Err(LedgerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_participants_rejected() {
        let text = r#"
[[participants]]
name = "Alice"
creator_id = 1

[[participants]]
name = "alice"
creator_id = 2
"#;
        assert!(matches!(
            parse_config(text),
            Err(LedgerError::DuplicateParticipant(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            parse_config("[ledger\n"),
            Err(LedgerError::ConfigParse(_))
        ));
    }
}
