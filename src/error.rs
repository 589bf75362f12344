//! Error types for PowLedger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Block index {index} out of range (ledger has {len} blocks)")]
    BlockOutOfRange { index: usize, len: usize },

    /// The block at `index` does not point at its predecessor's hash.
    #[error("Broken link at block {index}: expected prev_hash {expected}, found {found}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("Mining timed out after {attempts} attempts")]
    MiningTimedOut { attempts: u64 },

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Duplicate participant: {0}")]
    DuplicateParticipant(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::ConfigParse(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
