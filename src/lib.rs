//! PowLedger - A minimal append-only proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger itself, validation and the shared handle
//! - [`record`] - Transfer records carried by blocks
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work sealing with cancellation and deadlines
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Command parsing and terminal rendering
//! - [`addressbook`] - Participant directory

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod record;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod addressbook;
pub mod cli;
pub mod config;
pub mod error;

pub use blockchain::{Block, BlockView, Ledger, Payload, SharedLedger};
pub use error::LedgerError;
pub use record::Record;
