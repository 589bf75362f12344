//! Directory of known participants
//!
//! Resolves the names a front end offers for selection to the numeric
//! creator ids stamped on blocks. Lookups are case-insensitive.

use crate::error::LedgerError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const MAX_NAME_LENGTH: usize = 64;

/// Creator id carried by the genesis block; not assignable to participants.
pub const RESERVED_CREATOR_ID: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Display name (case-preserved)
    pub name: String,
    pub creator_id: u64,
}

impl Participant {
    pub fn new(name: impl Into<String>, creator_id: u64) -> Result<Self, LedgerError> {
        let name = name.into().trim().to_string();
        validate_name(&name)?;
        if creator_id == RESERVED_CREATOR_ID {
            return Err(LedgerError::InvalidConfig(format!(
                "Creator id {} is reserved for the genesis block",
                RESERVED_CREATOR_ID
            )));
        }
        Ok(Participant { name, creator_id })
    }
}

/// The participants a fresh installation starts with.
pub fn default_participants() -> Vec<Participant> {
    [
        ("Chantalle", 33),
        ("Manny Riskin", 12),
        ("Jordan Belfort", 68),
        ("Leah Belfort", 42),
        ("Aunt Emma", 59),
    ]
    .into_iter()
    .map(|(name, creator_id)| Participant {
        name: name.to_string(),
        creator_id,
    })
    .collect()
}

/// Thread-safe participant directory
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    inner: Arc<RwLock<AddressBookInner>>,
}

#[derive(Debug, Default)]
struct AddressBookInner {
    /// Entries keyed by lowercase name
    entries: HashMap<String, Participant>,

    /// Reverse index: creator id -> key
    id_index: HashMap<u64, String>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut inner = AddressBookInner::default();
        for participant in default_participants() {
            let key = participant.name.to_lowercase();
            inner.id_index.insert(participant.creator_id, key.clone());
            inner.entries.insert(key, participant);
        }
        AddressBook {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub fn from_participants(participants: Vec<Participant>) -> Result<Self, LedgerError> {
        let book = Self::new();
        for participant in participants {
            book.insert(Participant::new(participant.name, participant.creator_id)?)?;
        }
        Ok(book)
    }

    /// Add a participant. Names and creator ids must both be unique.
    pub fn add(&self, name: impl Into<String>, creator_id: u64) -> Result<(), LedgerError> {
        self.insert(Participant::new(name, creator_id)?)
    }

    fn insert(&self, participant: Participant) -> Result<(), LedgerError> {
        let mut inner = self.inner.write();
        let key = participant.name.to_lowercase();

        if inner.entries.contains_key(&key) {
            return Err(LedgerError::DuplicateParticipant(format!(
                "Name '{}' already exists",
                participant.name
            )));
        }

        if let Some(existing) = inner
            .id_index
            .get(&participant.creator_id)
            .and_then(|k| inner.entries.get(k))
        {
            return Err(LedgerError::DuplicateParticipant(format!(
                "Creator id {} already belongs to '{}'",
                participant.creator_id, existing.name
            )));
        }

        inner.id_index.insert(participant.creator_id, key.clone());
        inner.entries.insert(key, participant);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<Participant, LedgerError> {
        let mut inner = self.inner.write();
        let participant = inner
            .entries
            .remove(&name.trim().to_lowercase())
            .ok_or_else(|| LedgerError::UnknownParticipant(name.to_string()))?;
        inner.id_index.remove(&participant.creator_id);
        Ok(participant)
    }

    pub fn get(&self, name: &str) -> Option<Participant> {
        let inner = self.inner.read();
        inner.entries.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn get_by_id(&self, creator_id: u64) -> Option<Participant> {
        let inner = self.inner.read();
        inner
            .id_index
            .get(&creator_id)
            .and_then(|key| inner.entries.get(key).cloned())
    }

    /// Like [`AddressBook::get`], but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<Participant, LedgerError> {
        self.get(name)
            .ok_or_else(|| LedgerError::UnknownParticipant(name.trim().to_string()))
    }

    /// All participants sorted by name
    pub fn list(&self) -> Vec<Participant> {
        let inner = self.inner.read();
        let mut entries: Vec<_> = inner.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_name(name: &str) -> Result<(), LedgerError> {
    if name.is_empty() {
        return Err(LedgerError::InvalidConfig(
            "Participant name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(LedgerError::InvalidConfig(format!(
            "Participant name too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(LedgerError::InvalidConfig(
            "Participant name contains control characters".to_string(),
        ));
    }
    Ok(())
}
