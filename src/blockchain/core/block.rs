use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

/// Version tag mixed into every block hash. Bump when the field encoding
/// below changes.
pub const HASH_ENCODING_TAG: &[u8] = b"powledger/v1";

/// `prev_hash` stored in the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Default sentinel text carried by the genesis block.
pub const GENESIS_LABEL: &str = "Genesis";

/// ISO 8601, UTC, microsecond precision, literal `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const PAYLOAD_TAG_GENESIS: u8 = 0x00;
const PAYLOAD_TAG_RECORD: u8 = 0x01;

/// What a block carries: the genesis sentinel or a real transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Genesis { label: String },
    Record(Record),
}

impl Payload {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Payload::Record(record) => Some(record),
            Payload::Genesis { .. } => None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Payload::Genesis { .. })
    }

    fn encode_into(&self, hasher: &mut Sha256) {
        match self {
            Payload::Genesis { label } => {
                hasher.update([PAYLOAD_TAG_GENESIS]);
                update_field(hasher, label.as_bytes());
            }
            Payload::Record(record) => {
                hasher.update([PAYLOAD_TAG_RECORD]);
                update_field(hasher, record.sender.as_bytes());
                update_field(hasher, record.receiver.as_bytes());
                update_field(hasher, record.canonical_amount().as_bytes());
            }
        }
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Payload::Record(record)
    }
}

/// Length-prefixed so adjacent variable-width fields cannot run into each other.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Format an instant the way block timestamps are stored.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// A ledger entry: one payload plus the metadata that links it into the chain.
///
/// The timestamp is fixed when the block is built. Only the miner changes
/// `nonce`; once a block is handed to a [`Ledger`](super::Ledger) it is never
/// modified again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub(crate) payload: Payload,
    pub(crate) creator_id: u64,
    pub(crate) prev_hash: String,
    pub(crate) timestamp: String,
    pub(crate) nonce: u64,
}

impl Block {
    /// Build an unsealed candidate stamped with the current UTC time.
    pub fn new(record: Record, creator_id: u64, prev_hash: impl Into<String>) -> Self {
        Self::new_at(record, creator_id, prev_hash, Utc::now())
    }

    pub fn new_at(
        record: Record,
        creator_id: u64,
        prev_hash: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Block {
            payload: Payload::Record(record),
            creator_id,
            prev_hash: prev_hash.into(),
            timestamp: format_timestamp(at),
            nonce: 0,
        }
    }

    /// The sentinel first block: creator 0, `prev_hash` "0", nonce 0.
    pub fn genesis(label: impl Into<String>) -> Self {
        Self::genesis_at(label, Utc::now())
    }

    pub fn genesis_at(label: impl Into<String>, at: DateTime<Utc>) -> Self {
        Block {
            payload: Payload::Genesis {
                label: label.into(),
            },
            creator_id: 0,
            prev_hash: GENESIS_PREV_HASH.to_string(),
            timestamp: format_timestamp(at),
            nonce: 0,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn record(&self) -> Option<&Record> {
        self.payload.record()
    }

    pub fn creator_id(&self) -> u64 {
        self.creator_id
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.payload.is_genesis()
    }

    /// SHA-256 over payload, creator id, timestamp, previous hash and nonce,
    /// in that order.
    pub fn hash_bytes(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(HASH_ENCODING_TAG);
        self.payload.encode_into(&mut hasher);
        hasher.update(self.creator_id.to_le_bytes());
        update_field(&mut hasher, self.timestamp.as_bytes());
        update_field(&mut hasher, self.prev_hash.as_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.finalize().into()
    }

    /// Lowercase hex digest of [`Block::hash_bytes`].
    pub fn hash(&self) -> String {
        hex::encode(self.hash_bytes())
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        crate::miner::meets_difficulty(&self.hash_bytes(), difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 28, 10, 15, 30).unwrap()
            + chrono::Duration::microseconds(123_456)
    }

    fn sample_block() -> Block {
        let record = Record::new("Alice", "Bob", Decimal::new(1000, 2)).unwrap();
        Block::new_at(record, 33, "ab".repeat(32), fixed_instant())
    }

    #[test]
    fn test_timestamp_format() {
        let block = sample_block();
        assert_eq!(block.timestamp(), "2023-12-28T10:15:30.123456Z");
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = sample_block().hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.hash(), block.hash());
        assert_eq!(block.hash(), block.clone().hash());
    }

    #[test]
    fn test_every_field_feeds_the_hash() {
        let base = sample_block();
        let original = base.hash();

        let mut changed = base.clone();
        changed.nonce += 1;
        assert_ne!(changed.hash(), original);

        let mut changed = base.clone();
        changed.creator_id = 12;
        assert_ne!(changed.hash(), original);

        let mut changed = base.clone();
        changed.prev_hash = "cd".repeat(32);
        assert_ne!(changed.hash(), original);

        let mut changed = base.clone();
        changed.timestamp = "2023-12-28T10:15:30.123457Z".to_string();
        assert_ne!(changed.hash(), original);

        let mut changed = base.clone();
        changed.payload = Payload::Record(Record::new("Alice", "Bob", Decimal::new(1001, 2)).unwrap());
        assert_ne!(changed.hash(), original);

        let mut changed = base;
        changed.payload = Payload::Record(Record::new("Alice", "Emma", Decimal::new(1000, 2)).unwrap());
        assert_ne!(changed.hash(), original);
    }

    #[test]
    fn test_party_boundaries_are_unambiguous() {
        let at = fixed_instant();
        let a = Block::new_at(Record::new("ab", "c", Decimal::ONE).unwrap(), 1, "0", at);
        let b = Block::new_at(Record::new("a", "bc", Decimal::ONE).unwrap(), 1, "0", at);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_amount_scale_does_not_change_hash() {
        let at = fixed_instant();
        let a = Block::new_at(Record::new("A", "B", Decimal::new(1000, 2)).unwrap(), 1, "0", at);
        let b = Block::new_at(Record::new("A", "B", Decimal::new(10, 0)).unwrap(), 1, "0", at);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_genesis_fields() {
        let genesis = Block::genesis_at(GENESIS_LABEL, fixed_instant());
        assert!(genesis.is_genesis());
        assert!(genesis.record().is_none());
        assert_eq!(genesis.creator_id(), 0);
        assert_eq!(genesis.prev_hash(), "0");
        assert_eq!(genesis.nonce(), 0);
    }

    #[test]
    fn test_genesis_and_record_payloads_differ() {
        let at = fixed_instant();
        let genesis = Block::genesis_at("A", at);
        let mut lookalike = Block::new_at(Record::new("A", "A", Decimal::ZERO).unwrap(), 0, "0", at);
        lookalike.nonce = genesis.nonce;
        assert_ne!(genesis.hash(), lookalike.hash());
    }

    #[test]
    fn test_block_serializes_with_payload_kind() {
        let json = serde_json::to_value(sample_block()).unwrap();
        assert_eq!(json["payload"]["kind"], "record");
        assert_eq!(json["payload"]["sender"], "Alice");
        assert_eq!(json["payload"]["amount"], "10.00");
        assert_eq!(json["creator_id"], 33);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back.hash(), sample_block().hash());
    }
}
