//! Property tests for block hashing and sealing

use chrono::{TimeZone, Utc};
use powledger::blockchain::Block;
use powledger::miner;
use powledger::Record;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn party() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,15}[A-Za-z]"
}

fn record(sender: &str, receiver: &str, cents: i64) -> Record {
    Record::new(sender, receiver, Decimal::new(cents, 2)).unwrap()
}

proptest! {
    #[test]
    fn hash_is_deterministic(
        sender in party(),
        receiver in party(),
        cents in 0i64..10_000_000,
        creator in any::<u64>(),
        secs in 0i64..4_000_000_000,
    ) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let a = Block::new_at(record(&sender, &receiver, cents), creator, "0", at);
        let b = Block::new_at(record(&sender, &receiver, cents), creator, "0", at);

        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.hash().len(), 64);
        prop_assert!(a.hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn creator_and_amount_change_hash(
        cents in 0i64..10_000_000,
        creator in 0u64..u64::MAX,
    ) {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let base = Block::new_at(record("Alice", "Bob", cents), creator, "0", at);
        let other_creator = Block::new_at(record("Alice", "Bob", cents), creator + 1, "0", at);
        let other_amount = Block::new_at(record("Alice", "Bob", cents + 1), creator, "0", at);

        prop_assert_ne!(base.hash(), other_creator.hash());
        prop_assert_ne!(base.hash(), other_amount.hash());
    }

    #[test]
    fn prev_hash_and_timestamp_change_hash(prev in "[0-9a-f]{1,64}", secs in 0i64..4_000_000_000) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let later = Utc.timestamp_opt(secs + 1, 0).unwrap();
        let base = Block::new_at(record("Alice", "Bob", 100), 1, prev.clone(), at);
        let other_prev = Block::new_at(record("Alice", "Bob", 100), 1, format!("{}0", prev), at);
        let other_time = Block::new_at(record("Alice", "Bob", 100), 1, prev, later);

        prop_assert_ne!(base.hash(), other_prev.hash());
        prop_assert_ne!(base.hash(), other_time.hash());
    }

    #[test]
    fn sealed_block_meets_target(creator in any::<u64>(), difficulty in 0u32..=2) {
        let block = Block::new(record("Alice", "Bob", 100), creator, "0");
        let sealed = miner::seal(block.clone(), difficulty);

        prop_assert!(sealed.meets_difficulty(difficulty));
        prop_assert!(sealed.hash().starts_with(&"0".repeat(difficulty as usize)));
        prop_assert_eq!(sealed.creator_id(), block.creator_id());
        prop_assert_eq!(sealed.timestamp(), block.timestamp());
        prop_assert!(sealed.nonce() >= block.nonce());
    }
}
