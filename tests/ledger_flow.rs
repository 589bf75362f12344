//! End-to-end tests for appending, inspecting and validating a ledger

use powledger::blockchain::{Block, Ledger, Payload, SharedLedger, GENESIS_PREV_HASH};
use powledger::cli::{Command, Reply, Session};
use powledger::config::parse_config;
use powledger::miner::{self, CancelToken};
use powledger::{LedgerError, Record};
use rust_decimal::Decimal;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Helper to build a transfer record
fn transfer(sender: &str, receiver: &str, cents: i64) -> Result<Record, LedgerError> {
    Record::new(sender, receiver, Decimal::new(cents, 2))
}

#[test]
fn test_single_transfer_at_difficulty_one() -> TestResult {
    let mut ledger = Ledger::new();
    ledger.set_difficulty(1)?;

    let candidate = Block::new(transfer("Alice", "Bob", 1000)?, 33, ledger.tip_hash());
    ledger.add_block(candidate);

    assert_eq!(ledger.len(), 2);
    let block = ledger.block(1)?;
    assert!(block.hash().starts_with('0'));
    assert_eq!(block.prev_hash(), ledger.genesis().hash());
    assert_eq!(block.creator_id(), 33);
    assert!(ledger.is_valid());

    Ok(())
}

#[test]
fn test_three_block_round_trip() -> TestResult {
    let mut ledger = Ledger::with_difficulty(2)?;
    let first = ledger.add_record(transfer("Chantalle", "Manny Riskin", 1000)?, 33);
    let second = ledger.add_record(transfer("Manny Riskin", "Aunt Emma", 250)?, 12);

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.block(1)?.hash(), first);
    assert_eq!(ledger.block(2)?.prev_hash(), first);
    assert_eq!(ledger.tip_hash(), second);
    assert!(ledger.verify_work(2).is_empty());
    assert!(ledger.validate().is_ok());

    let genesis = ledger.genesis();
    assert!(genesis.is_genesis());
    assert_eq!(genesis.creator_id(), 0);
    assert_eq!(genesis.prev_hash(), GENESIS_PREV_HASH);

    Ok(())
}

#[test]
fn test_inspect_out_of_range() -> TestResult {
    let ledger = Ledger::new();
    assert!(ledger.block(0).is_ok());
    assert_eq!(
        ledger.block(1).err(),
        Some(LedgerError::BlockOutOfRange { index: 1, len: 1 })
    );
    Ok(())
}

#[test]
fn test_negative_difficulty_keeps_previous_value() -> TestResult {
    let mut ledger = Ledger::with_difficulty(3)?;
    assert!(ledger.set_difficulty(-1).is_err());
    assert_eq!(ledger.difficulty(), 3);
    ledger.set_difficulty(0)?;
    assert_eq!(ledger.difficulty(), 0);
    Ok(())
}

#[test]
fn test_add_does_not_check_linkage() -> TestResult {
    let mut ledger = Ledger::with_difficulty(1)?;
    ledger.add_block(Block::new(transfer("Alice", "Bob", 100)?, 7, "not-the-tip"));

    assert_eq!(ledger.len(), 2);
    assert!(!ledger.is_valid());
    assert!(matches!(
        ledger.validate(),
        Err(LedgerError::BrokenLink { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_cancelled_search_leaves_ledger_untouched() -> TestResult {
    let mut ledger = Ledger::with_difficulty(miner::MAX_DIFFICULTY)?;
    let token = CancelToken::new();
    token.cancel();

    let candidate = ledger.candidate(transfer("Alice", "Bob", 100)?, 1);
    let result = ledger.add_block_with_cancel(candidate, &token);

    assert!(matches!(result, Err(LedgerError::MiningCancelled { .. })));
    assert_eq!(ledger.len(), 1);
    Ok(())
}

#[test]
fn test_session_from_config() -> TestResult {
    let config = parse_config(
        r#"
[ledger]
difficulty = 1
genesis_label = "Opening balance"

[[participants]]
name = "Alice"
creator_id = 1

[[participants]]
name = "Bob"
creator_id = 2
"#,
    )?;
    let session = Session::from_config(&config)?;

    let reply = session.execute(Command::Add {
        sender: "alice".to_string(),
        receiver: "bob".to_string(),
        amount: Decimal::new(1000, 2),
    })?;
    let Reply::Added(view) = reply else {
        return Err("expected an added block".into());
    };
    assert_eq!(view.index, 1);
    assert_eq!(view.creator_id, 1);

    let genesis = session.ledger().view(0)?;
    assert!(matches!(
        genesis.payload,
        Payload::Genesis { ref label } if label == "Opening balance"
    ));
    assert!(matches!(
        session.execute(Command::Validate)?,
        Reply::Validation(Ok(()))
    ));
    Ok(())
}

#[test]
fn test_shared_ledger_across_threads() -> TestResult {
    let shared = SharedLedger::new(Ledger::with_difficulty(1)?);
    let handles: Vec<_> = (1..=3u64)
        .map(|creator| {
            let shared = shared.clone();
            std::thread::spawn(move || -> Result<(), LedgerError> {
                for cents in 1..=3 {
                    shared.add_record(transfer("Alice", "Bob", cents)?, creator);
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().map_err(|_| "worker panicked")??;
    }

    assert_eq!(shared.len(), 10);
    assert!(shared.is_valid());
    Ok(())
}
