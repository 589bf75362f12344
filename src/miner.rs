//! Proof-of-work search over a block's nonce
//!
//! Difficulty counts leading hexadecimal `'0'` characters in the block hash,
//! so each extra unit multiplies the expected work by 16. Difficulty 0 is
//! satisfied by any hash.

use crate::blockchain::{Block, Sha256Hash};
use crate::error::LedgerError;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A SHA-256 hex digest has 64 characters; no hash can carry more zeros.
pub const MAX_DIFFICULTY: u32 = 64;

/// How many nonces are tried between cancellation/deadline checks.
pub const CHECK_INTERVAL: u64 = 1024;

/// Count of leading `'0'` characters in the hex rendering of `hash`.
pub fn leading_hex_zeros(hash: &Sha256Hash) -> u32 {
    let mut zeros = 0;
    for byte in hash {
        if *byte == 0 {
            zeros += 2;
        } else {
            if *byte < 0x10 {
                zeros += 1;
            }
            break;
        }
    }
    zeros
}

pub fn meets_difficulty(hash: &Sha256Hash, difficulty: u32) -> bool {
    leading_hex_zeros(hash) >= difficulty
}

/// Shared flag used to abort a running search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can be reused for the next search.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Outcome counters for a finished search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningStats {
    /// Hashes computed, including the final successful one.
    pub attempts: u64,
    pub elapsed: Duration,
}

impl MiningStats {
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

/// Increment `nonce` until the block hash meets `difficulty`.
///
/// Blocks the calling thread until a nonce is found and cannot fail. A
/// difficulty above [`MAX_DIFFICULTY`] never completes; callers that accept
/// untrusted difficulty should validate it or use [`seal_with_cancel`].
pub fn seal(block: Block, difficulty: u32) -> Block {
    seal_with_stats(block, difficulty).0
}

pub fn seal_with_stats(block: Block, difficulty: u32) -> (Block, MiningStats) {
    match search::<Infallible, _>(block, difficulty, |_| None) {
        Ok(sealed) => sealed,
        Err(never) => match never {},
    }
}

/// Like [`seal`], but gives up with [`LedgerError::MiningCancelled`] once
/// `token` is cancelled.
pub fn seal_with_cancel(
    block: Block,
    difficulty: u32,
    token: &CancelToken,
) -> Result<Block, LedgerError> {
    check_difficulty(difficulty)?;
    search(block, difficulty, |attempts| {
        token
            .is_cancelled()
            .then_some(LedgerError::MiningCancelled { attempts })
    })
    .map(|(sealed, _)| sealed)
}

/// Like [`seal`], but gives up with [`LedgerError::MiningTimedOut`] once
/// `timeout` has elapsed.
pub fn seal_with_deadline(
    block: Block,
    difficulty: u32,
    timeout: Duration,
) -> Result<Block, LedgerError> {
    check_difficulty(difficulty)?;
    let deadline = Instant::now() + timeout;
    search(block, difficulty, |attempts| {
        (Instant::now() >= deadline).then_some(LedgerError::MiningTimedOut { attempts })
    })
    .map(|(sealed, _)| sealed)
}

fn check_difficulty(difficulty: u32) -> Result<(), LedgerError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(LedgerError::InvalidConfig(format!(
            "Difficulty {} exceeds maximum {}",
            difficulty, MAX_DIFFICULTY
        )));
    }
    Ok(())
}

fn search<E, F>(
    mut block: Block,
    difficulty: u32,
    mut interrupt: F,
) -> Result<(Block, MiningStats), E>
where
    F: FnMut(u64) -> Option<E>,
{
    let start = Instant::now();
    let starting_nonce = block.nonce;
    debug!(difficulty, starting_nonce, "starting proof-of-work search");

    let mut attempts: u64 = 1;
    while !meets_difficulty(&block.hash_bytes(), difficulty) {
        if attempts % CHECK_INTERVAL == 0 {
            if let Some(err) = interrupt(attempts) {
                debug!(difficulty, attempts, "proof-of-work search interrupted");
                return Err(err);
            }
        }
        block.nonce = block.nonce.wrapping_add(1);
        attempts += 1;
    }

    let stats = MiningStats {
        attempts,
        elapsed: start.elapsed(),
    };
    debug!(
        difficulty,
        nonce = block.nonce,
        attempts,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "block sealed"
    );
    Ok((block, stats))
}
