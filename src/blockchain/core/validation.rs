use crate::error::LedgerError;
use tracing::{info, warn};

use super::block::Block;
use super::chain::Ledger;

/// Walk `blocks` in order and check that each block's `prev_hash` equals the
/// recomputed hash of its predecessor. Stops at the first mismatch.
///
/// Hashes are recomputed from the stored fields, so an in-place edit to any
/// block except the last shows up as a broken link on its successor.
pub fn validate_chain(blocks: &[Block]) -> Result<(), LedgerError> {
    let Some(first) = blocks.first() else {
        return Ok(());
    };

    let mut block_hash = first.hash();
    for (index, block) in blocks.iter().enumerate().skip(1) {
        if block.prev_hash != block_hash {
            return Err(LedgerError::BrokenLink {
                index,
                expected: block_hash,
                found: block.prev_hash.clone(),
            });
        }
        block_hash = block.hash();
    }
    Ok(())
}

impl Ledger {
    /// Same walk as [`Ledger::is_valid`], reporting where the chain breaks.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_chain(&self.blocks)
    }

    /// True when every block links to the hash of the one before it.
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => {
                info!(blocks = self.len(), "ledger is valid");
                true
            }
            Err(e) => {
                warn!(blocks = self.len(), "ledger is invalid: {}", e);
                false
            }
        }
    }
}
