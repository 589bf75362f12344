use crate::error::LedgerError;
use crate::miner::{self, CancelToken, MiningStats, MAX_DIFFICULTY};
use crate::record::Record;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::block::{Block, Payload, GENESIS_LABEL};

/// Difficulty used when none is configured.
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// An append-only sequence of sealed blocks plus the current mining target.
///
/// `add_block` trusts the caller to have pointed the candidate at the current
/// tip: nothing is checked at append time. Linkage is only verified when
/// [`Ledger::is_valid`] or [`Ledger::validate`] walks the chain, which keeps
/// mining and validation independent of each other.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) blocks: Vec<Block>,
    difficulty: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create a ledger holding only a genesis block, at the default difficulty.
    pub fn new() -> Self {
        Self::from_genesis(Block::genesis(GENESIS_LABEL), DEFAULT_DIFFICULTY)
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Self, LedgerError> {
        Self::with_genesis(Block::genesis(GENESIS_LABEL), difficulty)
    }

    /// Start a chain from an explicit genesis block. The genesis block is
    /// taken as-is and never mined.
    pub fn with_genesis(genesis: Block, difficulty: u32) -> Result<Self, LedgerError> {
        check_difficulty(difficulty)?;
        Ok(Self::from_genesis(genesis, difficulty))
    }

    fn from_genesis(genesis: Block, difficulty: u32) -> Self {
        info!(genesis = %genesis.hash(), difficulty, "initializing ledger");
        Ledger {
            blocks: vec![genesis],
            difficulty,
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Change the target used by subsequent appends. Negative values and
    /// values beyond the digest length are configuration errors.
    pub fn set_difficulty(&mut self, difficulty: i64) -> Result<(), LedgerError> {
        if difficulty < 0 {
            return Err(LedgerError::InvalidConfig(format!(
                "Difficulty cannot be negative: {}",
                difficulty
            )));
        }
        let difficulty = u32::try_from(difficulty).map_err(|_| {
            LedgerError::InvalidConfig(format!("Difficulty out of range: {}", difficulty))
        })?;
        check_difficulty(difficulty)?;
        self.difficulty = difficulty;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a ledger holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn tip(&self) -> &Block {
        // blocks is never empty: constructors push genesis and nothing removes
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> String {
        self.tip().hash()
    }

    pub fn block(&self, index: usize) -> Result<&Block, LedgerError> {
        self.blocks.get(index).ok_or(LedgerError::BlockOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    /// Build an unsealed candidate that points at the current tip.
    pub fn candidate(&self, record: Record, creator_id: u64) -> Block {
        Block::new(record, creator_id, self.tip_hash())
    }

    /// Seal `candidate` at the current difficulty and append it.
    ///
    /// The candidate's `prev_hash` is not checked; see the type docs.
    pub fn add_block(&mut self, candidate: Block) -> MiningStats {
        let (sealed, stats) = miner::seal_with_stats(candidate, self.difficulty);
        self.push_sealed(sealed);
        stats
    }

    /// Cancellable [`Ledger::add_block`]. On cancellation the ledger is left
    /// untouched.
    pub fn add_block_with_cancel(
        &mut self,
        candidate: Block,
        token: &CancelToken,
    ) -> Result<(), LedgerError> {
        let sealed = miner::seal_with_cancel(candidate, self.difficulty, token)?;
        self.push_sealed(sealed);
        Ok(())
    }

    /// [`Ledger::add_block`] that gives up once `timeout` has elapsed. On
    /// timeout the ledger is left untouched.
    pub fn add_block_with_deadline(
        &mut self,
        candidate: Block,
        timeout: Duration,
    ) -> Result<(), LedgerError> {
        let sealed = miner::seal_with_deadline(candidate, self.difficulty, timeout)?;
        self.push_sealed(sealed);
        Ok(())
    }

    /// Append a block for `record` linked to the current tip and return the
    /// sealed block's hash.
    pub fn add_record(&mut self, record: Record, creator_id: u64) -> String {
        let candidate = self.candidate(record, creator_id);
        self.add_block(candidate);
        self.tip_hash()
    }

    pub(crate) fn push_sealed(&mut self, block: Block) {
        info!(
            index = self.blocks.len(),
            hash = %block.hash(),
            nonce = block.nonce,
            creator_id = block.creator_id,
            "block appended"
        );
        self.blocks.push(block);
    }

    /// Indexes of non-genesis blocks whose hash no longer carries
    /// `difficulty` leading zeros.
    pub fn verify_work(&self, difficulty: u32) -> Vec<usize> {
        self.blocks
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, block)| !block.meets_difficulty(difficulty))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn view(&self, index: usize) -> Result<BlockView, LedgerError> {
        self.block(index).map(|block| BlockView::new(index, block))
    }

    pub fn views(&self) -> Vec<BlockView> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| BlockView::new(index, block))
            .collect()
    }
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

/// Read-only projection of a block for display and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockView {
    pub index: usize,
    pub hash: String,
    pub prev_hash: String,
    pub timestamp: String,
    pub creator_id: u64,
    pub nonce: u64,
    pub payload: Payload,
}

impl BlockView {
    pub fn new(index: usize, block: &Block) -> Self {
        BlockView {
            index,
            hash: block.hash(),
            prev_hash: block.prev_hash.clone(),
            timestamp: block.timestamp.clone(),
            creator_id: block.creator_id,
            nonce: block.nonce,
            payload: block.payload.clone(),
        }
    }
}
