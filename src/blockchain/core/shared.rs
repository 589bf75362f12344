use crate::error::LedgerError;
use crate::miner::{self, CancelToken};
use crate::record::Record;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use super::block::Block;
use super::chain::{BlockView, Ledger};

/// Cloneable, thread-safe handle to one long-lived [`Ledger`].
///
/// Appends are serialized: the mining search runs under an upgradable read
/// lock (only one holder at a time, readers still proceed), and the lock is
/// upgraded to write for the push. Two appends can therefore never seal
/// against the same tip.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Mine and append a block for `record` at the tip; returns its hash.
    pub fn add_record(&self, record: Record, creator_id: u64) -> String {
        let appended = self.append_with(
            |ledger| ledger.candidate(record, creator_id),
            |block, difficulty| Ok::<_, Infallible>(miner::seal(block, difficulty)),
        );
        match appended {
            Ok(view) => view.hash,
            Err(never) => match never {},
        }
    }

    pub fn add_record_with_cancel(
        &self,
        record: Record,
        creator_id: u64,
        token: &CancelToken,
    ) -> Result<String, LedgerError> {
        self.append_with(
            |ledger| ledger.candidate(record, creator_id),
            |block, difficulty| miner::seal_with_cancel(block, difficulty, token),
        )
        .map(|view| view.hash)
    }

    pub fn add_record_with_deadline(
        &self,
        record: Record,
        creator_id: u64,
        timeout: Duration,
    ) -> Result<String, LedgerError> {
        self.append_with(
            |ledger| ledger.candidate(record, creator_id),
            |block, difficulty| miner::seal_with_deadline(block, difficulty, timeout),
        )
        .map(|view| view.hash)
    }

    /// Append a block for `record` and return its view, searching without a
    /// bound when `timeout` is `None`.
    pub fn append_record(
        &self,
        record: Record,
        creator_id: u64,
        timeout: Option<Duration>,
    ) -> Result<BlockView, LedgerError> {
        self.append_with(
            |ledger| ledger.candidate(record, creator_id),
            |block, difficulty| match timeout {
                Some(timeout) => miner::seal_with_deadline(block, difficulty, timeout),
                None => Ok(miner::seal(block, difficulty)),
            },
        )
    }

    /// Seal and append a caller-built candidate. As with
    /// [`Ledger::add_block`], its `prev_hash` is not checked.
    pub fn add_block(&self, candidate: Block) -> String {
        let appended = self.append_with(
            |_| candidate,
            |block, difficulty| Ok::<_, Infallible>(miner::seal(block, difficulty)),
        );
        match appended {
            Ok(view) => view.hash,
            Err(never) => match never {},
        }
    }

    pub fn add_block_with_cancel(
        &self,
        candidate: Block,
        token: &CancelToken,
    ) -> Result<String, LedgerError> {
        self.append_with(
            |_| candidate,
            |block, difficulty| miner::seal_with_cancel(block, difficulty, token),
        )
        .map(|view| view.hash)
    }

    fn append_with<B, S, E>(&self, build: B, seal: S) -> Result<BlockView, E>
    where
        B: FnOnce(&Ledger) -> Block,
        S: FnOnce(Block, u32) -> Result<Block, E>,
    {
        let guard = self.inner.upgradable_read();
        let candidate = build(&*guard);
        let sealed = seal(candidate, guard.difficulty())?;
        let view = BlockView::new(guard.len(), &sealed);

        let mut ledger = RwLockUpgradableReadGuard::upgrade(guard);
        ledger.push_sealed(sealed);
        Ok(view)
    }

    pub fn is_valid(&self) -> bool {
        self.inner.read().is_valid()
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        self.inner.read().validate()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.inner.read().difficulty()
    }

    pub fn set_difficulty(&self, difficulty: i64) -> Result<(), LedgerError> {
        self.inner.write().set_difficulty(difficulty)
    }

    pub fn tip_hash(&self) -> String {
        self.inner.read().tip_hash()
    }

    pub fn block(&self, index: usize) -> Result<Block, LedgerError> {
        self.inner.read().block(index).cloned()
    }

    pub fn view(&self, index: usize) -> Result<BlockView, LedgerError> {
        self.inner.read().view(index)
    }

    pub fn views(&self) -> Vec<BlockView> {
        self.inner.read().views()
    }

    pub fn verify_work(&self, difficulty: u32) -> Vec<usize> {
        self.inner.read().verify_work(difficulty)
    }

    /// Owned copy of the ledger as it stands now.
    pub fn snapshot(&self) -> Ledger {
        self.inner.read().clone()
    }
}
