//! The indexed log source behind historical queries.

use alloy::primitives::B256;
use ethfilter_types::{FilterCriteria, FinalizedBlock, LogEntry};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

/// Error reading from a [`LogSource`].
#[derive(Debug, thiserror::Error)]
pub enum LogSourceError {
    /// The source is temporarily unable to serve reads.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Any other backend failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl LogSourceError {
    /// Wrap a backend error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

/// Read access to finalized blocks and their logs.
///
/// Implementors may return a superset of the logs matching `criteria` from
/// [`LogSource::logs_in_range`], e.g. every log of each block whose bloom
/// passes. Callers re-apply the exact criteria. Returned logs must be in
/// emission order.
pub trait LogSource: Send + Sync + 'static {
    /// Number of the finalized block with this hash, if known.
    fn block_number(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<u64>, LogSourceError>> + Send;

    /// Hash of the finalized block with this number, if known.
    fn block_hash(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<Option<B256>, LogSourceError>> + Send;

    /// Logs of blocks `from..=to` that may match `criteria`.
    fn logs_in_range(
        &self,
        from: u64,
        to: u64,
        criteria: &FilterCriteria,
    ) -> impl Future<Output = Result<Vec<LogEntry>, LogSourceError>> + Send;
}

#[derive(Debug, Default)]
struct MemLogStoreInner {
    blocks: BTreeMap<u64, FinalizedBlock>,
    numbers: HashMap<B256, u64>,
}

/// In-memory [`LogSource`].
///
/// Cloning is cheap; clones share the same blocks.
///
/// ```
/// use alloy::primitives::B256;
/// use ethfilter_rpc::MemLogStore;
/// use ethfilter_types::FinalizedBlock;
///
/// let store = MemLogStore::new();
/// store.append_block(FinalizedBlock::new(1, B256::repeat_byte(1), vec![]));
/// assert_eq!(store.latest(), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemLogStore {
    inner: Arc<RwLock<MemLogStoreInner>>,
}

impl MemLogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finalized block, replacing any block with the same number.
    pub fn append_block(&self, block: FinalizedBlock) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = inner.blocks.remove(&block.number) {
            inner.numbers.remove(&old.hash);
        }
        inner.numbers.insert(block.hash, block.number);
        inner.blocks.insert(block.number, block);
    }

    /// Number of the highest stored block.
    pub fn latest(&self) -> Option<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.blocks.last_key_value().map(|(number, _)| *number)
    }

    fn lookup(&self, hash: B256) -> Option<u64> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).numbers.get(&hash).copied()
    }

    fn hash_of(&self, number: u64) -> Option<B256> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.blocks.get(&number).map(|block| block.hash)
    }

    fn collect(&self, from: u64, to: u64, criteria: &FilterCriteria) -> Vec<LogEntry> {
        if from > to {
            return Vec::new();
        }
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .blocks
            .range(from..=to)
            .flat_map(|(_, block)| block.log_entries())
            .filter(|entry| criteria.matches(entry))
            .collect()
    }
}

impl LogSource for MemLogStore {
    async fn block_number(&self, hash: B256) -> Result<Option<u64>, LogSourceError> {
        Ok(self.lookup(hash))
    }

    async fn block_hash(&self, number: u64) -> Result<Option<B256>, LogSourceError> {
        Ok(self.hash_of(number))
    }

    async fn logs_in_range(
        &self,
        from: u64,
        to: u64,
        criteria: &FilterCriteria,
    ) -> Result<Vec<LogEntry>, LogSourceError> {
        Ok(self.collect(from, to, criteria))
    }
}
