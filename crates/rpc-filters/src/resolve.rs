//! Chain head tracking and block range resolution.
//!
//! [`ChainHead`] holds the externally-updated height of the canonical chain.
//! [`resolve`] turns a [`BlockSelector`] into a concrete inclusive range of
//! block numbers against that height.

use crate::FilterError;
use ethfilter_types::{BlockSelector, BlockTag, CriteriaError};
use std::{
    ops::RangeInclusive,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Externally-updated chain height.
///
/// The height is an `Arc<AtomicU64>` that the change feed advances as blocks
/// are finalized. The RPC layer reads it atomically for tag resolution.
///
/// # Example
///
/// ```
/// use ethfilter_rpc::ChainHead;
///
/// let head = ChainHead::new(100);
/// assert_eq!(head.latest(), 100);
///
/// head.set_latest(101);
/// assert_eq!(head.latest(), 101);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainHead {
    latest: Arc<AtomicU64>,
}

impl ChainHead {
    /// Create a new chain head at the given height.
    pub fn new(latest: u64) -> Self {
        Self { latest: Arc::new(AtomicU64::new(latest)) }
    }

    /// Get the latest block number.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Set the latest block number.
    pub fn set_latest(&self, n: u64) {
        self.latest.store(n, Ordering::Release);
    }
}

/// How numeric bounds beyond the chain height are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolveMode {
    /// A numeric bound above the chain height is [`FilterError::UnknownBlock`].
    Strict,
    /// A numeric bound above the chain height is clamped to it.
    Clamped,
}

/// An inclusive range of block numbers. Empty when `from > to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedRange {
    pub(crate) from: u64,
    pub(crate) to: u64,
}

impl ResolvedRange {
    pub(crate) const fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub(crate) const fn single(number: u64) -> Self {
        Self::new(number, number)
    }

    /// True if the range contains no blocks.
    pub(crate) const fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Number of blocks in the range.
    pub(crate) const fn len(&self) -> u64 {
        if self.is_empty() { 0 } else { self.to - self.from + 1 }
    }

    pub(crate) const fn blocks(&self) -> RangeInclusive<u64> {
        self.from..=self.to
    }
}

/// Resolve a tag against the chain height, ignoring bounds checks.
///
/// `Pending` resolves past the head so it never selects a finalized block.
pub(crate) const fn resolve_tag(tag: BlockTag, height: u64) -> u64 {
    match tag {
        BlockTag::Earliest => 0,
        BlockTag::Latest => height,
        BlockTag::Pending => height.saturating_add(1),
        BlockTag::Number(n) => n,
    }
}

fn resolve_bound(tag: BlockTag, height: u64, mode: ResolveMode) -> Result<u64, FilterError> {
    match (tag, mode) {
        (BlockTag::Number(n), ResolveMode::Strict) if n > height => {
            Err(FilterError::UnknownBlock(n))
        }
        _ => Ok(resolve_tag(tag, height)),
    }
}

/// Resolve a block selector to a concrete range.
///
/// `hash_number` is the number of the block identified by the selector's
/// hash, as reported by the log source, if it knows that block. It is
/// ignored for range selectors.
pub(crate) fn resolve(
    selector: &BlockSelector,
    hash_number: Option<u64>,
    height: u64,
    mode: ResolveMode,
) -> Result<ResolvedRange, FilterError> {
    match *selector {
        BlockSelector::AtHash { hash, from, to } => {
            let number = hash_number.ok_or(FilterError::UnknownBlockHash(hash))?;
            if let Some(tag) =
                [from, to].into_iter().flatten().find(|tag| resolve_tag(*tag, height) != number)
            {
                return Err(CriteriaError::BlockHashConflict { hash, number, tag }.into());
            }
            Ok(ResolvedRange::single(number))
        }
        BlockSelector::Range { from, to } => {
            let from = resolve_bound(from, height, mode)?;
            // Nothing beyond the head is finalized.
            let to = resolve_bound(to, height, mode)?.min(height);
            Ok(ResolvedRange::new(from, to))
        }
    }
}
