//! Filter kinds for polling filters.

use crate::interest::FilterDelta;
use alloy::primitives::B256;
use ethfilter_types::{BlockSelector, BlockTag, LogEntry, LogFilter};

/// The blocks a log filter accepts from the change feed.
///
/// Range bounds stay symbolic: `latest` and `pending` as an upper bound
/// leave the window open, so the filter keeps receiving new blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiveWindow {
    /// Blocks `from..=to`, unbounded above when `to` is `None`.
    Range { from: u64, to: Option<u64> },
    /// Only the block with this hash.
    AtHash(B256),
}

impl LiveWindow {
    /// Derive the live window of a block selector.
    pub(crate) const fn new(blocks: &BlockSelector) -> Self {
        match *blocks {
            BlockSelector::AtHash { hash, .. } => Self::AtHash(hash),
            BlockSelector::Range { from, to } => {
                let from = match from {
                    BlockTag::Number(n) => n,
                    BlockTag::Earliest | BlockTag::Latest | BlockTag::Pending => 0,
                };
                let to = match to {
                    BlockTag::Number(n) => Some(n),
                    BlockTag::Earliest => Some(0),
                    BlockTag::Latest | BlockTag::Pending => None,
                };
                Self::Range { from, to }
            }
        }
    }

    /// True if the block belongs to the window.
    pub(crate) fn admits(&self, number: u64, hash: B256) -> bool {
        match *self {
            Self::Range { from, to } => number >= from && to.is_none_or(|to| number <= to),
            Self::AtHash(h) => h == hash,
        }
    }
}

/// The different kinds of filters that can be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InterestKind {
    /// Log filter with a validated [`LogFilter`].
    Log { filter: Box<LogFilter>, window: LiveWindow },
    /// New-block filter.
    Block,
    /// New pending transaction filter.
    PendingTransaction,
}

impl InterestKind {
    /// Create a log interest.
    pub(crate) fn log(filter: LogFilter) -> Self {
        let window = LiveWindow::new(&filter.blocks);
        Self::Log { filter: Box::new(filter), window }
    }

    /// True if this is a pending transaction filter.
    pub(crate) const fn is_pending_transaction(&self) -> bool {
        matches!(self, Self::PendingTransaction)
    }

    /// Fallible cast to a log filter.
    pub(crate) fn as_log_filter(&self) -> Option<&LogFilter> {
        match self {
            Self::Log { filter, .. } => Some(filter),
            _ => None,
        }
    }

    /// The logs of a block this interest wants, in emission order.
    pub(crate) fn matching_logs<'a>(
        &'a self,
        number: u64,
        hash: B256,
        entries: &'a [LogEntry],
    ) -> impl Iterator<Item = &'a LogEntry> + 'a {
        let (filter, admitted) = match self {
            Self::Log { filter, window } => (Some(filter), window.admits(number, hash)),
            _ => (None, false),
        };
        entries
            .iter()
            .filter(move |entry| admitted && filter.is_some_and(|f| f.criteria.matches(entry)))
    }

    /// Return an empty output of the same kind as this filter.
    pub(crate) const fn empty_output(&self) -> FilterDelta {
        match self {
            Self::Log { .. } => FilterDelta::Logs(Vec::new()),
            Self::Block => FilterDelta::BlockHashes(Vec::new()),
            Self::PendingTransaction => FilterDelta::TransactionHashes(Vec::new()),
        }
    }
}
