//! Error types for the filter RPC.

use crate::source::LogSourceError;
use alloy::primitives::{B256, U64};
use ethfilter_types::CriteriaError;

/// Identifier of an installed filter.
///
/// Serialized as a hex quantity. Ids are assigned sequentially starting
/// from 1 and are never reused within a process.
pub type FilterId = U64;

/// Errors from the filter RPC.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The filter request is self-contradictory or out of bounds.
    #[error("invalid filter criteria: {0}")]
    InvalidFilterCriteria(#[from] CriteriaError),
    /// A numeric block bound lies beyond the chain height.
    #[error("unknown block: {0}")]
    UnknownBlock(u64),
    /// The `blockHash` selector names a block the log source does not know.
    #[error("unknown block hash: {0}")]
    UnknownBlockHash(B256),
    /// No filter is installed under this id.
    #[error("filter not found: {0}")]
    UnknownFilter(FilterId),
    /// The operation does not apply to this kind of filter.
    #[error("filter {0} is not a log filter")]
    UnsupportedFilterType(FilterId),
    /// Chain events for this filter were lost since its last poll, so the
    /// changes buffered in the meantime are incomplete and were dropped.
    #[error("filter {0} missed chain events since its last poll")]
    MissedChanges(FilterId),
    /// The registry is at its configured capacity.
    #[error("too many installed filters (max {0})")]
    TooManyFilters(usize),
    /// The query spans more blocks than allowed.
    #[error("query exceeds max block range ({0})")]
    QueryRangeTooLarge(u64),
    /// The query matched more logs than allowed.
    #[error("query exceeds max results ({0})")]
    TooManyLogs(usize),
    /// The log source failed.
    #[error("log source: {0}")]
    Source(#[from] LogSourceError),
}

impl FilterError {
    /// Convert the error to a string for JSON-RPC responses.
    pub fn into_string(self) -> String {
        self.to_string()
    }
}
