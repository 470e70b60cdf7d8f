//! Historical log queries against a [`LogSource`].

use crate::{
    FilterError, FilterRpcConfig, LogSource, metrics, resolve::ResolvedRange,
    utils::BlockRangeInclusiveIter,
};
use ethfilter_types::{FilterCriteria, LogEntry};
use std::time::Instant;
use tracing::trace;

/// Blocks requested from the source per call.
const MAX_BLOCKS_PER_CHUNK: u64 = 1_000;

/// Collect the logs in `range` matching `criteria`, in emission order.
///
/// The range is scanned in chunks. The source may over-approximate, so the
/// exact criteria are re-applied to every returned entry.
pub(crate) async fn query_logs<S: LogSource>(
    source: &S,
    criteria: &FilterCriteria,
    range: ResolvedRange,
    config: &FilterRpcConfig,
) -> Result<Vec<LogEntry>, FilterError> {
    if range.is_empty() {
        return Ok(Vec::new());
    }
    if range.len() > config.max_blocks_per_filter {
        return Err(FilterError::QueryRangeTooLarge(config.max_blocks_per_filter));
    }

    let started_at = Instant::now();
    let max_logs = config.max_logs_per_response;
    let mut logs = Vec::new();

    for (start, end) in BlockRangeInclusiveIter::new(range.blocks(), MAX_BLOCKS_PER_CHUNK - 1) {
        let chunk = source.logs_in_range(start, end, criteria).await?;
        trace!(start, end, returned = chunk.len(), "scanned log chunk");

        logs.extend(chunk.into_iter().filter(|entry| criteria.matches(entry)));
        if max_logs != 0 && logs.len() > max_logs {
            return Err(FilterError::TooManyLogs(max_logs));
        }
    }

    metrics::record_log_query(&started_at, logs.len());
    Ok(logs)
}
