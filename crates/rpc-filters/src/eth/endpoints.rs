//! ETH namespace filter endpoint implementations.

use crate::{
    FilterError, FilterId, FilterRpcCtx, LogSource, interest::FilterDelta, utils::await_handler,
};
use ajj::HandlerCtx;
use alloy::primitives::U64;
use ethfilter_types::{FilterRequest, LogEntry, LogFilter, LogFilterElement};
use tracing::{Instrument, debug, trace_span};

fn into_elements(logs: Vec<LogEntry>) -> Vec<LogFilterElement> {
    logs.into_iter().map(LogFilterElement::from).collect()
}

fn parse_request(request: FilterRequest) -> Result<LogFilter, String> {
    LogFilter::try_from(request).map_err(|err| FilterError::from(err).into_string())
}

// ---------------------------------------------------------------------------
// Simple Queries
// ---------------------------------------------------------------------------

pub(crate) async fn block_number<S: LogSource>(ctx: FilterRpcCtx<S>) -> Result<U64, String> {
    Ok(U64::from(ctx.head().latest()))
}

// ---------------------------------------------------------------------------
// Filter Management
// ---------------------------------------------------------------------------

pub(crate) async fn new_filter<S: LogSource>(
    _hctx: HandlerCtx,
    (request,): (FilterRequest,),
    ctx: FilterRpcCtx<S>,
) -> Result<FilterId, String> {
    let filter = parse_request(request)?;
    ctx.install_log_filter(filter).await.map_err(FilterError::into_string)
}

pub(crate) async fn new_block_filter<S: LogSource>(
    ctx: FilterRpcCtx<S>,
) -> Result<FilterId, String> {
    ctx.install_block_filter().map_err(FilterError::into_string)
}

pub(crate) async fn new_pending_transaction_filter<S: LogSource>(
    ctx: FilterRpcCtx<S>,
) -> Result<FilterId, String> {
    ctx.install_pending_transaction_filter().map_err(FilterError::into_string)
}

pub(crate) async fn uninstall_filter<S: LogSource>(
    _hctx: HandlerCtx,
    (id,): (FilterId,),
    ctx: FilterRpcCtx<S>,
) -> Result<bool, ()> {
    Ok(ctx.uninstall_filter(id))
}

pub(crate) async fn get_filter_changes<S: LogSource>(
    _hctx: HandlerCtx,
    (id,): (FilterId,),
    ctx: FilterRpcCtx<S>,
) -> Result<FilterDelta, String> {
    ctx.filter_changes(id).map_err(FilterError::into_string)
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

pub(crate) async fn get_filter_logs<S: LogSource>(
    hctx: HandlerCtx,
    (id,): (FilterId,),
    ctx: FilterRpcCtx<S>,
) -> Result<Vec<LogFilterElement>, String> {
    let span = trace_span!("eth_getFilterLogs", %id);
    let task = async move {
        let logs = ctx.filter_logs(id).await.map_err(FilterError::into_string)?;
        debug!(count = logs.len(), "collected filter logs");
        Ok::<_, String>(into_elements(logs))
    }
    .instrument(span);

    await_handler!(@option hctx.spawn_blocking(task))
}

pub(crate) async fn get_logs<S: LogSource>(
    hctx: HandlerCtx,
    (request,): (FilterRequest,),
    ctx: FilterRpcCtx<S>,
) -> Result<Vec<LogFilterElement>, String> {
    let filter = parse_request(request)?;

    let span = trace_span!("eth_getLogs", blocks = ?filter.blocks);
    let task = async move {
        let logs = ctx.get_logs(&filter).await.map_err(FilterError::into_string)?;
        debug!(count = logs.len(), "collected logs");
        Ok::<_, String>(into_elements(logs))
    }
    .instrument(span);

    await_handler!(@option hctx.spawn_blocking(task))
}
