//! ETH namespace filter RPC router.

mod endpoints;
use endpoints::{
    block_number, get_filter_changes, get_filter_logs, get_logs, new_block_filter, new_filter,
    new_pending_transaction_filter, uninstall_filter,
};

use crate::{FilterRpcCtx, LogSource};

/// Instantiate the `eth` filter API router.
pub(crate) fn eth<S: LogSource>() -> ajj::Router<FilterRpcCtx<S>> {
    ajj::Router::new()
        .route("blockNumber", block_number::<S>)
        .route("newFilter", new_filter::<S>)
        .route("newBlockFilter", new_block_filter::<S>)
        .route("newPendingTransactionFilter", new_pending_transaction_filter::<S>)
        .route("getFilterChanges", get_filter_changes::<S>)
        .route("getFilterLogs", get_filter_logs::<S>)
        .route("uninstallFilter", uninstall_filter::<S>)
        .route("getLogs", get_logs::<S>)
}
