//! RPC context wrapping a [`LogSource`] and the filter registry.

use crate::{
    ChangeFeed, FilterError, FilterId, FilterRpcConfig, LogSource,
    interest::{FilterDelta, FilterManager},
    query::query_logs,
    resolve::{ChainHead, ResolveMode, ResolvedRange, resolve},
};
use ethfilter_types::{BlockSelector, LogEntry, LogFilter};
use std::sync::Arc;

/// RPC context backed by a [`LogSource`].
///
/// Owns the filter registry and shares the [`ChainHead`] with the node.
/// Cloning is cheap.
///
/// # Construction
///
/// ```
/// use ethfilter_rpc::{ChainHead, FilterRpcConfig, FilterRpcCtx, MemLogStore};
///
/// let ctx = FilterRpcCtx::new(MemLogStore::new(), ChainHead::new(0), FilterRpcConfig::default());
/// assert_eq!(ctx.installed_filters(), 0);
/// ```
pub struct FilterRpcCtx<S> {
    inner: Arc<FilterRpcCtxInner<S>>,
}

impl<S> Clone for FilterRpcCtx<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> core::fmt::Debug for FilterRpcCtx<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilterRpcCtx")
            .field("head", &self.inner.head)
            .field("config", &self.inner.config)
            .field("installed_filters", &self.inner.filters.len())
            .finish_non_exhaustive()
    }
}

struct FilterRpcCtxInner<S> {
    source: S,
    head: ChainHead,
    filters: FilterManager,
    config: FilterRpcConfig,
}

impl<S: LogSource> FilterRpcCtx<S> {
    /// Create a new context.
    ///
    /// With [`EvictionPolicy::Unpolled`] this spawns the eviction thread,
    /// which stops once the last clone of the context is dropped.
    ///
    /// [`EvictionPolicy::Unpolled`]: crate::EvictionPolicy::Unpolled
    pub fn new(source: S, head: ChainHead, config: FilterRpcConfig) -> Self {
        let filters = FilterManager::new(head.clone(), config.eviction, config.max_filters);
        Self { inner: Arc::new(FilterRpcCtxInner { source, head, filters, config }) }
    }

    /// Access the log source.
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Access the chain head.
    pub fn head(&self) -> &ChainHead {
        &self.inner.head
    }

    /// Access the configuration.
    pub fn config(&self) -> &FilterRpcConfig {
        &self.inner.config
    }

    /// The change feed delivering chain events to this context's filters.
    pub fn change_feed(&self) -> ChangeFeed<S> {
        ChangeFeed::new(self.clone())
    }

    pub(crate) fn filters(&self) -> &FilterManager {
        &self.inner.filters
    }

    /// Number of installed filters.
    pub fn installed_filters(&self) -> usize {
        self.inner.filters.len()
    }

    /// Resolve a filter's block selection against the current head.
    async fn resolve_blocks(
        &self,
        filter: &LogFilter,
        mode: ResolveMode,
    ) -> Result<ResolvedRange, FilterError> {
        let hash_number = match filter.blocks {
            BlockSelector::AtHash { hash, .. } => self.source().block_number(hash).await?,
            BlockSelector::Range { .. } => None,
        };
        resolve(&filter.blocks, hash_number, self.head().latest(), mode)
    }

    async fn query(
        &self,
        filter: &LogFilter,
        mode: ResolveMode,
    ) -> Result<Vec<LogEntry>, FilterError> {
        let range = self.resolve_blocks(filter, mode).await?;
        query_logs(self.source(), &filter.criteria, range, self.config()).await
    }

    /// Install a log filter (`eth_newFilter`).
    ///
    /// A `blockHash` selector is checked against the log source before the
    /// filter is stored.
    pub async fn install_log_filter(&self, filter: LogFilter) -> Result<FilterId, FilterError> {
        self.resolve_blocks(&filter, ResolveMode::Clamped).await?;
        self.inner.filters.install_log_filter(filter)
    }

    /// Install a block filter (`eth_newBlockFilter`).
    pub fn install_block_filter(&self) -> Result<FilterId, FilterError> {
        self.inner.filters.install_block_filter()
    }

    /// Install a pending transaction filter
    /// (`eth_newPendingTransactionFilter`).
    pub fn install_pending_transaction_filter(&self) -> Result<FilterId, FilterError> {
        self.inner.filters.install_pending_transaction_filter()
    }

    /// Drain the changes of a filter since its last poll
    /// (`eth_getFilterChanges`).
    pub fn filter_changes(&self, id: FilterId) -> Result<FilterDelta, FilterError> {
        self.inner.filters.poll(id)
    }

    /// All logs matching an installed log filter (`eth_getFilterLogs`).
    ///
    /// Independent of the poll cursor. Bounds beyond the chain head are
    /// clamped to it.
    pub async fn filter_logs(&self, id: FilterId) -> Result<Vec<LogEntry>, FilterError> {
        let filter = self.inner.filters.log_filter(id)?;
        self.query(&filter, ResolveMode::Clamped).await
    }

    /// Uninstall a filter (`eth_uninstallFilter`). Returns `true` if it was
    /// installed.
    pub fn uninstall_filter(&self, id: FilterId) -> bool {
        self.inner.filters.uninstall(id)
    }

    /// All logs matching a one-off filter (`eth_getLogs`).
    ///
    /// Numeric bounds beyond the chain head are [`FilterError::UnknownBlock`].
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, FilterError> {
        self.query(filter, ResolveMode::Strict).await
    }
}
