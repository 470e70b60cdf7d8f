//! Chain events and the change feed that fans them out to filters.

use crate::{
    FilterError, FilterRpcCtx, LogSource, interest::FilterManager, metrics, resolve::ChainHead,
};
use alloy::primitives::B256;
use ethfilter_types::{FilterCriteria, FinalizedBlock};
use std::sync::Arc;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// An event published by the node to the RPC layer.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// A block was finalized.
    Block(Arc<FinalizedBlock>),
    /// A transaction entered the pending pool.
    PendingTransaction(B256),
}

/// Shared chain state between the node and RPC layer.
///
/// Combines chain head tracking and chain event broadcasting into a single
/// unit that both the node and RPC context hold. Cloning is cheap, all
/// fields are reference counted.
///
/// A block must be readable from the log source before it is published
/// here, so `eth_getFilterLogs` never misses what `eth_getFilterChanges`
/// already delivered, and so a lagging [`ChangeFeed`] can read skipped
/// blocks back.
///
/// # Construction
///
/// ```
/// use ethfilter_rpc::{ChainHead, ChainNotifier};
///
/// let notifier = ChainNotifier::new(ChainHead::new(0), 128);
/// assert_eq!(notifier.head().latest(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ChainNotifier {
    head: ChainHead,
    events: broadcast::Sender<ChainEvent>,
}

impl ChainNotifier {
    /// Create a new [`ChainNotifier`] with a broadcast channel of the given
    /// capacity.
    pub fn new(head: ChainHead, channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity);
        Self { head, events }
    }

    /// Access the chain head.
    pub const fn head(&self) -> &ChainHead {
        &self.head
    }

    /// Publish a finalized block.
    ///
    /// Returns `Ok(receiver_count)` or `Err` if there are no active
    /// receivers (which is not usually an error condition).
    #[allow(clippy::result_large_err)]
    pub fn send_block(
        &self,
        block: FinalizedBlock,
    ) -> Result<usize, broadcast::error::SendError<ChainEvent>> {
        self.events.send(ChainEvent::Block(Arc::new(block)))
    }

    /// Publish a pending transaction hash.
    #[allow(clippy::result_large_err)]
    pub fn send_pending_transaction(
        &self,
        hash: B256,
    ) -> Result<usize, broadcast::error::SendError<ChainEvent>> {
        self.events.send(ChainEvent::PendingTransaction(hash))
    }

    /// Subscribe to chain events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }
}

/// Fans chain events out to installed filters.
///
/// Obtained from [`FilterRpcCtx::change_feed`]. Either call the dispatch
/// methods directly, or [`spawn`] a task consuming a [`ChainNotifier`]
/// subscription.
///
/// Blocks are expected in order. A filter that sees a block number jump
/// fails its next poll with [`FilterError::MissedChanges`], unless the
/// skipped blocks are first [`backfill`]ed from the log source. The spawned
/// task backfills before every block.
///
/// [`spawn`]: ChangeFeed::spawn
/// [`backfill`]: ChangeFeed::backfill
pub struct ChangeFeed<S> {
    ctx: FilterRpcCtx<S>,
}

impl<S> Clone for ChangeFeed<S> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<S> core::fmt::Debug for ChangeFeed<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeFeed").field("ctx", &self.ctx).finish()
    }
}

impl<S: LogSource> ChangeFeed<S> {
    pub(crate) const fn new(ctx: FilterRpcCtx<S>) -> Self {
        Self { ctx }
    }

    fn filters(&self) -> &FilterManager {
        self.ctx.filters()
    }

    /// Buffer a finalized block for all interested filters and advance the
    /// chain head to it.
    pub fn dispatch_block(&self, block: &FinalizedBlock) {
        self.filters().on_block(block);
    }

    /// Buffer a pending transaction hash for all pending transaction
    /// filters.
    pub fn dispatch_pending_transaction(&self, hash: B256) {
        self.filters().on_pending_transaction(hash);
    }

    /// Dispatch a single chain event.
    pub fn dispatch(&self, event: &ChainEvent) {
        match event {
            ChainEvent::Block(block) => self.dispatch_block(block),
            ChainEvent::PendingTransaction(hash) => self.dispatch_pending_transaction(*hash),
        }
    }

    /// Dispatch the blocks below `number` that some filter has not observed
    /// yet, reading them from the log source. Returns the number of blocks
    /// dispatched.
    ///
    /// Stops at the first block the source cannot serve.
    pub async fn backfill(&self, number: u64) -> Result<u64, FilterError> {
        let Some(lowest) = self.filters().lowest_observed() else {
            return Ok(0);
        };
        let from = lowest.saturating_add(1);
        let source = self.ctx.source();

        let mut filled = 0;
        for n in from..number {
            let hash = source.block_hash(n).await?.ok_or(FilterError::UnknownBlock(n))?;
            let entries = source.logs_in_range(n, n, &FilterCriteria::any()).await?;
            self.filters().on_block_logs(n, hash, &entries);
            filled += 1;
        }

        if filled > 0 {
            metrics::record_blocks_backfilled(filled);
            debug!(from, to = number - 1, "backfilled skipped blocks");
        }
        Ok(filled)
    }

    async fn handle(&self, event: ChainEvent) {
        if let ChainEvent::Block(block) = &event {
            if let Err(err) = self.backfill(block.number).await {
                warn!(%err, number = block.number, "failed to backfill skipped blocks");
            }
        }
        self.dispatch(&event);
    }

    /// Spawn a task dispatching events from `events` until `cancel` fires
    /// or the channel closes.
    ///
    /// When the task lags behind the channel, skipped blocks are backfilled
    /// from the log source. Skipped pending transactions cannot be
    /// recovered, so pending transaction filters fail their next poll.
    pub fn spawn(
        self,
        mut events: broadcast::Receiver<ChainEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("change feed started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        trace!("change feed cancelled");
                        break;
                    }
                    event = events.recv() => match event {
                        Ok(event) => self.handle(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "change feed lagged, chain events dropped");
                            metrics::record_feed_lagged(skipped);
                            self.filters().mark_pending_missed();
                        }
                        Err(RecvError::Closed) => {
                            trace!("chain event channel closed");
                            break;
                        }
                    }
                }
            }
            debug!("change feed stopped");
        })
    }
}
