//! Filter management for `eth_newFilter` / `eth_getFilterChanges`.

use crate::{
    EvictionPolicy, FilterError, FilterId,
    interest::{FilterDelta, InterestKind},
    metrics,
    resolve::ChainHead,
};
use alloy::primitives::B256;
use dashmap::DashMap;
use ethfilter_types::{FinalizedBlock, LogEntry, LogFilter};
use std::{
    sync::{
        Arc, PoisonError, RwLock, Weak,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::{debug, trace};

/// An active filter.
///
/// Records the filter details, the [`Instant`] at which the filter was last
/// polled, and the changes buffered since.
///
/// `cursor` is the last position delivered by a poll, `observed` the last
/// position appended to the buffer. Positions are block numbers, or the
/// pending transaction sequence for pending transaction filters. `missed`
/// is set when events between two positions never reached the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveFilter {
    cursor: u64,
    observed: u64,
    missed: bool,
    created_at: Instant,
    last_poll_time: Instant,
    kind: InterestKind,
    buffer: FilterDelta,
}

impl core::fmt::Display for ActiveFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ActiveFilter {{ cursor: {}, buffered: {}, missed: {}, ms_since_last_poll: {}, \
             kind: {:?} }}",
            self.cursor,
            self.buffer.len(),
            self.missed,
            self.last_poll_time.elapsed().as_millis(),
            self.kind
        )
    }
}

impl ActiveFilter {
    fn new(position: u64, kind: InterestKind) -> Self {
        let now = Instant::now();
        Self {
            cursor: position,
            observed: position,
            missed: false,
            created_at: now,
            last_poll_time: now,
            buffer: kind.empty_output(),
            kind,
        }
    }

    /// Drain the buffer and advance the cursor.
    ///
    /// Returns `Err` with the number of dropped changes if events were missed
    /// since the last poll. The filter resumes from its observed position.
    fn mark_polled(&mut self) -> Result<FilterDelta, usize> {
        self.cursor = self.observed;
        self.last_poll_time = Instant::now();
        let delta = std::mem::replace(&mut self.buffer, self.kind.empty_output());
        if std::mem::take(&mut self.missed) { Err(delta.len()) } else { Ok(delta) }
    }

    /// Get the duration since the filter was last polled.
    fn time_since_last_poll(&self) -> Duration {
        self.last_poll_time.elapsed()
    }

    /// Buffer the parts of a finalized block this filter is interested in.
    ///
    /// Blocks at or below the last observed block are ignored. Skipping
    /// ahead of the next expected block marks the filter as missed.
    fn apply_block(&mut self, number: u64, hash: B256, entries: &[LogEntry]) {
        if self.kind.is_pending_transaction() || number <= self.observed {
            return;
        }
        self.missed |= number > self.observed + 1;
        self.observed = number;
        match &self.kind {
            InterestKind::Log { .. } => {
                self.buffer.extend_logs(self.kind.matching_logs(number, hash, entries))
            }
            InterestKind::Block => self.buffer.push_hash(hash),
            InterestKind::PendingTransaction => {}
        }
    }

    /// Buffer a pending transaction observed at sequence `seq`.
    fn apply_pending(&mut self, seq: u64, hash: B256) {
        if self.kind.is_pending_transaction() && seq > self.observed {
            self.observed = seq;
            self.buffer.push_hash(hash);
        }
    }
}

/// Inner logic for [`FilterManager`].
///
/// Structural changes (install, uninstall, eviction) share `gate`; block
/// and pending transaction dispatch hold it exclusively, so a filter is
/// either installed before a dispatch and sees all of it, or after and sees
/// none of it. Polls only lock their own entry.
#[derive(Debug)]
pub(crate) struct FilterManagerInner {
    current_id: AtomicU64,
    filters: DashMap<FilterId, ActiveFilter>,
    live: AtomicUsize,
    gate: RwLock<()>,
    head: ChainHead,
    pending_seq: AtomicU64,
    max_filters: Option<usize>,
}

impl FilterManagerInner {
    /// Create a new filter manager.
    fn new(head: ChainHead, max_filters: Option<usize>) -> Self {
        // Start from 1, as 0 is weird in quantity encoding.
        Self {
            current_id: AtomicU64::new(1),
            filters: DashMap::new(),
            live: AtomicUsize::new(0),
            gate: RwLock::new(()),
            head,
            pending_seq: AtomicU64::new(0),
            max_filters,
        }
    }

    /// Get the next filter ID.
    fn next_id(&self) -> FilterId {
        FilterId::from(self.current_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Claim a slot for a new filter, respecting `max_filters`.
    fn reserve_slot(&self) -> Result<(), FilterError> {
        let Some(max) = self.max_filters else {
            self.live.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        };
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map(|_| ())
            .map_err(|_| FilterError::TooManyFilters(max))
    }

    fn install(&self, kind: InterestKind) -> Result<FilterId, FilterError> {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        self.reserve_slot()?;

        let position = if kind.is_pending_transaction() {
            self.pending_seq.load(Ordering::Acquire)
        } else {
            self.head.latest()
        };
        let id = self.next_id();
        let filter = ActiveFilter::new(position, kind);
        debug!(%id, %filter, "installed filter");
        let _ = self.filters.insert(id, filter);
        metrics::record_filter_installed();
        Ok(id)
    }

    /// Install a new log filter.
    pub(crate) fn install_log_filter(&self, filter: LogFilter) -> Result<FilterId, FilterError> {
        self.install(InterestKind::log(filter))
    }

    /// Install a new block filter.
    pub(crate) fn install_block_filter(&self) -> Result<FilterId, FilterError> {
        self.install(InterestKind::Block)
    }

    /// Install a new pending transaction filter.
    pub(crate) fn install_pending_transaction_filter(&self) -> Result<FilterId, FilterError> {
        self.install(InterestKind::PendingTransaction)
    }

    /// Drain the changes buffered for a filter since its last poll.
    ///
    /// Fails with [`FilterError::MissedChanges`] once if chain events were
    /// lost since the last poll.
    pub(crate) fn poll(&self, id: FilterId) -> Result<FilterDelta, FilterError> {
        let mut filter = self.filters.get_mut(&id).ok_or(FilterError::UnknownFilter(id))?;
        match filter.mark_polled() {
            Ok(delta) => {
                trace!(%id, changes = delta.len(), cursor = filter.cursor, "polled filter");
                Ok(delta)
            }
            Err(dropped) => {
                debug!(%id, dropped, cursor = filter.cursor, "filter missed chain events");
                Err(FilterError::MissedChanges(id))
            }
        }
    }

    /// Get the criteria and block selection of a log filter.
    pub(crate) fn log_filter(&self, id: FilterId) -> Result<LogFilter, FilterError> {
        let filter = self.filters.get(&id).ok_or(FilterError::UnknownFilter(id))?;
        filter.kind.as_log_filter().cloned().ok_or(FilterError::UnsupportedFilterType(id))
    }

    /// Uninstall a filter. Returns `true` if it was installed.
    pub(crate) fn uninstall(&self, id: FilterId) -> bool {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let Some((_, filter)) = self.filters.remove(&id) else {
            return false;
        };
        self.live.fetch_sub(1, Ordering::AcqRel);
        metrics::record_filter_uninstalled();
        debug!(%id, age_ms = filter.created_at.elapsed().as_millis(), "uninstalled filter");
        true
    }

    /// Number of installed filters.
    pub(crate) fn len(&self) -> usize {
        self.filters.len()
    }

    /// Lowest block observed by any block or log filter.
    pub(crate) fn lowest_observed(&self) -> Option<u64> {
        self.filters
            .iter()
            .filter(|filter| !filter.kind.is_pending_transaction())
            .map(|filter| filter.observed)
            .min()
    }

    /// Buffer a finalized block for every interested filter, then advance
    /// the chain head to it.
    pub(crate) fn on_block(&self, block: &FinalizedBlock) {
        let entries: Vec<LogEntry> = block.log_entries().collect();
        self.on_block_logs(block.number, block.hash, &entries);
    }

    /// Buffer block `number` with its log entries for every interested
    /// filter, then advance the chain head to it.
    pub(crate) fn on_block_logs(&self, number: u64, hash: B256, entries: &[LogEntry]) {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let started_at = Instant::now();

        for mut filter in self.filters.iter_mut() {
            filter.apply_block(number, hash, entries);
        }

        if number > self.head.latest() {
            self.head.set_latest(number);
        }
        metrics::record_block_dispatched(&started_at);
        trace!(
            number,
            %hash,
            logs = entries.len(),
            filters = self.filters.len(),
            "dispatched block"
        );
    }

    /// Buffer a pending transaction for every pending transaction filter.
    pub(crate) fn on_pending_transaction(&self, hash: B256) {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let seq = self.pending_seq.fetch_add(1, Ordering::AcqRel) + 1;

        for mut filter in self.filters.iter_mut() {
            filter.apply_pending(seq, hash);
        }
        metrics::record_pending_transaction_dispatched();
        trace!(%hash, seq, "dispatched pending transaction");
    }

    /// Mark every pending transaction filter as having missed events.
    pub(crate) fn mark_pending_missed(&self) {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        for mut filter in self.filters.iter_mut() {
            if filter.kind.is_pending_transaction() {
                filter.missed = true;
            }
        }
    }

    /// Clean stale filters that have not been polled in a while.
    fn clean_stale(&self, older_than: Duration) {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        self.filters.retain(|_, filter| {
            let keep = filter.time_since_last_poll() < older_than;
            removed += usize::from(!keep);
            keep
        });
        if removed > 0 {
            self.live.fetch_sub(removed, Ordering::AcqRel);
            metrics::record_filters_evicted(removed);
            trace!(removed, "evicted stale filters");
        }
    }
}

/// Manager for filters.
///
/// The manager tracks active filters, and optionally cleans stale filters.
/// Filters are stored in a [`DashMap`] that maps filter IDs to active filters.
/// Filter IDs are assigned sequentially, starting from 1.
///
/// With [`EvictionPolicy::Unpolled`], [`Self::new`] spawns a task that
/// periodically cleans stale filters. This task runs on a separate thread to
/// avoid [`DashMap::retain`] deadlock. See [`DashMap`] documentation for more
/// information.
#[derive(Debug, Clone)]
pub(crate) struct FilterManager {
    inner: Arc<FilterManagerInner>,
}

impl FilterManager {
    /// Create a new filter manager tracking `head`.
    pub(crate) fn new(
        head: ChainHead,
        eviction: EvictionPolicy,
        max_filters: Option<usize>,
    ) -> Self {
        let inner = Arc::new(FilterManagerInner::new(head, max_filters));
        if let EvictionPolicy::Unpolled { ttl, interval } = eviction {
            FilterCleanTask::new(Arc::downgrade(&inner), interval, ttl).spawn();
        }
        Self { inner }
    }
}

impl std::ops::Deref for FilterManager {
    type Target = FilterManagerInner;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

/// Task to clean up unpolled filters.
///
/// This task runs on a separate thread to avoid [`DashMap::retain`] deadlocks.
#[derive(Debug)]
struct FilterCleanTask {
    manager: Weak<FilterManagerInner>,
    sleep: Duration,
    age_limit: Duration,
}

impl FilterCleanTask {
    /// Create a new filter cleaner task.
    const fn new(manager: Weak<FilterManagerInner>, sleep: Duration, age_limit: Duration) -> Self {
        Self { manager, sleep, age_limit }
    }

    /// Run the task until the manager is dropped.
    fn spawn(self) {
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(self.sleep);
                trace!("cleaning stale filters");
                match self.manager.upgrade() {
                    Some(manager) => manager.clean_stale(self.age_limit),
                    None => break,
                }
            }
        });
    }
}


// Some code in this file has been copied and modified from reth
// <https://github.com/paradigmxyz/reth>
// The original license is included below:
//
// The MIT License (MIT)
//
// Copyright (c) 2022-2025 Reth Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
