//! Metrics to track
//!
//! - Counters:
//!   - Filters installed
//!   - Filters uninstalled
//!   - Filters evicted as stale
//!   - Blocks dispatched to filters
//!   - Pending transactions dispatched to filters
//!   - Chain events dropped by a lagging change feed
//!   - Skipped blocks backfilled from the log source
//! - Histograms:
//!   - Block dispatch time
//!   - Historical log query time
//!   - Logs returned per historical query

use metrics::{Counter, Histogram, counter, describe_counter, describe_histogram, histogram};
use std::{sync::LazyLock, time::Instant};

const FILTERS_INSTALLED: &str = "ethfilter.rpc.filters.installed";
const FILTERS_INSTALLED_HELP: &str = "Number of filters installed";

const FILTERS_UNINSTALLED: &str = "ethfilter.rpc.filters.uninstalled";
const FILTERS_UNINSTALLED_HELP: &str = "Number of filters uninstalled by clients";

const FILTERS_EVICTED: &str = "ethfilter.rpc.filters.evicted";
const FILTERS_EVICTED_HELP: &str = "Number of filters evicted for not being polled";

const BLOCKS_DISPATCHED: &str = "ethfilter.rpc.feed.blocks";
const BLOCKS_DISPATCHED_HELP: &str = "Number of finalized blocks dispatched to filters";

const PENDING_TXS_DISPATCHED: &str = "ethfilter.rpc.feed.pending_transactions";
const PENDING_TXS_DISPATCHED_HELP: &str = "Number of pending transactions dispatched to filters";

const FEED_EVENTS_DROPPED: &str = "ethfilter.rpc.feed.dropped";
const FEED_EVENTS_DROPPED_HELP: &str = "Number of chain events skipped by a lagging change feed";

const BLOCKS_BACKFILLED: &str = "ethfilter.rpc.feed.backfilled";
const BLOCKS_BACKFILLED_HELP: &str = "Number of skipped blocks read back from the log source";

const DISPATCH_TIME: &str = "ethfilter.rpc.feed.dispatch_time";
const DISPATCH_TIME_HELP: &str = "Time taken to dispatch a block to all filters, in milliseconds.";

const LOG_QUERY_TIME: &str = "ethfilter.rpc.logs.query_time";
const LOG_QUERY_TIME_HELP: &str = "Time taken to answer a historical log query, in milliseconds.";

const LOG_QUERY_RESULTS: &str = "ethfilter.rpc.logs.results";
const LOG_QUERY_RESULTS_HELP: &str = "Histogram of number of logs returned per historical query";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(FILTERS_INSTALLED, FILTERS_INSTALLED_HELP);
    describe_counter!(FILTERS_UNINSTALLED, FILTERS_UNINSTALLED_HELP);
    describe_counter!(FILTERS_EVICTED, FILTERS_EVICTED_HELP);
    describe_counter!(BLOCKS_DISPATCHED, BLOCKS_DISPATCHED_HELP);
    describe_counter!(PENDING_TXS_DISPATCHED, PENDING_TXS_DISPATCHED_HELP);
    describe_counter!(FEED_EVENTS_DROPPED, FEED_EVENTS_DROPPED_HELP);
    describe_counter!(BLOCKS_BACKFILLED, BLOCKS_BACKFILLED_HELP);

    describe_histogram!(DISPATCH_TIME, DISPATCH_TIME_HELP);
    describe_histogram!(LOG_QUERY_TIME, LOG_QUERY_TIME_HELP);
    describe_histogram!(LOG_QUERY_RESULTS, LOG_QUERY_RESULTS_HELP);
});

fn filters_installed() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FILTERS_INSTALLED)
}

fn filters_uninstalled() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FILTERS_UNINSTALLED)
}

fn filters_evicted() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FILTERS_EVICTED)
}

fn blocks_dispatched() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(BLOCKS_DISPATCHED)
}

fn pending_txs_dispatched() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(PENDING_TXS_DISPATCHED)
}

fn feed_events_dropped() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FEED_EVENTS_DROPPED)
}

fn blocks_backfilled() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(BLOCKS_BACKFILLED)
}

fn dispatch_time() -> Histogram {
    LazyLock::force(&DESCRIBE);
    histogram!(DISPATCH_TIME)
}

fn log_query_time() -> Histogram {
    LazyLock::force(&DESCRIBE);
    histogram!(LOG_QUERY_TIME)
}

fn log_query_results() -> Histogram {
    LazyLock::force(&DESCRIBE);
    histogram!(LOG_QUERY_RESULTS)
}

pub(crate) fn record_filter_installed() {
    filters_installed().increment(1);
}

pub(crate) fn record_filter_uninstalled() {
    filters_uninstalled().increment(1);
}

pub(crate) fn record_filters_evicted(count: usize) {
    filters_evicted().increment(count as u64);
}

pub(crate) fn record_block_dispatched(started_at: &Instant) {
    blocks_dispatched().increment(1);
    dispatch_time().record(started_at.elapsed().as_millis() as f64);
}

pub(crate) fn record_pending_transaction_dispatched() {
    pending_txs_dispatched().increment(1);
}

pub(crate) fn record_feed_lagged(skipped: u64) {
    feed_events_dropped().increment(skipped);
}

pub(crate) fn record_blocks_backfilled(count: u64) {
    blocks_backfilled().increment(count);
}

pub(crate) fn record_log_query(started_at: &Instant, results: usize) {
    log_query_time().record(started_at.elapsed().as_millis() as f64);
    log_query_results().record(results as f64);
}
