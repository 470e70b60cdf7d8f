//! Integration tests for the `ethfilter-rpc` filter endpoints.
//!
//! Tests exercise the public router API via the axum service layer, using
//! the in-memory log store.

use alloy::primitives::{Address, B256, Bytes, Log, address};
use axum::body::Body;
use ethfilter_rpc::{
    ChainHead, ChainNotifier, FilterRpcConfig, FilterRpcCtx, MemLogStore,
    types::{BlockTransaction, FinalizedBlock},
};
use http::Request;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Everything needed to make RPC calls against the filter router.
struct TestHarness {
    app: axum::Router,
    store: MemLogStore,
    ctx: FilterRpcCtx<MemLogStore>,
}

impl TestHarness {
    /// Create a harness whose store holds blocks `0..=height`.
    fn new(height: u64) -> Self {
        Self::with_config(height, FilterRpcConfig::default())
    }

    fn with_config(height: u64, config: FilterRpcConfig) -> Self {
        let store = MemLogStore::new();
        for n in 0..=height {
            store.append_block(make_block(n));
        }
        let ctx = FilterRpcCtx::new(store.clone(), ChainHead::new(height), config);
        let app = ethfilter_rpc::eth::<MemLogStore>().into_axum("/").with_state(ctx.clone());
        Self { app, store, ctx }
    }

    /// Store a block and dispatch it to installed filters.
    fn publish(&self, block: FinalizedBlock) {
        self.store.append_block(block.clone());
        self.ctx.change_feed().dispatch_block(&block);
    }
}

/// Make a JSON-RPC call and return the `"result"` field.
///
/// Panics if the response contains an `"error"` field.
async fn rpc_call(app: &axum::Router, method: &str, params: Value) -> Value {
    let resp = rpc_call_raw(app, method, params).await;
    if let Some(error) = resp.get("error") {
        panic!("RPC error for {method}: {error}");
    }
    resp["result"].clone()
}

/// Make a JSON-RPC call and return the full response (including any error).
async fn rpc_call_raw(app: &axum::Router, method: &str, params: Value) -> Value {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Make a JSON-RPC call expected to fail, and return the error object as a
/// string.
async fn rpc_error(app: &axum::Router, method: &str, params: Value) -> String {
    let resp = rpc_call_raw(app, method, params).await;
    assert!(resp.get("result").is_none_or(Value::is_null), "expected error: {resp}");
    resp.get("error").unwrap_or_else(|| panic!("no error for {method}: {resp}")).to_string()
}

// ---------------------------------------------------------------------------
// Test data builders
// ---------------------------------------------------------------------------

/// Contract emitting logs on even blocks.
const ADDR_A: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

/// Contract emitting logs on odd blocks.
const ADDR_B: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

const T1: B256 = B256::repeat_byte(0x01);
const T9: B256 = B256::repeat_byte(0x09);

fn block_hash(number: u64) -> B256 {
    B256::left_padding_from(&number.to_be_bytes())
}

fn tx_hash(number: u64) -> B256 {
    let mut hash = block_hash(number);
    hash.0[0] = 0xee;
    hash
}

/// A block with one transaction emitting one log with topics `[T9, T1]`,
/// from [`ADDR_A`] on even blocks and [`ADDR_B`] on odd ones.
fn make_block(number: u64) -> FinalizedBlock {
    let emitter = if number % 2 == 0 { ADDR_A } else { ADDR_B };
    make_block_with(number, emitter)
}

fn make_block_with(number: u64, emitter: Address) -> FinalizedBlock {
    let log = Log::new_unchecked(emitter, vec![T9, T1], Bytes::from_static(&[0x42]));
    FinalizedBlock::new(
        number,
        block_hash(number),
        vec![BlockTransaction::new(tx_hash(number), vec![log])],
    )
}

fn addresses(logs: &Value) -> Vec<Address> {
    logs.as_array()
        .unwrap()
        .iter()
        .map(|log| serde_json::from_value(log["address"].clone()).unwrap())
        .collect()
}

fn block_numbers(logs: &Value) -> Vec<u64> {
    logs.as_array()
        .unwrap()
        .iter()
        .map(|log| {
            let hex = log["blockNumber"].as_str().unwrap().trim_start_matches("0x");
            u64::from_str_radix(hex, 16).unwrap()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Simple queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_block_number() {
    let h = TestHarness::new(7);
    assert_eq!(rpc_call(&h.app, "blockNumber", json!([])).await, json!("0x7"));

    h.publish(make_block(8));
    assert_eq!(rpc_call(&h.app, "blockNumber", json!([])).await, json!("0x8"));
}

#[tokio::test]
async fn test_namespaced_router() {
    let h = TestHarness::new(3);
    let app = ethfilter_rpc::router::<MemLogStore>().into_axum("/").with_state(h.ctx.clone());
    assert_eq!(rpc_call(&app, "eth_blockNumber", json!([])).await, json!("0x3"));

    let id = rpc_call(&app, "eth_newBlockFilter", json!([])).await;
    assert_eq!(id, json!("0x1"));
}

// ---------------------------------------------------------------------------
// Filter lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_log_filter_changes() {
    let h = TestHarness::new(10);

    let id =
        rpc_call(&h.app, "newFilter", json!([{ "address": ADDR_A, "topics": [null, T1] }])).await;
    assert_eq!(id, json!("0x1"));

    // Nothing happened since installation.
    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(changes, json!([]));

    h.publish(make_block_with(11, ADDR_A));
    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(addresses(&changes), vec![ADDR_A]);
    assert_eq!(changes[0]["blockNumber"], json!("0xb"));
    assert_eq!(changes[0]["blockHash"], json!(block_hash(11)));
    assert_eq!(changes[0]["transactionHash"], json!(tx_hash(11)));
    assert_eq!(changes[0]["transactionIndex"], json!("0x0"));
    assert_eq!(changes[0]["logIndex"], json!("0x0"));
    assert_eq!(changes[0]["data"], json!("0x42"));
    assert_eq!(changes[0]["topics"], json!([T9, T1]));

    h.publish(make_block_with(12, ADDR_B));
    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(changes, json!([]));
}

#[tokio::test]
async fn test_block_filter_changes() {
    let h = TestHarness::new(0);
    let id = rpc_call(&h.app, "newBlockFilter", json!([])).await;

    h.publish(make_block(1));
    h.publish(make_block(2));
    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(changes, json!([block_hash(1), block_hash(2)]));

    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(changes, json!([]));
}

#[tokio::test]
async fn test_pending_transaction_filter() {
    let h = TestHarness::new(0);
    let id = rpc_call(&h.app, "newPendingTransactionFilter", json!([])).await;

    let feed = h.ctx.change_feed();
    feed.dispatch_pending_transaction(B256::repeat_byte(0x11));
    feed.dispatch_pending_transaction(B256::repeat_byte(0x22));
    h.publish(make_block(1));

    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(changes, json!([B256::repeat_byte(0x11), B256::repeat_byte(0x22)]));
}

#[tokio::test]
async fn test_uninstall_filter() {
    let h = TestHarness::new(0);
    let id = rpc_call(&h.app, "newBlockFilter", json!([])).await;

    assert_eq!(rpc_call(&h.app, "uninstallFilter", json!([id])).await, json!(true));
    assert_eq!(rpc_call(&h.app, "uninstallFilter", json!([id])).await, json!(false));

    let err = rpc_error(&h.app, "getFilterChanges", json!([id])).await;
    assert!(err.contains("filter not found"), "unexpected error: {err}");
    assert_eq!(h.ctx.installed_filters(), 0);
}

#[tokio::test]
async fn test_unknown_filter() {
    let h = TestHarness::new(0);
    let err = rpc_error(&h.app, "getFilterLogs", json!(["0x99"])).await;
    assert!(err.contains("filter not found"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_max_filters() {
    let config = FilterRpcConfig { max_filters: Some(1), ..Default::default() };
    let h = TestHarness::with_config(0, config);

    rpc_call(&h.app, "newBlockFilter", json!([])).await;
    let err = rpc_error(&h.app, "newPendingTransactionFilter", json!([])).await;
    assert!(err.contains("too many installed filters"), "unexpected error: {err}");
}

// ---------------------------------------------------------------------------
// Filter snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_filter_logs_idempotent() {
    let h = TestHarness::new(20);
    let id = rpc_call(
        &h.app,
        "newFilter",
        json!([{ "fromBlock": "0x5", "toBlock": "0x1e", "address": ADDR_A }]),
    )
    .await;

    let first = rpc_call(&h.app, "getFilterLogs", json!([id])).await;
    // The upper bound is clamped to the chain height.
    assert_eq!(block_numbers(&first), vec![6, 8, 10, 12, 14, 16, 18, 20]);

    // Polling does not affect snapshots.
    rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    let second = rpc_call(&h.app, "getFilterLogs", json!([id])).await;
    assert_eq!(first, second);

    // New blocks inside the window show up.
    h.publish(make_block(21));
    h.publish(make_block(22));
    let third = rpc_call(&h.app, "getFilterLogs", json!([id])).await;
    assert_eq!(block_numbers(&third).last(), Some(&22));
}

#[tokio::test]
async fn test_filter_logs_on_block_filter() {
    let h = TestHarness::new(0);
    let id = rpc_call(&h.app, "newBlockFilter", json!([])).await;
    let err = rpc_error(&h.app, "getFilterLogs", json!([id])).await;
    assert!(err.contains("is not a log filter"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_filter_by_block_hash() {
    let h = TestHarness::new(10);
    let id = rpc_call(&h.app, "newFilter", json!([{ "blockHash": block_hash(4) }])).await;

    let logs = rpc_call(&h.app, "getFilterLogs", json!([id])).await;
    assert_eq!(block_numbers(&logs), vec![4]);

    // Only block 4 belongs to the filter.
    h.publish(make_block(11));
    assert_eq!(rpc_call(&h.app, "getFilterChanges", json!([id])).await, json!([]));
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_logs_full_range() {
    let h = TestHarness::new(100);
    let logs = rpc_call(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "earliest", "toBlock": "latest", "address": [ADDR_A] }]),
    )
    .await;

    let numbers = block_numbers(&logs);
    assert_eq!(numbers, (0..=100).step_by(2).collect::<Vec<_>>());
    assert!(addresses(&logs).iter().all(|a| *a == ADDR_A));
}

#[tokio::test]
async fn test_get_logs_defaults_to_latest() {
    let h = TestHarness::new(9);
    let logs = rpc_call(&h.app, "getLogs", json!([{}])).await;
    assert_eq!(block_numbers(&logs), vec![9]);
}

#[tokio::test]
async fn test_get_logs_topic_alternatives() {
    let h = TestHarness::new(5);
    let logs = rpc_call(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "0x0", "toBlock": "0x5", "topics": [[T1, T9]] }]),
    )
    .await;
    assert_eq!(block_numbers(&logs), vec![0, 1, 2, 3, 4, 5]);

    let logs = rpc_call(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "0x0", "toBlock": "0x5", "topics": [T1] }]),
    )
    .await;
    assert_eq!(logs, json!([]));

    // A wildcard position still requires the log to have that topic.
    let logs = rpc_call(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "0x0", "toBlock": "0x5", "topics": [null, null, null] }]),
    )
    .await;
    assert_eq!(logs, json!([]));
}

#[tokio::test]
async fn test_get_logs_by_block_hash() {
    let h = TestHarness::new(10);
    let logs = rpc_call(&h.app, "getLogs", json!([{ "blockHash": block_hash(3) }])).await;
    assert_eq!(block_numbers(&logs), vec![3]);
    assert_eq!(addresses(&logs), vec![ADDR_B]);

    let unknown = json!([{ "blockHash": B256::repeat_byte(0x77) }]);
    let err = rpc_error(&h.app, "getLogs", unknown).await;
    assert!(err.contains("unknown block hash"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_get_logs_inverted_range() {
    let h = TestHarness::new(10);
    let logs = rpc_call(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "0x8", "toBlock": "0x2" }]),
    )
    .await;
    assert_eq!(logs, json!([]));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_block_hash_with_conflicting_range() {
    let h = TestHarness::new(10);
    let params = json!([{ "blockHash": block_hash(4), "fromBlock": "0x2" }]);

    let err = rpc_error(&h.app, "getLogs", params.clone()).await;
    assert!(err.contains("invalid filter criteria"), "unexpected error: {err}");

    let err = rpc_error(&h.app, "newFilter", params).await;
    assert!(err.contains("invalid filter criteria"), "unexpected error: {err}");
    assert_eq!(h.ctx.installed_filters(), 0);
}

#[tokio::test]
async fn test_get_logs_beyond_head() {
    let h = TestHarness::new(10);
    let err = rpc_error(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "0x1", "toBlock": "0x64" }]),
    )
    .await;
    assert!(err.contains("unknown block: 100"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_too_many_topics() {
    let h = TestHarness::new(0);
    let err =
        rpc_error(&h.app, "newFilter", json!([{ "topics": [null, null, null, null, null] }]))
            .await;
    assert!(err.contains("too many topic positions"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_malformed_request() {
    let h = TestHarness::new(0);
    rpc_error(&h.app, "getLogs", json!([{ "address": "0x1234" }])).await;
    rpc_error(&h.app, "newFilter", json!([{ "fromBlock": "finalized" }])).await;
    rpc_error(&h.app, "getFilterChanges", json!(["not-an-id"])).await;
}

#[tokio::test]
async fn test_query_limits() {
    let config = FilterRpcConfig { max_blocks_per_filter: 10, ..Default::default() };
    let h = TestHarness::with_config(50, config);
    let err = rpc_error(
        &h.app,
        "getLogs",
        json!([{ "fromBlock": "earliest", "toBlock": "latest" }]),
    )
    .await;
    assert!(err.contains("max block range"), "unexpected error: {err}");
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_spawned_change_feed() {
    let h = TestHarness::new(0);
    let notifier = ChainNotifier::new(h.ctx.head().clone(), 16);
    let cancel = CancellationToken::new();
    let task = h.ctx.change_feed().spawn(notifier.subscribe(), cancel.clone());

    let id = rpc_call(&h.app, "newBlockFilter", json!([])).await;

    let block = make_block(1);
    h.store.append_block(block.clone());
    notifier.send_block(block).unwrap();

    let mut changes = json!([]);
    for _ in 0..100 {
        changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
        if changes != json!([]) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(changes, json!([block_hash(1)]));
    assert_eq!(rpc_call(&h.app, "blockNumber", json!([])).await, json!("0x1"));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_lagging_change_feed_delivers_every_block() {
    let h = TestHarness::new(0);
    let notifier = ChainNotifier::new(h.ctx.head().clone(), 2);
    let id = rpc_call(&h.app, "newFilter", json!([{ "topics": [T9] }])).await;

    // Four blocks overflow the channel before the feed starts reading.
    let events = notifier.subscribe();
    for n in 1..=4 {
        let block = make_block(n);
        h.store.append_block(block.clone());
        notifier.send_block(block).unwrap();
    }
    let task = h.ctx.change_feed().spawn(events, CancellationToken::new());
    drop(notifier);
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

    let changes = rpc_call(&h.app, "getFilterChanges", json!([id])).await;
    assert_eq!(block_numbers(&changes), vec![1, 2, 3, 4]);

    let logs =
        rpc_call(&h.app, "getLogs", json!([{ "fromBlock": "0x1", "toBlock": "latest" }])).await;
    assert_eq!(changes, logs);
}
