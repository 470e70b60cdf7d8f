use alloy::primitives::{Address, B256, Bytes, Log, U64};
use serde::{Deserialize, Serialize};

/// An event log emitted by a transaction in a finalized block.
///
/// Log entries are produced once when their block is finalized and are
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The emitted log.
    pub inner: Log,
    /// Hash of the containing block.
    pub block_hash: B256,
    /// Number of the containing block.
    pub block_number: u64,
    /// Hash of the emitting transaction.
    pub transaction_hash: B256,
    /// Index of the emitting transaction within the block.
    pub transaction_index: u64,
    /// Index of the log within the block.
    pub log_index: u64,
}

impl LogEntry {
    /// Address of the emitting contract.
    pub const fn address(&self) -> Address {
        self.inner.address
    }

    /// Indexed topics of the log, at most four.
    pub fn topics(&self) -> &[B256] {
        self.inner.data.topics()
    }

    /// Opaque log data.
    pub const fn data(&self) -> &Bytes {
        &self.inner.data.data
    }

    /// Identity of the entry: block hash, transaction hash and log index.
    pub const fn id(&self) -> (B256, B256, u64) {
        (self.block_hash, self.transaction_hash, self.log_index)
    }

    /// Key giving on-chain emission order.
    pub const fn position(&self) -> (u64, u64, u64) {
        (self.block_number, self.transaction_index, self.log_index)
    }
}

/// JSON-RPC view of a log, as returned by `eth_getLogs`,
/// `eth_getFilterLogs` and `eth_getFilterChanges`.
///
/// `logIndex`, `transactionIndex`, `blockHash` and `blockNumber` are `null`
/// for logs that belong to a not-yet-finalized context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilterElement {
    log_index: Option<U64>,
    transaction_index: Option<U64>,
    transaction_hash: Option<B256>,
    block_hash: Option<B256>,
    block_number: Option<U64>,
    address: Address,
    data: Bytes,
    topics: Vec<B256>,
}

impl LogFilterElement {
    /// Index of the log within its block.
    pub fn log_index(&self) -> Option<u64> {
        self.log_index.map(|n| n.to())
    }

    /// Number of the containing block.
    pub fn block_number(&self) -> Option<u64> {
        self.block_number.map(|n| n.to())
    }

    /// Index of the emitting transaction.
    pub fn transaction_index(&self) -> Option<u64> {
        self.transaction_index.map(|n| n.to())
    }

    /// Hash of the emitting transaction.
    pub const fn transaction_hash(&self) -> Option<B256> {
        self.transaction_hash
    }

    /// Hash of the containing block.
    pub const fn block_hash(&self) -> Option<B256> {
        self.block_hash
    }

    /// Address of the emitting contract.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Opaque log data.
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Indexed topics.
    pub fn topics(&self) -> &[B256] {
        &self.topics
    }
}

impl From<&LogEntry> for LogFilterElement {
    fn from(entry: &LogEntry) -> Self {
        Self {
            log_index: Some(U64::from(entry.log_index)),
            transaction_index: Some(U64::from(entry.transaction_index)),
            transaction_hash: Some(entry.transaction_hash),
            block_hash: Some(entry.block_hash),
            block_number: Some(U64::from(entry.block_number)),
            address: entry.address(),
            data: entry.data().clone(),
            topics: entry.topics().to_vec(),
        }
    }
}

impl From<LogEntry> for LogFilterElement {
    fn from(entry: LogEntry) -> Self {
        Self::from(&entry)
    }
}
