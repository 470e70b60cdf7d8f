use crate::LogEntry;
use alloy::primitives::{B256, Log};

/// A transaction of a finalized block, with the logs it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Logs emitted by the transaction, in emission order.
    pub logs: Vec<Log>,
}

impl BlockTransaction {
    /// Create a new block transaction.
    pub const fn new(hash: B256, logs: Vec<Log>) -> Self {
        Self { hash, logs }
    }
}

/// A newly finalized block, as delivered to the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedBlock {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Transactions in block order.
    pub transactions: Vec<BlockTransaction>,
}

impl FinalizedBlock {
    /// Create a new finalized block.
    pub const fn new(number: u64, hash: B256, transactions: Vec<BlockTransaction>) -> Self {
        Self { number, hash, transactions }
    }

    /// Number of logs emitted by all transactions in the block.
    pub fn log_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.logs.len()).sum()
    }

    /// Iterate over the block's logs as [`LogEntry`]s, in emission order.
    ///
    /// Log indices count across the whole block, transaction indices follow
    /// block order.
    pub fn log_entries(&self) -> impl Iterator<Item = LogEntry> + '_ {
        self.transactions
            .iter()
            .enumerate()
            .flat_map(|(tx_idx, tx)| tx.logs.iter().map(move |log| (tx_idx, tx.hash, log)))
            .enumerate()
            .map(|(log_idx, (tx_idx, tx_hash, log))| LogEntry {
                inner: log.clone(),
                block_hash: self.hash,
                block_number: self.number,
                transaction_hash: tx_hash,
                transaction_index: tx_idx as u64,
                log_index: log_idx as u64,
            })
    }
}
