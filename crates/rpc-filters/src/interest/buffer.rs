//! Changes accumulated for a filter between polls.

use alloy::primitives::B256;
use ethfilter_types::{LogEntry, LogFilterElement};
use serde::{Serialize, Serializer};

/// Changes accumulated by a filter since it was last polled.
///
/// The variant is fixed by the filter kind. Serializes as a JSON array of
/// log objects or of hashes, as returned by `eth_getFilterChanges`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDelta {
    /// Matching logs, in emission order.
    Logs(Vec<LogEntry>),
    /// Hashes of newly finalized blocks, in block order.
    BlockHashes(Vec<B256>),
    /// Hashes of newly observed pending transactions, in arrival order.
    TransactionHashes(Vec<B256>),
}

impl FilterDelta {
    /// True if the delta contains no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events in the delta.
    pub fn len(&self) -> usize {
        match self {
            Self::Logs(logs) => logs.len(),
            Self::BlockHashes(hashes) | Self::TransactionHashes(hashes) => hashes.len(),
        }
    }

    /// The buffered logs, if this is a log delta.
    pub fn as_logs(&self) -> Option<&[LogEntry]> {
        match self {
            Self::Logs(logs) => Some(logs),
            _ => None,
        }
    }

    /// The buffered hashes, if this is a block or transaction delta.
    pub fn as_hashes(&self) -> Option<&[B256]> {
        match self {
            Self::BlockHashes(hashes) | Self::TransactionHashes(hashes) => Some(hashes),
            Self::Logs(_) => None,
        }
    }

    /// Append logs. Ignored for hash deltas, which is a bug in debug builds.
    pub(crate) fn extend_logs<'a>(&mut self, entries: impl IntoIterator<Item = &'a LogEntry>) {
        debug_assert!(matches!(self, Self::Logs(_)), "logs appended to a hash delta");
        if let Self::Logs(logs) = self {
            logs.extend(entries.into_iter().cloned());
        }
    }

    /// Append a hash. Ignored for log deltas, which is a bug in debug builds.
    pub(crate) fn push_hash(&mut self, hash: B256) {
        debug_assert!(!matches!(self, Self::Logs(_)), "hash appended to a log delta");
        if let Self::BlockHashes(hashes) | Self::TransactionHashes(hashes) = self {
            hashes.push(hash);
        }
    }
}

impl Serialize for FilterDelta {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Logs(logs) => serializer.collect_seq(logs.iter().map(LogFilterElement::from)),
            Self::BlockHashes(hashes) | Self::TransactionHashes(hashes) => {
                hashes.serialize(serializer)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::{Address, Bytes, Log};
    use serde_json::json;

    fn entry(log_index: u64) -> LogEntry {
        LogEntry {
            inner: Log::new_unchecked(Address::ZERO, vec![B256::repeat_byte(1)], Bytes::new()),
            block_hash: B256::repeat_byte(0xbb),
            block_number: 3,
            transaction_hash: B256::repeat_byte(0xcc),
            transaction_index: 0,
            log_index,
        }
    }

    #[test]
    fn appends_by_kind() {
        let mut logs = FilterDelta::Logs(vec![]);
        logs.extend_logs(&[entry(0), entry(1)]);
        assert_eq!(logs.len(), 2);
        assert!(logs.as_hashes().is_none());

        let mut blocks = FilterDelta::BlockHashes(vec![]);
        blocks.push_hash(B256::ZERO);
        assert_eq!(blocks.as_hashes(), Some(&[B256::ZERO][..]));
        assert!(blocks.as_logs().is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "hash appended to a log delta")]
    fn hash_into_log_delta_panics() {
        FilterDelta::Logs(vec![]).push_hash(B256::ZERO);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "logs appended to a hash delta")]
    fn logs_into_hash_delta_panics() {
        FilterDelta::TransactionHashes(vec![]).extend_logs(&[entry(0)]);
    }

    #[test]
    fn serializes_hashes_as_strings() {
        let delta = FilterDelta::TransactionHashes(vec![B256::repeat_byte(0x11)]);
        assert_eq!(serde_json::to_value(&delta).unwrap(), json!([B256::repeat_byte(0x11)]));
    }

    #[test]
    fn serializes_logs_as_elements() {
        let delta = FilterDelta::Logs(vec![entry(4)]);
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(value[0]["logIndex"], json!("0x4"));
        assert_eq!(value[0]["blockNumber"], json!("0x3"));
        assert_eq!(value[0]["transactionIndex"], json!("0x0"));
        assert_eq!(value[0]["blockHash"], json!(B256::repeat_byte(0xbb)));
        assert_eq!(value[0]["topics"], json!([B256::repeat_byte(1)]));
    }
}
