use crate::{BlockTag, LogEntry, MAX_TOPICS, TopicPattern};
use alloy::primitives::{Address, B256};
use std::collections::BTreeSet;

/// Error building filter criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    /// More topic positions than a log can carry.
    #[error("too many topic positions: {0} (max {MAX_TOPICS})")]
    TooManyTopics(usize),
    /// A `blockHash` selector combined with a range bound naming another
    /// block.
    #[error("blockHash {hash} identifies block {number}, but {tag} was also requested")]
    BlockHashConflict {
        /// The requested block hash.
        hash: B256,
        /// Number of the block the hash identifies.
        number: u64,
        /// The conflicting range bound.
        tag: BlockTag,
    },
}

/// Address and topic criteria of a log filter.
///
/// An empty address set matches any address. Topic patterns are matched
/// position by position, AND across positions and OR within a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    addresses: BTreeSet<Address>,
    topics: Vec<TopicPattern>,
}

impl FilterCriteria {
    /// Criteria that match every log.
    pub const fn any() -> Self {
        Self { addresses: BTreeSet::new(), topics: Vec::new() }
    }

    /// Create criteria from an address set and topic patterns.
    pub fn new<A, T>(addresses: A, topics: T) -> Result<Self, CriteriaError>
    where
        A: IntoIterator<Item = Address>,
        T: IntoIterator<Item = TopicPattern>,
    {
        let topics: Vec<_> = topics.into_iter().collect();
        if topics.len() > MAX_TOPICS {
            return Err(CriteriaError::TooManyTopics(topics.len()));
        }
        Ok(Self { addresses: addresses.into_iter().collect(), topics })
    }

    /// The address set. Empty means any address.
    pub const fn addresses(&self) -> &BTreeSet<Address> {
        &self.addresses
    }

    /// The topic patterns.
    pub fn topics(&self) -> &[TopicPattern] {
        &self.topics
    }

    /// True if `address` satisfies the address criterion.
    pub fn matches_address(&self, address: Address) -> bool {
        self.addresses.is_empty() || self.addresses.contains(&address)
    }

    /// True if the entry satisfies both criteria.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        matches(entry, &self.addresses, &self.topics)
    }
}

/// True if `entry` satisfies the address set and topic patterns.
///
/// A pattern position with no corresponding log topic never matches, even
/// when the pattern is a wildcard. Pure and total.
pub fn matches(entry: &LogEntry, addresses: &BTreeSet<Address>, topics: &[TopicPattern]) -> bool {
    if !addresses.is_empty() && !addresses.contains(&entry.address()) {
        return false;
    }

    let log_topics = entry.topics();
    topics
        .iter()
        .enumerate()
        .all(|(i, pattern)| log_topics.get(i).is_some_and(|topic| pattern.accepts(topic)))
}
