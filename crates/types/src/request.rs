use crate::{BlockTag, CriteriaError, FilterCriteria, TopicPattern};
use alloy::primitives::{Address, B256};
use serde::Deserialize;

/// Address field of a [`FilterRequest`]: a single address or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressSelector {
    /// A single address.
    One(Address),
    /// Any of several addresses.
    Many(Vec<Address>),
}

impl AddressSelector {
    /// Flatten into a list of addresses.
    pub fn into_vec(self) -> Vec<Address> {
        match self {
            Self::One(address) => vec![address],
            Self::Many(addresses) => addresses,
        }
    }
}

/// Parameter object of `eth_newFilter` and `eth_getLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    /// Start of the block range. Defaults to `latest`.
    #[serde(default)]
    pub from_block: Option<BlockTag>,
    /// End of the block range. Defaults to `latest`.
    #[serde(default)]
    pub to_block: Option<BlockTag>,
    /// Contract address or addresses.
    #[serde(default)]
    pub address: Option<AddressSelector>,
    /// Topic patterns by position.
    #[serde(default)]
    pub topics: Option<Vec<TopicPattern>>,
    /// Single block selector (EIP-234).
    #[serde(default)]
    pub block_hash: Option<B256>,
}

/// Which blocks a log filter covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSelector {
    /// A range of blocks, both ends inclusive.
    Range {
        /// Start of the range.
        from: BlockTag,
        /// End of the range.
        to: BlockTag,
    },
    /// The single block with this hash (EIP-234).
    ///
    /// Explicit range bounds are kept so they can be checked against the
    /// block the hash identifies.
    AtHash {
        /// The block hash.
        hash: B256,
        /// Explicit `fromBlock`, if one was supplied.
        from: Option<BlockTag>,
        /// Explicit `toBlock`, if one was supplied.
        to: Option<BlockTag>,
    },
}

impl Default for BlockSelector {
    fn default() -> Self {
        Self::Range { from: BlockTag::Latest, to: BlockTag::Latest }
    }
}

/// A validated log filter: criteria plus block selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Address and topic criteria.
    pub criteria: FilterCriteria,
    /// Block selection.
    pub blocks: BlockSelector,
}

impl LogFilter {
    /// Create a new log filter.
    pub const fn new(criteria: FilterCriteria, blocks: BlockSelector) -> Self {
        Self { criteria, blocks }
    }

    /// A filter over a block range.
    pub const fn range(criteria: FilterCriteria, from: BlockTag, to: BlockTag) -> Self {
        Self::new(criteria, BlockSelector::Range { from, to })
    }
}

impl TryFrom<FilterRequest> for LogFilter {
    type Error = CriteriaError;

    fn try_from(request: FilterRequest) -> Result<Self, Self::Error> {
        let FilterRequest { from_block, to_block, address, topics, block_hash } = request;

        let criteria = FilterCriteria::new(
            address.map(AddressSelector::into_vec).unwrap_or_default(),
            topics.unwrap_or_default(),
        )?;

        let blocks = match block_hash {
            Some(hash) => BlockSelector::AtHash { hash, from: from_block, to: to_block },
            None => BlockSelector::Range {
                from: from_block.unwrap_or_default(),
                to: to_block.unwrap_or_default(),
            },
        };

        Ok(Self { criteria, blocks })
    }
}
