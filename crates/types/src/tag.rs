use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

/// Symbolic or numeric reference to a block.
///
/// Tags are resolved against the chain height at the moment of resolution,
/// not at the moment the tag was received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// The genesis block.
    Earliest,
    /// The current chain head.
    #[default]
    Latest,
    /// The block after the current chain head.
    Pending,
    /// A specific block number.
    Number(u64),
}

impl BlockTag {
    /// Returns the block number if this is a [`BlockTag::Number`].
    pub const fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True if this tag is [`BlockTag::Pending`].
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earliest => f.write_str("earliest"),
            Self::Latest => f.write_str("latest"),
            Self::Pending => f.write_str("pending"),
            Self::Number(n) => write!(f, "{n:#x}"),
        }
    }
}

/// Error parsing a [`BlockTag`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBlockTagError {
    /// Not a known tag name and not a `0x`-prefixed quantity.
    #[error("unknown block tag: {0}")]
    UnknownTag(String),
    /// A `0x`-prefixed quantity that is not valid hex or overflows `u64`.
    #[error("invalid block number: {0}")]
    InvalidNumber(String),
}

impl FromStr for BlockTag {
    type Err = ParseBlockTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            "pending" => Ok(Self::Pending),
            _ => {
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .ok_or_else(|| ParseBlockTagError::UnknownTag(s.to_owned()))?;
                if digits.is_empty() {
                    return Err(ParseBlockTagError::InvalidNumber(s.to_owned()));
                }
                u64::from_str_radix(digits, 16)
                    .map(Self::Number)
                    .map_err(|_| ParseBlockTagError::InvalidNumber(s.to_owned()))
            }
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
