use alloy::primitives::B256;
use serde::{Deserialize, Deserializer, de};
use std::collections::BTreeSet;

/// Maximum number of topics carried by a log, and therefore the maximum
/// number of positions in a topic pattern.
pub const MAX_TOPICS: usize = 4;

/// Criterion for one position of a log's topic list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    /// Wildcard. Accepts any topic present at this position.
    #[default]
    Any,
    /// Accepts only this topic.
    Exactly(B256),
    /// Accepts any member of the set.
    OneOf(BTreeSet<B256>),
}

impl TopicPattern {
    /// Build a pattern from a list of candidate topics.
    ///
    /// No candidates is a wildcard, a single candidate is an exact match.
    pub fn from_candidates<I: IntoIterator<Item = B256>>(candidates: I) -> Self {
        let set: BTreeSet<B256> = candidates.into_iter().collect();
        if set.len() > 1 {
            return Self::OneOf(set);
        }
        set.into_iter().next().map_or(Self::Any, Self::Exactly)
    }

    /// True if this pattern is a wildcard.
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True if the pattern accepts `topic`.
    pub fn accepts(&self, topic: &B256) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(t) => t == topic,
            Self::OneOf(set) => set.contains(topic),
        }
    }
}

impl From<B256> for TopicPattern {
    fn from(topic: B256) -> Self {
        Self::Exactly(topic)
    }
}

impl From<Option<B256>> for TopicPattern {
    fn from(topic: Option<B256>) -> Self {
        topic.map_or(Self::Any, Self::Exactly)
    }
}

impl FromIterator<B256> for TopicPattern {
    fn from_iter<T: IntoIterator<Item = B256>>(iter: T) -> Self {
        Self::from_candidates(iter)
    }
}

/// Wire form of a topic position: `null`, a hash, or an array of hashes.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTopic {
    Single(B256),
    Many(Vec<B256>),
}

impl<'de> Deserialize<'de> for TopicPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawTopic>::deserialize(deserializer).map_err(|_| {
            de::Error::custom("topic must be null, a 32-byte hash, or an array of hashes")
        })?;
        Ok(match raw {
            None => Self::Any,
            Some(RawTopic::Single(topic)) => Self::Exactly(topic),
            Some(RawTopic::Many(topics)) => Self::from_candidates(topics),
        })
    }
}
