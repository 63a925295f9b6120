//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single deal (won sale) as stored by the data source.
pub type DealId = String;

/// Identifier of a lead/contact.
pub type LeadId = String;

/// Correlation id for one analysis pass. Appears in every log line of the pass.
pub type RunId = String;

/// Recency value used when a customer has no dated purchase.
pub const RECENCY_SENTINEL_DAYS: u32 = 999;

/// Groups transactions into one customer.
///
/// A deal without a lead falls back to its own id. Those keys are
/// `Unattributed`: each one is effectively a singleton customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CustomerKey {
    Lead(LeadId),
    Unattributed(DealId),
}

impl CustomerKey {
    pub fn id(&self) -> &str {
        match self {
            Self::Lead(id) | Self::Unattributed(id) => id,
        }
    }

    pub fn is_attributed(&self) -> bool {
        matches!(self, Self::Lead(_))
    }
}

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lead(id)         => write!(f, "{id}"),
            Self::Unattributed(id) => write!(f, "deal:{id}"),
        }
    }
}

/// An ordinal quantile score. Always in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: Score = Score(1);
    pub const MID: Score = Score(3);
    pub const MAX: Score = Score(5);

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&value).then_some(Self(value))
    }

    /// Clamp any band index into the valid range.
    pub fn clamped(value: usize) -> Self {
        Self(value.clamp(Self::MIN.0 as usize, Self::MAX.0 as usize) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All scores, lowest first.
    pub fn all() -> impl Iterator<Item = Score> {
        (Self::MIN.0..=Self::MAX.0).map(Score)
    }

    /// Zero-based position, for histogram buckets.
    pub fn index(self) -> usize {
        (self.0 - Self::MIN.0) as usize
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {value} outside 1..=5"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
