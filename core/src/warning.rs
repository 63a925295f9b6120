//! Data-quality warnings surfaced to callers.
//!
//! RULE: degraded input never fails a run silently. Anything that makes
//! a result possibly incomplete or approximate becomes a warning here,
//! and callers render a non-blocking "data may be incomplete" indicator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataWarning {
    /// A page request failed after at least one page succeeded.
    PartialFetch {
        query: String,
        pages_fetched: u32,
        rows_fetched: usize,
        reason: String,
    },
    /// The caller cancelled between pages.
    Cancelled {
        query: String,
        pages_fetched: u32,
        rows_fetched: usize,
    },
    /// Secondary lookup unavailable; results lack display names only.
    LookupUnavailable {
        query: String,
        reason: String,
    },
    /// Rows ingested with defaults substituted.
    MalformedRecords {
        invalid_amounts: usize,
        undated: usize,
    },
}

impl DataWarning {
    /// True when the customer population itself may be incomplete.
    /// Lookups and malformed fields degrade detail, not coverage.
    pub fn affects_population(&self) -> bool {
        matches!(self, Self::PartialFetch { .. } | Self::Cancelled { .. })
    }
}
