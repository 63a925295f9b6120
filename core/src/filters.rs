//! Caller-supplied window filters.
//!
//! Absent values and the literal "all" both mean "unfiltered".

use crate::error::{RfvError, RfvResult};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub const ALL: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentFilters {
    /// Inclusive lower bound on the closed/won date.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound on the closed/won date.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_id")]
    pub funnel_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub seller_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub origin_id: Option<String>,
}

impl SegmentFilters {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn with_funnel(mut self, funnel_id: &str) -> Self {
        self.funnel_id = normalize(Some(funnel_id));
        self
    }

    pub fn with_seller(mut self, seller_id: &str) -> Self {
        self.seller_id = normalize(Some(seller_id));
        self
    }

    pub fn with_origin(mut self, origin_id: &str) -> Self {
        self.origin_id = normalize(Some(origin_id));
        self
    }

    pub fn validate(&self) -> RfvResult<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(RfvError::InvalidFilter(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        Ok(())
    }
}

/// Map empty strings and "all" (any case) to `None`.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(value.to_string())
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize(raw.as_deref()))
}
