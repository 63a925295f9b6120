//! Recency deriver.

use chrono::{DateTime, Utc};

/// Whole days between `last` and `as_of`, floored.
///
/// - `None` → `sentinel_days`, so undated customers rank least recent.
/// - purchases after `as_of` → 0.
/// - real values are capped at `sentinel_days` so no dated customer ever
///   ranks behind an undated one.
pub fn recency_days(last: Option<DateTime<Utc>>, as_of: DateTime<Utc>, sentinel_days: u32) -> u32 {
    match last {
        None => sentinel_days,
        Some(at) => {
            let days = (as_of - at).num_days().max(0);
            u32::try_from(days).unwrap_or(u32::MAX).min(sentinel_days)
        }
    }
}
