//! Transaction aggregator: one profile per distinct customer key.

use crate::{
    ingest::TransactionRecord,
    recency::recency_days,
    types::{CustomerKey, RECENCY_SENTINEL_DAYS},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_key: CustomerKey,
    pub total_monetary: f64,
    /// Always >= 1: a profile only exists for a customer with a transaction.
    pub frequency: u32,
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub recency_days: u32,
}

impl CustomerProfile {
    fn open(customer_key: CustomerKey) -> Self {
        Self {
            customer_key,
            total_monetary: 0.0,
            frequency: 0,
            last_purchase_at: None,
            recency_days: RECENCY_SENTINEL_DAYS,
        }
    }

    fn absorb(&mut self, record: &TransactionRecord) {
        self.total_monetary += record.amount;
        self.frequency += 1;
        if let Some(at) = record.occurred_at {
            self.last_purchase_at = Some(self.last_purchase_at.map_or(at, |prev| prev.max(at)));
        }
    }
}

/// Fold transactions into profiles. O(n) time, O(k) space.
/// `recency_days` is left at the sentinel; see `derive_recency`.
pub fn aggregate(records: &[TransactionRecord]) -> HashMap<CustomerKey, CustomerProfile> {
    let mut profiles: HashMap<CustomerKey, CustomerProfile> = HashMap::new();
    for record in records {
        profiles
            .entry(record.customer_key.clone())
            .or_insert_with(|| CustomerProfile::open(record.customer_key.clone()))
            .absorb(record);
    }
    profiles
}

/// Fill `recency_days` on every profile relative to `as_of`.
pub fn derive_recency(
    profiles: &mut HashMap<CustomerKey, CustomerProfile>,
    as_of: DateTime<Utc>,
    sentinel_days: u32,
) {
    for profile in profiles.values_mut() {
        profile.recency_days = recency_days(profile.last_purchase_at, as_of, sentinel_days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn txn(id: &str, lead: &str, amount: f64, day: Option<u32>) -> TransactionRecord {
        TransactionRecord {
            deal_id: id.into(),
            customer_key: CustomerKey::Lead(lead.into()),
            amount,
            occurred_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn single_customer_profile_is_exact() {
        let amounts = [100.0, 250.5, 0.0, 49.5];
        let days = [3, 17, 9, 11];
        let records: Vec<_> = amounts
            .iter()
            .zip(days)
            .enumerate()
            .map(|(i, (a, d))| txn(&format!("d{i}"), "l1", *a, Some(d)))
            .collect();

        let profiles = aggregate(&records);
        assert_eq!(profiles.len(), 1);
        let p = &profiles[&CustomerKey::Lead("l1".into())];
        assert_eq!(p.frequency, 4);
        assert!((p.total_monetary - 400.0).abs() < 1e-9);
        assert_eq!(p.last_purchase_at, Some(Utc.with_ymd_and_hms(2024, 1, 17, 12, 0, 0).unwrap()));
    }

    #[test]
    fn undated_records_count_but_do_not_move_recency() {
        let records = vec![txn("d1", "l1", 10.0, None), txn("d2", "l1", 5.0, Some(2)), txn("d3", "l1", 1.0, None)];
        let profiles = aggregate(&records);
        let p = &profiles[&CustomerKey::Lead("l1".into())];
        assert_eq!(p.frequency, 3);
        assert_eq!(p.last_purchase_at, Some(Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()));
    }

    #[test]
    fn entirely_undated_customer_gets_sentinel_recency() {
        let mut profiles = aggregate(&[txn("d1", "l1", 10.0, None)]);
        derive_recency(&mut profiles, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), 999);
        assert_eq!(profiles[&CustomerKey::Lead("l1".into())].recency_days, 999);
    }

    #[test]
    fn distinct_keys_make_distinct_profiles() {
        let profiles = aggregate(&[txn("d1", "a", 1.0, Some(1)), txn("d2", "b", 2.0, Some(1)), txn("d3", "a", 3.0, Some(1))]);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[&CustomerKey::Lead("a".into())].frequency, 2);
    }
}
