//! Scores and classifies a window's profiles.
//!
//! RULE: scales are rebuilt from the profiles passed in, every call.
//! Scores are relative to that population and are never reused for
//! another window.

use crate::{
    aggregate::CustomerProfile,
    quantile::{Direction, QuantileScale},
    segment::{Segment, SegmentRules},
    types::Score,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCustomer {
    #[serde(flatten)]
    pub profile: CustomerProfile,
    pub customer_name: Option<String>,
    pub recency_score: Score,
    pub frequency_score: Score,
    pub monetary_score: Score,
    pub segment: Segment,
}

impl ScoredCustomer {
    /// Compact "R-F-V" code, e.g. "5-4-3".
    pub fn rfv_code(&self) -> String {
        format!("{}-{}-{}", self.recency_score, self.frequency_score, self.monetary_score)
    }
}

/// Score every profile against the population formed by all of them.
///
/// Output order is deterministic: total monetary descending, then
/// customer key ascending.
pub fn score_profiles(profiles: Vec<CustomerProfile>, rules: &SegmentRules) -> Vec<ScoredCustomer> {
    let recency = QuantileScale::new(
        profiles.iter().map(|p| f64::from(p.recency_days)),
        Direction::LowerIsBetter,
    );
    let frequency = QuantileScale::new(
        profiles.iter().map(|p| f64::from(p.frequency)),
        Direction::HigherIsBetter,
    );
    let monetary = QuantileScale::new(
        profiles.iter().map(|p| p.total_monetary),
        Direction::HigherIsBetter,
    );

    let mut scored: Vec<ScoredCustomer> = profiles
        .into_iter()
        .map(|profile| {
            let r = recency.score(f64::from(profile.recency_days));
            let f = frequency.score(f64::from(profile.frequency));
            let v = monetary.score(profile.total_monetary);
            ScoredCustomer {
                segment: rules.classify(r, f, v),
                recency_score: r,
                frequency_score: f,
                monetary_score: v,
                customer_name: None,
                profile,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.profile
            .total_monetary
            .total_cmp(&a.profile.total_monetary)
            .then_with(|| a.profile.customer_key.cmp(&b.profile.customer_key))
    });
    scored
}
