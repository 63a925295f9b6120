//! Metrics and cohort aggregator.
//!
//! Two classification systems live side by side here and must not be
//! conflated:
//!   - cohorts (active / needs attention / dormant) use RAW recency days
//!     against absolute thresholds;
//!   - at-risk and new counts use the relative-score SEGMENT labels.

use crate::{
    config::CohortThresholds,
    scoring::ScoredCustomer,
    segment::Segment,
    types::Score,
};
use serde::{Deserialize, Serialize};

/// Customer counts per score, index 0 = score 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistogram(pub [u64; 5]);

impl ScoreHistogram {
    pub fn record(&mut self, score: Score) {
        self.0[score.index()] += 1;
    }

    pub fn count(&self, score: Score) -> u64 {
        self.0[score.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionHistograms {
    pub recency: ScoreHistogram,
    pub frequency: ScoreHistogram,
    pub monetary: ScoreHistogram,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortCounts {
    pub active: u64,
    pub needs_attention: u64,
    pub dormant: u64,
    pub at_risk: u64,
    pub new: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub label: String,
    pub customers: u64,
    pub revenue: f64,
    /// Fraction of the window's customers, 0.0..=1.0.
    pub share_of_customers: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationMetrics {
    pub total_customers: u64,
    pub total_transactions: u64,
    pub total_revenue: f64,
    /// revenue / transactions; 0 when there are no transactions.
    pub average_ticket: f64,
    pub distribution: DistributionHistograms,
    pub cohorts: CohortCounts,
    pub segments: Vec<SegmentSummary>,
}

pub fn compute_metrics(customers: &[ScoredCustomer], thresholds: &CohortThresholds) -> PopulationMetrics {
    let mut distribution = DistributionHistograms::default();
    let mut cohorts = CohortCounts::default();
    let mut total_transactions: u64 = 0;
    let mut total_revenue = 0.0;
    let mut per_segment: Vec<(u64, f64)> = vec![(0, 0.0); Segment::ALL.len()];

    for c in customers {
        distribution.recency.record(c.recency_score);
        distribution.frequency.record(c.frequency_score);
        distribution.monetary.record(c.monetary_score);

        let days = c.profile.recency_days;
        if days <= thresholds.active_max_days {
            cohorts.active += 1;
        } else if days <= thresholds.attention_max_days {
            cohorts.needs_attention += 1;
        } else {
            cohorts.dormant += 1;
        }
        match c.segment {
            Segment::AtRisk => cohorts.at_risk += 1,
            Segment::New => cohorts.new += 1,
            _ => {}
        }

        total_transactions += u64::from(c.profile.frequency);
        total_revenue += c.profile.total_monetary;

        if let Some(slot) = Segment::ALL.iter().position(|s| *s == c.segment) {
            per_segment[slot].0 += 1;
            per_segment[slot].1 += c.profile.total_monetary;
        }
    }

    let total_customers = customers.len() as u64;
    let average_ticket = if total_transactions == 0 {
        0.0
    } else {
        total_revenue / total_transactions as f64
    };

    let segments = Segment::ALL
        .iter()
        .zip(per_segment)
        .map(|(segment, (count, revenue))| SegmentSummary {
            segment: *segment,
            label: segment.label().to_string(),
            customers: count,
            revenue,
            share_of_customers: if total_customers == 0 {
                0.0
            } else {
                count as f64 / total_customers as f64
            },
        })
        .collect();

    PopulationMetrics {
        total_customers,
        total_transactions,
        total_revenue,
        average_ticket,
        distribution,
        cohorts,
        segments,
    }
}
