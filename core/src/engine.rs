//! The segmentation engine: one shared analysis pass, two projections.
//!
//! PIPELINE (fixed order, each stage a pure transformation):
//!   1. Fetch       deals and lead names, concurrently, each paginated
//!   2. Ingest      raw rows → TransactionRecords (parse-or-default)
//!   3. Aggregate   one CustomerProfile per customer key
//!   4. Recency     days since last purchase relative to `as_of`
//!   5. Score       quantile scales over this window's population
//!   6. Classify    ordered segment rules
//!   7. Metrics     histograms, cohorts, totals
//!
//! RULES:
//!   - Nothing is cached between calls. Every call is a full recompute.
//!   - `run_segmentation` and `get_metrics` are projections of the same
//!     `Analysis`; callers needing both should call `analyze` once.

use crate::{
    aggregate::{aggregate, derive_recency},
    cancel::CancelSignal,
    config::EngineConfig,
    error::RfvResult,
    fetcher::fetch_all,
    filters::SegmentFilters,
    ingest::{ingest_all, IngestReport},
    metrics::{compute_metrics, CohortCounts, DistributionHistograms, PopulationMetrics, SegmentSummary},
    scoring::{score_profiles, ScoredCustomer},
    source::{DealSource, LeadRow},
    types::{CustomerKey, RunId},
    warning::DataWarning,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEALS_QUERY: &str = "won_deals";
const LEADS_QUERY: &str = "lead_names";

/// Everything one pass computes. Both outward projections read from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub run_id: RunId,
    pub as_of: DateTime<Utc>,
    pub filters: SegmentFilters,
    pub customers: Vec<ScoredCustomer>,
    pub metrics: PopulationMetrics,
    pub ingest: IngestReport,
    pub warnings: Vec<DataWarning>,
}

/// Full analysis projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub as_of: DateTime<Utc>,
    pub customers: Vec<ScoredCustomer>,
    pub total_customers: u64,
    pub total_revenue: f64,
    pub distribution: DistributionHistograms,
    pub cohorts: CohortCounts,
    pub segments: Vec<SegmentSummary>,
    pub warnings: Vec<DataWarning>,
}

/// Summary-card projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_customers: u64,
    pub revenue: f64,
    pub average_ticket: f64,
    pub active_count: u64,
    pub attention_count: u64,
    pub at_risk_count: u64,
    pub new_count: u64,
    pub warnings: Vec<DataWarning>,
}

impl Analysis {
    /// Zero customers in the window. A valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// False when the population itself may be missing customers.
    pub fn is_complete(&self) -> bool {
        !self.warnings.iter().any(DataWarning::affects_population)
    }

    pub fn customer(&self, key: &CustomerKey) -> Option<&ScoredCustomer> {
        self.customers.iter().find(|c| &c.profile.customer_key == key)
    }

    pub fn report(&self) -> SegmentationReport {
        SegmentationReport {
            as_of: self.as_of,
            customers: self.customers.clone(),
            total_customers: self.metrics.total_customers,
            total_revenue: self.metrics.total_revenue,
            distribution: self.metrics.distribution.clone(),
            cohorts: self.metrics.cohorts.clone(),
            segments: self.metrics.segments.clone(),
            warnings: self.warnings.clone(),
        }
    }

    pub fn metrics(&self) -> MetricsSummary {
        MetricsSummary {
            total_customers: self.metrics.total_customers,
            revenue: self.metrics.total_revenue,
            average_ticket: self.metrics.average_ticket,
            active_count: self.metrics.cohorts.active,
            attention_count: self.metrics.cohorts.needs_attention,
            at_risk_count: self.metrics.cohorts.at_risk,
            new_count: self.metrics.cohorts.new,
            warnings: self.warnings.clone(),
        }
    }
}

pub struct SegmentationEngine<S> {
    source: S,
    config: EngineConfig,
}

impl<S: DealSource> SegmentationEngine<S> {
    pub fn new(source: S, config: EngineConfig) -> RfvResult<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Full analysis as of now.
    pub async fn run_segmentation(&self, filters: &SegmentFilters) -> RfvResult<SegmentationReport> {
        Ok(self.analyze(filters, Utc::now(), &CancelSignal::never()).await?.report())
    }

    /// Summary metrics as of now.
    pub async fn get_metrics(&self, filters: &SegmentFilters) -> RfvResult<MetricsSummary> {
        Ok(self.analyze(filters, Utc::now(), &CancelSignal::never()).await?.metrics())
    }

    /// The shared pass.
    ///
    /// Fails only on invalid filters or when the deal query retrieves
    /// nothing at all. Partial fetches, cancellation, a failed name lookup
    /// and malformed rows all degrade into `warnings`.
    pub async fn analyze(
        &self,
        filters: &SegmentFilters,
        as_of: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> RfvResult<Analysis> {
        filters.validate()?;
        let run_id: RunId = uuid::Uuid::new_v4().to_string();
        log::info!(
            "run={run_id} rfv: analyzing source={} as_of={as_of} filters={filters:?}",
            self.source.name()
        );

        let fetch = &self.config.fetch;
        let deals_fut = fetch_all(DEALS_QUERY, fetch, cancel, |page| self.source.deal_page(filters, page));
        let leads_fut = fetch_all(LEADS_QUERY, fetch, cancel, |page| self.source.lead_page(filters, page));
        let (deals, leads) = tokio::join!(deals_fut, leads_fut);

        let deals = deals?;
        let mut warnings: Vec<DataWarning> = deals.warning().into_iter().collect();

        let names: HashMap<String, String> = match leads {
            Ok(outcome) => {
                warnings.extend(outcome.warning());
                lead_names(outcome.records)
            }
            Err(e) => {
                log::warn!("run={run_id} rfv: lead lookup unavailable: {e}");
                warnings.push(DataWarning::LookupUnavailable {
                    query: LEADS_QUERY.to_string(),
                    reason: e.to_string(),
                });
                HashMap::new()
            }
        };

        let (records, ingest) = ingest_all(&deals.records);
        if ingest.has_malformed() {
            warnings.push(DataWarning::MalformedRecords {
                invalid_amounts: ingest.invalid_amounts,
                undated: ingest.undated,
            });
        }

        let mut profiles = aggregate(&records);
        derive_recency(&mut profiles, as_of, self.config.recency_sentinel_days);

        let mut customers = score_profiles(profiles.into_values().collect(), &self.config.segment_rules);
        for customer in &mut customers {
            if let CustomerKey::Lead(id) = &customer.profile.customer_key {
                customer.customer_name = names.get(id).cloned();
            }
        }

        let metrics = compute_metrics(&customers, &self.config.cohorts);

        log::info!(
            "run={run_id} rfv: {} deal(s) → {} customer(s), revenue={:.2}, warnings={}",
            records.len(),
            metrics.total_customers,
            metrics.total_revenue,
            warnings.len()
        );
        if customers.is_empty() {
            log::info!("run={run_id} rfv: no customers in window");
        }

        Ok(Analysis {
            run_id,
            as_of,
            filters: filters.clone(),
            customers,
            metrics,
            ingest,
            warnings,
        })
    }
}

fn lead_names(leads: Vec<LeadRow>) -> HashMap<String, String> {
    leads
        .into_iter()
        .filter_map(|lead| {
            let name = lead.name?.trim().to_string();
            (!name.is_empty()).then_some((lead.id, name))
        })
        .collect()
}
