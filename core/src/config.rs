use crate::{
    error::{RfvError, RfvResult},
    segment::SegmentRules,
    types::RECENCY_SENTINEL_DAYS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_PAGE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

// ── Pagination ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,
    /// Hard stop for sources that never return a short page.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size:       DEFAULT_PAGE_SIZE,
            page_timeout_ms: DEFAULT_PAGE_TIMEOUT_MS,
            max_pages:       DEFAULT_MAX_PAGES,
        }
    }
}

fn default_page_size() -> usize { DEFAULT_PAGE_SIZE }
fn default_page_timeout_ms() -> u64 { DEFAULT_PAGE_TIMEOUT_MS }
fn default_max_pages() -> u32 { DEFAULT_MAX_PAGES }

// ── Cohorts ────────────────────────────────────────────────────────

/// Absolute recency thresholds. Independent of quantile scores.
///
/// active:          recency_days <= active_max_days
/// needs_attention: active_max_days < recency_days <= attention_max_days
/// dormant:         recency_days > attention_max_days
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CohortThresholds {
    pub active_max_days: u32,
    pub attention_max_days: u32,
}

impl Default for CohortThresholds {
    fn default() -> Self {
        Self {
            active_max_days: 30,
            attention_max_days: 35,
        }
    }
}

// ── Engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default = "default_sentinel")]
    pub recency_sentinel_days: u32,
    #[serde(default)]
    pub cohorts: CohortThresholds,
    #[serde(default)]
    pub segment_rules: SegmentRules,
}

fn default_sentinel() -> u32 { RECENCY_SENTINEL_DAYS }

#[derive(Debug, Clone, Deserialize)]
struct SegmentRulesFile {
    rules: SegmentRules,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// `rfv/engine.json` is required; `rfv/segment_rules.json` overrides
    /// the built-in rule table when present.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/rfv/engine.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        let rules_path = format!("{data_dir}/rfv/segment_rules.json");
        if Path::new(&rules_path).exists() {
            let rules_content = std::fs::read_to_string(&rules_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {rules_path}: {e}"))?;
            let file: SegmentRulesFile = serde_json::from_str(&rules_content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {rules_path}: {e}"))?;
            config.segment_rules = file.rules;
            log::debug!("Loaded {} segment rules from {rules_path}", config.segment_rules.rules().len());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self {
            fetch: FetchConfig::default(),
            recency_sentinel_days: RECENCY_SENTINEL_DAYS,
            cohorts: CohortThresholds::default(),
            segment_rules: SegmentRules::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.fetch.page_size = page_size;
        self
    }

    pub fn validate(&self) -> RfvResult<()> {
        if self.fetch.page_size == 0 {
            return Err(RfvError::InvalidConfig("fetch.page_size must be > 0".into()));
        }
        if self.fetch.max_pages == 0 {
            return Err(RfvError::InvalidConfig("fetch.max_pages must be > 0".into()));
        }
        if self.fetch.page_timeout_ms == 0 {
            return Err(RfvError::InvalidConfig("fetch.page_timeout_ms must be > 0".into()));
        }
        if self.cohorts.attention_max_days < self.cohorts.active_max_days {
            return Err(RfvError::InvalidConfig(format!(
                "cohorts.attention_max_days ({}) is below active_max_days ({})",
                self.cohorts.attention_max_days, self.cohorts.active_max_days
            )));
        }
        if self.recency_sentinel_days <= self.cohorts.attention_max_days {
            return Err(RfvError::InvalidConfig(format!(
                "recency_sentinel_days ({}) must exceed cohorts.attention_max_days ({})",
                self.recency_sentinel_days, self.cohorts.attention_max_days
            )));
        }
        self.segment_rules.validate().map_err(RfvError::InvalidConfig)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_test()
    }
}
