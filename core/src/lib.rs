//! Customer RFV (recency, frequency, monetary) segmentation engine.
//!
//! Turns a paginated stream of won deals into per-customer quantile scores,
//! marketing segments and summary metrics. Entry point: `engine::SegmentationEngine`.

pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod ingest;
pub mod metrics;
pub mod quantile;
pub mod recency;
pub mod rng;
pub mod scoring;
pub mod segment;
pub mod source;
pub mod store;
pub mod types;
pub mod warning;

pub use cancel::CancelSignal;
pub use config::EngineConfig;
pub use engine::{Analysis, MetricsSummary, SegmentationEngine, SegmentationReport};
pub use error::{RfvError, RfvResult};
pub use filters::SegmentFilters;
pub use segment::Segment;
pub use source::DealSource;
pub use store::SqliteStore;
