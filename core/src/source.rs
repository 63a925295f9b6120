//! The data-source seam.
//!
//! The engine only ever talks to a `DealSource`. Concrete sources (the
//! SQLite store, a hosted REST API client, test fakes) are constructed by
//! the caller and injected; the engine holds no global client.

use crate::{error::RfvResult, filters::SegmentFilters};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Offset-style page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn nth(page: u32, page_size: usize) -> Self {
        Self {
            offset: page as usize * page_size,
            limit: page_size,
        }
    }
}

/// One page of results. `total_count` is only a confirmation signal:
/// sources are not required to provide it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows, total_count: None }
    }

    pub fn with_total(rows: Vec<T>, total_count: u64) -> Self {
        Self { rows, total_count: Some(total_count) }
    }
}

/// A won deal exactly as the source returns it. Nothing is parsed yet:
/// amounts and timestamps are raw text, validated once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRow {
    pub id: String,
    pub lead_id: Option<String>,
    pub amount: Option<String>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRow {
    pub id: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait DealSource: Send + Sync {
    /// Short, stable name used in logs and warnings.
    fn name(&self) -> &str;

    /// Won, non-archived, non-deleted deals matching `filters`, in a
    /// stable order.
    async fn deal_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<DealRow>>;

    /// Leads that own at least one deal matching `filters`.
    async fn lead_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<LeadRow>>;
}

#[async_trait]
impl<S: DealSource + ?Sized> DealSource for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deal_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<DealRow>> {
        (**self).deal_page(filters, page).await
    }

    async fn lead_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<LeadRow>> {
        (**self).lead_page(filters, page).await
    }
}
