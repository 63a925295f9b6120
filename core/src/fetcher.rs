//! Paginated bulk fetcher.
//!
//! Pulls every row of a filtered query from a page-limited source.
//!
//! TERMINATION (checked after every page, in this order):
//!   1. the page returned fewer than `page_size` rows   (primary signal)
//!   2. the source's total count says everything is in (confirmation only)
//!
//! FAILURE POLICY:
//!   - first page fails       → `RfvError::NoData`
//!   - later page fails       → rows so far, `FetchStatus::Partial`
//!   - cancelled between pages → rows so far, `FetchStatus::Cancelled`
//!   - `max_pages` reached    → rows so far, `FetchStatus::Partial`
//!
//! Rows are appended in the order the source returns them. Nothing is
//! reordered or deduplicated here.

use crate::{
    cancel::CancelSignal,
    config::FetchConfig,
    error::{RfvError, RfvResult},
    source::{Page, PageRequest},
    warning::DataWarning,
};
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Complete,
    Partial { failed_page: u32, reason: String },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub query: String,
    pub records: Vec<T>,
    pub pages: u32,
    pub status: FetchStatus,
}

impl<T> FetchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }

    pub fn warning(&self) -> Option<DataWarning> {
        match &self.status {
            FetchStatus::Complete => None,
            FetchStatus::Partial { reason, .. } => Some(DataWarning::PartialFetch {
                query: self.query.clone(),
                pages_fetched: self.pages,
                rows_fetched: self.records.len(),
                reason: reason.clone(),
            }),
            FetchStatus::Cancelled => Some(DataWarning::Cancelled {
                query: self.query.clone(),
                pages_fetched: self.pages,
                rows_fetched: self.records.len(),
            }),
        }
    }
}

/// Fetch every page of `query` through `fetch_page`.
///
/// Pages are requested strictly one after another: whether page N+1 is
/// needed depends on the size of page N.
pub async fn fetch_all<T, F, Fut>(
    query: &str,
    config: &FetchConfig,
    cancel: &CancelSignal,
    mut fetch_page: F,
) -> RfvResult<FetchOutcome<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = RfvResult<Page<T>>>,
{
    let page_size = config.page_size.max(1);
    let mut records: Vec<T> = Vec::new();
    let mut pages: u32 = 0;

    let outcome = |records: Vec<T>, pages: u32, status: FetchStatus| FetchOutcome {
        query: query.to_string(),
        records,
        pages,
        status,
    };

    loop {
        if cancel.is_cancelled() {
            log::warn!(
                "fetch '{query}': cancelled after {pages} page(s), {} row(s)",
                records.len()
            );
            return Ok(outcome(records, pages, FetchStatus::Cancelled));
        }

        if pages >= config.max_pages {
            log::warn!(
                "fetch '{query}': stopped at page cap {} with {} row(s)",
                config.max_pages,
                records.len()
            );
            let reason = format!("page cap of {} reached", config.max_pages);
            return Ok(outcome(records, pages, FetchStatus::Partial { failed_page: pages, reason }));
        }

        let request = PageRequest::nth(pages, page_size);
        let result = match tokio::time::timeout(config.page_timeout(), fetch_page(request)).await {
            Ok(result) => result,
            Err(_) => Err(RfvError::PageTimeout {
                query: query.to_string(),
                page: pages,
                after_ms: config.page_timeout_ms,
            }),
        };

        let page = match result {
            Ok(page) => page,
            Err(e) if pages == 0 => {
                log::error!("fetch '{query}': first page failed: {e}");
                return Err(RfvError::NoData {
                    query: query.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                log::warn!(
                    "fetch '{query}': page {pages} failed, keeping {} row(s): {e}",
                    records.len()
                );
                let status = FetchStatus::Partial { failed_page: pages, reason: e.to_string() };
                return Ok(outcome(records, pages, status));
            }
        };

        pages += 1;
        let returned = page.rows.len();
        records.extend(page.rows);

        log::debug!(
            "fetch '{query}': page {} returned {returned} row(s), {} total",
            pages - 1,
            records.len()
        );

        if returned < page_size {
            break;
        }
        if let Some(total) = page.total_count {
            if records.len() as u64 >= total {
                break;
            }
        }
    }

    log::info!("fetch '{query}': {} row(s) in {pages} page(s)", records.len());
    Ok(outcome(records, pages, FetchStatus::Complete))
}
