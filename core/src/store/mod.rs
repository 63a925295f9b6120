//! SQLite-backed deal source.
//!
//! RULE: Only the store talks to the database.
//! The engine reaches it exclusively through the `DealSource` trait.
//!
//! rusqlite is blocking. Page queries issued through `DealSource` run on
//! tokio's blocking pool so the executor keeps polling the other query and
//! the per-page timeout.

use crate::{
    error::{RfvError, RfvResult},
    filters::SegmentFilters,
    source::{DealRow, DealSource, LeadRow, Page, PageRequest},
};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

mod deals;
mod leads;

pub use deals::NewDeal;
pub use leads::NewLead;

/// Cheap to clone: clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> RfvResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RfvResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RfvResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../../migrations/001_deals.sql"))?;
        Ok(())
    }

    fn conn(&self) -> RfvResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RfvError::Other(anyhow::anyhow!("sqlite connection mutex poisoned")))
    }
}

/// WHERE clause for won, live deals in the window, aliased as `d`.
/// Every value is bound as a parameter; returns (sql, params).
fn deal_predicate(filters: &SegmentFilters) -> (String, Vec<String>) {
    let mut clauses = vec![
        "d.status = 'won'".to_string(),
        "d.archived = 0".to_string(),
        "d.deleted_at IS NULL".to_string(),
    ];
    let mut params: Vec<String> = Vec::new();

    if let Some(start) = filters.start {
        params.push(start.format("%Y-%m-%d").to_string());
        clauses.push(format!("date(d.closed_at) >= ?{}", params.len()));
    }
    if let Some(end) = filters.end {
        params.push(end.format("%Y-%m-%d").to_string());
        clauses.push(format!("date(d.closed_at) <= ?{}", params.len()));
    }
    for (column, value) in [
        ("d.funnel_id", &filters.funnel_id),
        ("d.seller_id", &filters.seller_id),
        ("d.origin_id", &filters.origin_id),
    ] {
        if let Some(value) = value {
            params.push(value.clone());
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    }

    (clauses.join(" AND "), params)
}

/// Run a store query on the blocking pool.
async fn off_executor<T, F>(store: &SqliteStore, query: F) -> RfvResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SqliteStore) -> RfvResult<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || query(&store))
        .await
        .map_err(|e| RfvError::Other(anyhow::anyhow!("sqlite query task failed: {e}")))?
}

#[async_trait]
impl DealSource for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn deal_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<DealRow>> {
        let filters = filters.clone();
        off_executor(self, move |store| store.query_deal_page(&filters, page)).await
    }

    async fn lead_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<LeadRow>> {
        let filters = filters.clone();
        off_executor(self, move |store| store.query_lead_page(&filters, page)).await
    }
}
