use super::{deal_predicate, SqliteStore};
use crate::{
    error::RfvResult,
    filters::SegmentFilters,
    source::{DealRow, Page, PageRequest},
};
use rusqlite::{params, params_from_iter};

/// A deal to insert. `amount` is raw text, exactly as upstream sends it.
#[derive(Debug, Clone, Default)]
pub struct NewDeal {
    pub deal_id: String,
    pub lead_id: Option<String>,
    pub funnel_id: Option<String>,
    pub seller_id: Option<String>,
    pub origin_id: Option<String>,
    pub status: String,
    pub amount: Option<String>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    pub archived: bool,
    pub deleted_at: Option<String>,
}

impl NewDeal {
    /// A won deal for `lead_id`, closed at `closed_at`.
    pub fn won(deal_id: &str, lead_id: Option<&str>, amount: &str, closed_at: &str) -> Self {
        Self {
            deal_id: deal_id.to_string(),
            lead_id: lead_id.map(str::to_string),
            status: "won".to_string(),
            amount: Some(amount.to_string()),
            created_at: Some(closed_at.to_string()),
            closed_at: Some(closed_at.to_string()),
            ..Self::default()
        }
    }
}

impl SqliteStore {
    // ── Deals ──────────────────────────────────────────────────

    pub fn insert_deal(&self, deal: &NewDeal) -> RfvResult<()> {
        self.insert_deals(std::slice::from_ref(deal))
    }

    /// Insert many deals in one transaction.
    pub fn insert_deals(&self, deals: &[NewDeal]) -> RfvResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO deals (
                    deal_id, lead_id, funnel_id, seller_id, origin_id, status,
                    amount, created_at, closed_at, archived, deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for d in deals {
                stmt.execute(params![
                    &d.deal_id,
                    &d.lead_id,
                    &d.funnel_id,
                    &d.seller_id,
                    &d.origin_id,
                    &d.status,
                    &d.amount,
                    &d.created_at,
                    &d.closed_at,
                    if d.archived { 1 } else { 0 },
                    &d.deleted_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of won, live deals matching `filters`.
    pub fn won_deal_count(&self, filters: &SegmentFilters) -> RfvResult<u64> {
        let (predicate, values) = deal_predicate(filters);
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM deals d WHERE {predicate}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub(super) fn query_deal_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<DealRow>> {
        let total = self.won_deal_count(filters)?;
        let (predicate, values) = deal_predicate(filters);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT d.deal_id, d.lead_id, CAST(d.amount AS TEXT), d.created_at, d.closed_at
             FROM deals d
             WHERE {predicate}
             ORDER BY d.deal_id ASC
             LIMIT {} OFFSET {}",
            page.limit, page.offset
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(DealRow {
                    id:         row.get(0)?,
                    lead_id:    row.get(1)?,
                    amount:     row.get(2)?,
                    created_at: row.get(3)?,
                    closed_at:  row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::with_total(rows, total))
    }
}
