use super::{deal_predicate, SqliteStore};
use crate::{
    error::RfvResult,
    filters::SegmentFilters,
    source::{LeadRow, Page, PageRequest},
};
use rusqlite::{params, params_from_iter};

#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub lead_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl NewLead {
    pub fn named(lead_id: &str, name: &str) -> Self {
        Self {
            lead_id: lead_id.to_string(),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

impl SqliteStore {
    // ── Leads ──────────────────────────────────────────────────

    pub fn insert_leads(&self, leads: &[NewLead]) -> RfvResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO leads (lead_id, name, email, created_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for l in leads {
                stmt.execute(params![&l.lead_id, &l.name, &l.email, &l.created_at, &l.deleted_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub(super) fn query_lead_page(&self, filters: &SegmentFilters, page: PageRequest) -> RfvResult<Page<LeadRow>> {
        let (predicate, values) = deal_predicate(filters);
        let scope = format!(
            "FROM leads l
             WHERE l.deleted_at IS NULL
               AND EXISTS (SELECT 1 FROM deals d WHERE d.lead_id = l.lead_id AND {predicate})"
        );
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {scope}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT l.lead_id, l.name {scope}
             ORDER BY l.lead_id ASC
             LIMIT {} OFFSET {}",
            page.limit, page.offset
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(LeadRow { id: row.get(0)?, name: row.get(1)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::with_total(rows, total.max(0) as u64))
    }
}
