//! Ingestion: raw source rows into typed transaction records.
//!
//! RULE: this is the only place raw text is parsed. Every malformed value
//! goes through `parse_or_default`, which substitutes a default and logs a
//! warning; nothing downstream ever sees NaN, a negative amount, or an
//! unparseable date.

use crate::{
    source::DealRow,
    types::{CustomerKey, DealId},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One won sale, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub deal_id: DealId,
    pub customer_key: CustomerKey,
    /// Always finite and >= 0.
    pub amount: f64,
    /// Closed/won time, else created time, else `None`.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Counters for values that were substituted during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows: usize,
    pub invalid_amounts: usize,
    pub undated: usize,
    pub unattributed: usize,
}

impl IngestReport {
    pub fn has_malformed(&self) -> bool {
        self.invalid_amounts > 0 || self.undated > 0
    }
}

/// Result of a parse-or-default attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    /// Field absent; default used. Not a data-quality problem by itself.
    Missing(T),
    /// Field present but unusable; default used and a warning logged.
    Invalid(T),
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Value(v) | Self::Missing(v) | Self::Invalid(v) => v,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Parse `raw` with `parse`, or fall back to `default`.
/// Blank strings count as missing. Unparseable input is logged once here.
pub fn parse_or_default<T, F>(raw: Option<&str>, default: T, field: &str, record_id: &str, parse: F) -> Parsed<T>
where
    F: FnOnce(&str) -> Option<T>,
{
    let text = match raw.map(str::trim) {
        None | Some("") => return Parsed::Missing(default),
        Some(text) => text,
    };
    match parse(text) {
        Some(value) => Parsed::Value(value),
        None => {
            log::warn!("ingest: record {record_id}: unparseable {field} '{text}', using default");
            Parsed::Invalid(default)
        }
    }
}

/// Monetary amounts: finite and non-negative, else 0.
pub fn parse_amount(raw: Option<&str>, record_id: &str) -> Parsed<f64> {
    parse_or_default(raw, 0.0, "amount", record_id, |text| {
        text.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
    })
}

/// Accepts RFC 3339, ISO/SQL date-times with or without offset, and plain
/// dates (midnight UTC). Offset-less values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn customer_key(row: &DealRow) -> CustomerKey {
    match row.lead_id.as_deref().map(str::trim) {
        Some(lead) if !lead.is_empty() => CustomerKey::Lead(lead.to_string()),
        _ => CustomerKey::Unattributed(row.id.clone()),
    }
}

/// Convert one row. Closed date wins; created date is the fallback.
pub fn ingest_row(row: &DealRow, report: &mut IngestReport) -> TransactionRecord {
    report.rows += 1;

    let amount = parse_amount(row.amount.as_deref(), &row.id);
    if amount.is_invalid() {
        report.invalid_amounts += 1;
    }

    let closed = parse_or_default(row.closed_at.as_deref(), None, "closed_at", &row.id, |t| {
        parse_timestamp(t).map(Some)
    })
    .into_inner();
    let occurred_at = closed.or_else(|| {
        parse_or_default(row.created_at.as_deref(), None, "created_at", &row.id, |t| {
            parse_timestamp(t).map(Some)
        })
        .into_inner()
    });
    if occurred_at.is_none() {
        report.undated += 1;
    }

    let customer_key = customer_key(row);
    if !customer_key.is_attributed() {
        report.unattributed += 1;
    }

    TransactionRecord {
        deal_id: row.id.clone(),
        customer_key,
        amount: amount.into_inner(),
        occurred_at,
    }
}

pub fn ingest_all(rows: &[DealRow]) -> (Vec<TransactionRecord>, IngestReport) {
    let mut report = IngestReport::default();
    let records = rows.iter().map(|row| ingest_row(row, &mut report)).collect();
    if report.has_malformed() {
        log::warn!(
            "ingest: {} row(s), {} invalid amount(s), {} undated",
            report.rows, report.invalid_amounts, report.undated
        );
    }
    (records, report)
}
