//! Database row types used by sqlx for typed queries.

use chrono::NaiveDate;

use crate::types::Transaction;

/// Columns the pipeline reads from the import job's transactions table.
#[derive(Debug, sqlx::FromRow)]
pub struct TransactionRow {
    pub txn_date: Option<NaiveDate>,
    pub area_name: Option<String>,
    pub price: f64,
    pub price_per_sqm: Option<f64>,
}

impl TransactionRow {
    /// Rows without a date or a usable area cannot be binned; the loader
    /// counts and drops them here.
    pub fn into_transaction(self) -> Option<Transaction> {
        let date = self.txn_date?;
        let area = self.area_name.filter(|a| !a.trim().is_empty())?;
        Some(Transaction {
            date,
            area,
            price: self.price,
            price_per_sqm: self.price_per_sqm,
        })
    }
}

/// Persisted signal row, keyed by dedupe_key for idempotent upserts.
#[derive(Debug, sqlx::FromRow)]
pub struct SignalRow {
    pub tenant_id: String,
    pub source: String,
    pub signal_type: String,
    pub severity: String,
    pub status: String,
    pub geo_type: String,
    pub geo_id: String,
    pub geo_name: String,
    pub segment: String,
    pub metric: String,
    pub timeframe: String,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub delta_abs: Option<f64>,
    pub delta_pct: Option<f64>,
    pub confidence: f64,
    pub evidence: String,
    pub dedupe_key: String,
    pub created_at: i64,
    pub updated_at: i64,
}
