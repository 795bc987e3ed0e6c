use sqlx::SqlitePool;
use tracing::debug;

use crate::config::LOAD_PAGE_SIZE;
use crate::db::models::TransactionRow;
use crate::error::{AppError, Result};
use crate::types::Transaction;

/// Counters from the load phase, reported to the operator so a low
/// signal count can be traced to data quality rather than code.
#[derive(Debug, Default)]
pub struct LoadStats {
    pub pages: usize,
    pub fetched: usize,
    pub skipped_no_area: usize,
}

/// Resolve the tenant to run for. An explicit override wins; otherwise
/// the first tenant present in the transactions table. No tenant at all
/// is fatal — there is nothing to compute.
pub async fn resolve_tenant(pool: &SqlitePool, override_id: Option<&str>) -> Result<String> {
    if let Some(tenant) = override_id {
        return Ok(tenant.to_string());
    }
    let row: Option<(String,)> =
        sqlx::query_as("SELECT tenant_id FROM transactions ORDER BY tenant_id LIMIT 1")
            .fetch_optional(pool)
            .await?;
    row.map(|(tenant,)| tenant).ok_or_else(|| {
        AppError::TenantResolution("no tenants present in transactions table".to_string())
    })
}

/// Load every qualifying sale transaction for the tenant, page by page.
/// Pages keep coming until one returns fewer than LOAD_PAGE_SIZE rows.
/// Store errors abort the run — a partial load would silently shrink the
/// signal set.
pub async fn load_transactions(
    pool: &SqlitePool,
    tenant_id: &str,
) -> Result<(Vec<Transaction>, LoadStats)> {
    let mut transactions = Vec::new();
    let mut stats = LoadStats::default();
    let mut offset: i64 = 0;

    loop {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT txn_date, area_name, price, price_per_sqm
            FROM transactions
            WHERE tenant_id = ?
              AND category = 'sale'
              AND price > 0
              AND txn_date IS NOT NULL
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(tenant_id)
        .bind(LOAD_PAGE_SIZE)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let page_len = rows.len();
        stats.pages += 1;
        stats.fetched += page_len;

        for row in rows {
            match row.into_transaction() {
                Some(txn) => transactions.push(txn),
                None => stats.skipped_no_area += 1,
            }
        }

        debug!(page = stats.pages, rows = page_len, "transaction page loaded");

        if (page_len as i64) < LOAD_PAGE_SIZE {
            break;
        }
        offset += LOAD_PAGE_SIZE;
    }

    Ok((transactions, stats))
}
