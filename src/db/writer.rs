use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;
use tracing::warn;

use crate::config::WRITE_BATCH_SIZE;
use crate::error::Result;
use crate::types::CandidateSignal;

/// Outcome of one persistence pass. Failed batches are isolated, not
/// fatal — the idempotent keys let a re-run heal whatever they missed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub upserted: usize,
    pub failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Upserts candidate signals in bounded batches, with dedupe_key as the
/// sole conflict target.
pub struct SignalWriter {
    pool: SqlitePool,
}

impl SignalWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write all candidates in WRITE_BATCH_SIZE chunks. Each chunk is one
    /// SQLite transaction; a failed chunk is logged with its offset and
    /// skipped, so earlier and later batches still commit.
    pub async fn write_all(&self, signals: &[CandidateSignal]) -> WriteReport {
        let mut report = WriteReport::default();

        for (batch_idx, chunk) in signals.chunks(WRITE_BATCH_SIZE).enumerate() {
            report.batches += 1;
            match self.write_batch(chunk).await {
                Ok(()) => report.upserted += chunk.len(),
                Err(e) => {
                    report.failed += chunk.len();
                    report.failed_batches += 1;
                    warn!(
                        batch = batch_idx,
                        offset = batch_idx * WRITE_BATCH_SIZE,
                        size = chunk.len(),
                        "signal batch failed, continuing: {e}"
                    );
                }
            }
        }

        report
    }

    async fn write_batch(&self, chunk: &[CandidateSignal]) -> Result<()> {
        let now = unix_seconds();
        let mut tx = self.pool.begin().await?;

        for signal in chunk {
            let evidence = serde_json::to_string(&signal.evidence)?;
            sqlx::query(
                r#"
                INSERT INTO signals (
                    tenant_id, source, signal_type, severity, status,
                    geo_type, geo_id, geo_name, segment, metric, timeframe,
                    current_value, previous_value, delta_abs, delta_pct,
                    confidence, evidence, dedupe_key, created_at, updated_at
                ) VALUES (?, ?, ?, ?, 'new', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(dedupe_key) DO UPDATE SET
                    severity = excluded.severity,
                    current_value = excluded.current_value,
                    previous_value = excluded.previous_value,
                    delta_abs = excluded.delta_abs,
                    delta_pct = excluded.delta_pct,
                    confidence = excluded.confidence,
                    evidence = excluded.evidence,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&signal.tenant_id)
            .bind(signal.source)
            .bind(signal.signal_type.to_string())
            .bind(signal.severity.to_string())
            .bind(signal.geo_type)
            .bind(&signal.geo_id)
            .bind(&signal.geo_name)
            .bind(signal.segment)
            .bind(signal.metric)
            .bind(signal.timeframe)
            .bind(signal.current_value)
            .bind(signal.previous_value)
            .bind(signal.delta_abs)
            .bind(signal.delta_pct)
            .bind(signal.confidence)
            .bind(evidence)
            .bind(&signal.dedupe_key)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Diagnostic: signal rows currently stored for the tenant.
    pub async fn stored_signal_count(&self, tenant_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signals WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SignalRow;
    use crate::types::{CandidateSignal, Evidence, Severity, SignalType};

    // One connection only: every pooled connection to sqlite::memory:
    // would otherwise open its own empty database.
    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn candidate(area: &str, current: f64, severity: Severity) -> CandidateSignal {
        CandidateSignal::qoq(
            "acme",
            SignalType::PriceChange,
            severity,
            area,
            "median_price",
            current,
            1_000_000.0,
            0.9,
            Evidence::PriceChange {
                prev_quarter: "2024-Q1".to_string(),
                curr_quarter: "2024-Q2".to_string(),
                prev_median: 1_000_000.0,
                curr_median: current,
                prev_sample: 60,
                curr_sample: 55,
            },
            "2024-06-30".parse().unwrap(),
        )
    }

    async fn fetch_all_rows(pool: &SqlitePool) -> Vec<SignalRow> {
        sqlx::query_as("SELECT * FROM signals ORDER BY dedupe_key")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rerun_over_unchanged_data_is_a_noop_update() {
        let pool = test_pool().await;
        let writer = SignalWriter::new(pool.clone());
        let signals = vec![
            candidate("Marina", 1_080_000.0, Severity::Watch),
            candidate("Downtown", 1_120_000.0, Severity::Urgent),
        ];

        let first = writer.write_all(&signals).await;
        assert_eq!(first.upserted, 2);
        assert_eq!(first.failed, 0);
        let rows_first = fetch_all_rows(&pool).await;

        let second = writer.write_all(&signals).await;
        assert_eq!(second.upserted, 2);
        let rows_second = fetch_all_rows(&pool).await;

        assert_eq!(rows_second.len(), rows_first.len());
        for (a, b) in rows_first.iter().zip(&rows_second) {
            assert_eq!(a.dedupe_key, b.dedupe_key);
            assert_eq!(a.severity, b.severity);
            assert_eq!(a.current_value, b.current_value);
            assert_eq!(a.evidence, b.evidence);
            assert_eq!(a.created_at, b.created_at);
        }
    }

    #[tokio::test]
    async fn conflicting_rerun_updates_in_place() {
        let pool = test_pool().await;
        let writer = SignalWriter::new(pool.clone());

        writer
            .write_all(&[candidate("Marina", 1_080_000.0, Severity::Watch)])
            .await;
        writer
            .write_all(&[candidate("Marina", 1_150_000.0, Severity::Urgent)])
            .await;

        let rows = fetch_all_rows(&pool).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, "urgent");
        assert_eq!(rows[0].current_value, 1_150_000.0);
        assert_eq!(rows[0].status, "new");
    }

    #[tokio::test]
    async fn row_carries_schema_fields_and_tagged_evidence() {
        let pool = test_pool().await;
        let writer = SignalWriter::new(pool.clone());
        writer
            .write_all(&[candidate("Marina", 1_080_000.0, Severity::Watch)])
            .await;

        let rows = fetch_all_rows(&pool).await;
        let row = &rows[0];
        assert_eq!(row.tenant_id, "acme");
        assert_eq!(row.source, "official");
        assert_eq!(row.signal_type, "price_change");
        assert_eq!(row.geo_type, "area");
        assert_eq!(row.geo_id, "Marina");
        assert_eq!(row.segment, "residential");
        assert_eq!(row.timeframe, "QoQ");
        assert_eq!(row.previous_value, Some(1_000_000.0));
        assert!((row.delta_pct.unwrap() - 0.08).abs() < 1e-12);
        assert!(row.evidence.contains(r#""kind":"price_change""#));
        assert_eq!(
            writer.stored_signal_count("acme").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn large_runs_split_into_batches() {
        let pool = test_pool().await;
        let writer = SignalWriter::new(pool.clone());
        let signals: Vec<CandidateSignal> = (0..WRITE_BATCH_SIZE + 30)
            .map(|i| candidate(&format!("Area {i}"), 1_080_000.0, Severity::Watch))
            .collect();

        let report = writer.write_all(&signals).await;
        assert_eq!(report.batches, 2);
        assert_eq!(report.failed_batches, 0);
        assert_eq!(report.upserted, WRITE_BATCH_SIZE + 30);
        assert_eq!(
            writer.stored_signal_count("acme").await.unwrap() as usize,
            WRITE_BATCH_SIZE + 30
        );
    }
}
