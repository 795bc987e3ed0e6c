use crate::aggregate::AggregateIndex;
use crate::config::Thresholds;
use crate::types::{CandidateSignal, Evidence, Severity, SignalType};

/// Metric name recorded on hot-area signals.
pub const METRIC: &str = "transaction_volume";

const CONFIDENCE: f64 = 0.85;

/// Flag areas whose latest-quarter volume clears the hot threshold. Only
/// the single most recent quarter in the dataset is evaluated; evidence
/// carries the quarter's totals so consumers never re-query.
pub fn detect(index: &AggregateIndex, th: &Thresholds, tenant_id: &str) -> Vec<CandidateSignal> {
    let Some(latest) = index.latest_quarter else {
        return Vec::new();
    };

    let mut signals = Vec::new();
    for (area, series) in &index.by_area {
        // Series are sorted, so the latest quarter can only be the tail.
        let Some(bucket) = series.last().filter(|b| b.quarter == latest) else {
            continue;
        };
        if bucket.txn_count < th.hot_area_min_count {
            continue;
        }

        let severity = if bucket.txn_count >= th.hot_area_urgent_count {
            Severity::Urgent
        } else {
            Severity::Watch
        };

        signals.push(CandidateSignal::snapshot(
            tenant_id,
            SignalType::YieldOpportunity,
            severity,
            area,
            METRIC,
            bucket.txn_count as f64,
            CONFIDENCE,
            Evidence::TransactionVolume {
                quarter: bucket.quarter.label(),
                txn_count: bucket.txn_count,
                total_value: bucket.total_value,
                avg_price: bucket.avg_price(),
                avg_price_per_sqm: bucket.avg_price_per_sqm,
            },
            bucket.quarter.end(),
        ));
    }

    signals
}
