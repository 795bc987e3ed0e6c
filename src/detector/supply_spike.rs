use crate::aggregate::AggregateIndex;
use crate::config::Thresholds;
use crate::types::{CandidateSignal, Evidence, Severity, SignalType};

/// Metric name recorded on supply-spike signals.
pub const METRIC: &str = "transaction_count";

const CONFIDENCE: f64 = 0.8;

/// Same consecutive-quarter walk as the price detector, but on raw
/// transaction counts. The previous quarter must clear the baseline floor
/// before growth means anything.
pub fn detect(index: &AggregateIndex, th: &Thresholds, tenant_id: &str) -> Vec<CandidateSignal> {
    let mut signals = Vec::new();

    for (area, series) in &index.by_area {
        for pair in series.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if prev.txn_count < th.spike_baseline_min {
                continue;
            }

            let growth = (curr.txn_count as f64 - prev.txn_count as f64) / prev.txn_count as f64;
            if growth < th.spike_growth_min {
                continue;
            }

            let severity = if growth >= th.spike_urgent_growth {
                Severity::Urgent
            } else {
                Severity::Watch
            };

            signals.push(CandidateSignal::qoq(
                tenant_id,
                SignalType::SupplySpike,
                severity,
                area,
                METRIC,
                curr.txn_count as f64,
                prev.txn_count as f64,
                CONFIDENCE,
                Evidence::SupplySpike {
                    prev_quarter: prev.quarter.label(),
                    curr_quarter: curr.quarter.label(),
                    prev_count: prev.txn_count,
                    curr_count: curr.txn_count,
                    growth_pct: growth,
                },
                curr.quarter.end(),
            ));
        }
    }

    signals
}
