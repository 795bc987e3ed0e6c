use crate::aggregate::AggregateIndex;
use crate::config::Thresholds;
use crate::detector::severity;
use crate::types::{CandidateSignal, Evidence, SignalType};

/// Metric name recorded on price-change signals.
pub const METRIC: &str = "median_price";

/// Confidence when both quarters clear the high-confidence sample size.
const CONFIDENCE_HIGH: f64 = 0.9;
const CONFIDENCE_BASE: f64 = 0.7;

/// Walk each area's quarters chronologically and compare consecutive
/// medians. One candidate per qualifying jump — consecutive pairs, not a
/// trend line. Pairs below the sample floor or with an empty previous
/// median are statistical guards, not errors.
pub fn detect(index: &AggregateIndex, th: &Thresholds, tenant_id: &str) -> Vec<CandidateSignal> {
    let mut signals = Vec::new();

    for (area, series) in &index.by_area {
        for pair in series.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if prev.txn_count < th.min_sample_size || curr.txn_count < th.min_sample_size {
                continue;
            }
            if prev.median_price <= 0.0 {
                continue;
            }

            let delta_pct = (curr.median_price - prev.median_price) / prev.median_price;
            if delta_pct.abs() < th.price_delta_min {
                continue;
            }

            let confidence = if prev.txn_count >= th.high_confidence_sample
                && curr.txn_count >= th.high_confidence_sample
            {
                CONFIDENCE_HIGH
            } else {
                CONFIDENCE_BASE
            };

            signals.push(CandidateSignal::qoq(
                tenant_id,
                SignalType::PriceChange,
                severity::for_delta(delta_pct),
                area,
                METRIC,
                curr.median_price,
                prev.median_price,
                confidence,
                Evidence::PriceChange {
                    prev_quarter: prev.quarter.label(),
                    curr_quarter: curr.quarter.label(),
                    prev_median: prev.median_price,
                    curr_median: curr.median_price,
                    prev_sample: prev.txn_count,
                    curr_sample: curr.txn_count,
                },
                curr.quarter.end(),
            ));
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_index;
    use crate::types::{Severity, Transaction};
    use chrono::NaiveDate;

    fn txns(area: &str, date: &str, price: f64, count: usize) -> Vec<Transaction> {
        let date: NaiveDate = date.parse().unwrap();
        (0..count)
            .map(|_| Transaction {
                date,
                area: area.to_string(),
                price,
                price_per_sqm: None,
            })
            .collect()
    }

    fn detect_with(data: &[Transaction]) -> Vec<CandidateSignal> {
        detect(&build_index(data), &Thresholds::default(), "acme")
    }

    #[test]
    fn marina_eight_percent_jump_emits_one_watch_signal() {
        let mut data = txns("Marina", "2024-02-15", 1_000_000.0, 60);
        data.extend(txns("Marina", "2024-05-15", 1_080_000.0, 55));

        let signals = detect_with(&data);
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.geo_id, "Marina");
        assert_eq!(s.severity, Severity::Watch);
        assert_eq!(s.confidence, 0.9);
        assert!((s.delta_pct.unwrap() - 0.08).abs() < 1e-12);
        assert_eq!(s.metric, "median_price");
    }

    #[test]
    fn five_percent_delta_is_inclusive() {
        let mut data = txns("Marina", "2024-02-15", 10_000.0, 10);
        data.extend(txns("Marina", "2024-05-15", 10_500.0, 10));
        assert_eq!(detect_with(&data).len(), 1);

        let mut data = txns("Marina", "2024-02-15", 10_000.0, 10);
        data.extend(txns("Marina", "2024-05-15", 10_499.0, 10));
        assert!(detect_with(&data).is_empty());
    }

    #[test]
    fn small_samples_never_trigger() {
        let mut data = txns("Marina", "2024-02-15", 10_000.0, 4);
        data.extend(txns("Marina", "2024-05-15", 20_000.0, 40));
        assert!(detect_with(&data).is_empty());

        let mut data = txns("Marina", "2024-02-15", 10_000.0, 40);
        data.extend(txns("Marina", "2024-05-15", 20_000.0, 4));
        assert!(detect_with(&data).is_empty());
    }

    #[test]
    fn confidence_drops_below_high_confidence_sample() {
        let mut data = txns("Marina", "2024-02-15", 10_000.0, 49);
        data.extend(txns("Marina", "2024-05-15", 11_000.0, 60));
        let signals = detect_with(&data);
        assert_eq!(signals[0].confidence, 0.7);
    }

    #[test]
    fn one_signal_per_consecutive_jump() {
        let mut data = txns("Marina", "2023-11-15", 10_000.0, 10);
        data.extend(txns("Marina", "2024-02-15", 11_000.0, 10));
        data.extend(txns("Marina", "2024-05-15", 12_100.0, 10));

        let signals = detect_with(&data);
        assert_eq!(signals.len(), 2);
        assert_ne!(signals[0].dedupe_key, signals[1].dedupe_key);
    }

    #[test]
    fn single_quarter_history_is_insufficient() {
        let data = txns("Marina", "2024-05-15", 1_000_000.0, 250);
        assert!(detect_with(&data).is_empty());
    }

    #[test]
    fn falling_median_triggers_on_magnitude() {
        let mut data = txns("Marina", "2024-02-15", 10_000.0, 10);
        data.extend(txns("Marina", "2024-05-15", 8_500.0, 10));
        let signals = detect_with(&data);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].severity, Severity::Urgent);
        assert!(signals[0].delta_pct.unwrap() < 0.0);
    }
}
