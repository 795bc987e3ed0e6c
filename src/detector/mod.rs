pub mod hot_area;
pub mod price_change;
pub mod severity;
pub mod supply_spike;

use std::sync::Arc;

use tracing::{info, warn};

use crate::aggregate::AggregateIndex;
use crate::config::Thresholds;
use crate::types::CandidateSignal;

/// Run the three detectors concurrently over the shared index and merge
/// their candidates. Each detector is a pure function of the index, so
/// the only coordination needed is the final join.
pub async fn run_all(
    index: Arc<AggregateIndex>,
    thresholds: Thresholds,
    tenant_id: String,
) -> Vec<CandidateSignal> {
    let spawn = |f: fn(&AggregateIndex, &Thresholds, &str) -> Vec<CandidateSignal>| {
        let index = Arc::clone(&index);
        let thresholds = thresholds.clone();
        let tenant_id = tenant_id.clone();
        tokio::spawn(async move { f(&index, &thresholds, &tenant_id) })
    };

    let handles = [
        ("price_change", spawn(price_change::detect)),
        ("hot_area", spawn(hot_area::detect)),
        ("supply_spike", spawn(supply_spike::detect)),
    ];

    let mut signals = Vec::new();
    for (name, handle) in handles {
        match handle.await {
            Ok(mut batch) => {
                info!(detector = name, count = batch.len(), "detector finished");
                signals.append(&mut batch);
            }
            Err(e) => warn!(detector = name, "detector task failed: {e}"),
        }
    }

    signals
}
