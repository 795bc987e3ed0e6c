use std::collections::{BTreeMap, HashMap};

use crate::types::{BucketStats, QuarterKey, Transaction};

/// Raw figures accumulated for one (area, quarter) pair before finalize.
#[derive(Debug, Default)]
struct BucketAccum {
    prices: Vec<f64>,
    unit_prices: Vec<f64>,
    total_value: f64,
}

/// Finalized area → chronological bucket series. Built once per run and
/// shared read-only by the detectors.
#[derive(Debug, Default)]
pub struct AggregateIndex {
    /// Area name → buckets sorted by quarter, ascending.
    pub by_area: BTreeMap<String, Vec<BucketStats>>,
    /// Most recent quarter present anywhere in the dataset.
    pub latest_quarter: Option<QuarterKey>,
}

impl AggregateIndex {
    pub fn area_count(&self) -> usize {
        self.by_area.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.by_area.values().map(Vec::len).sum()
    }
}

/// Route every transaction into its (area, quarter) bucket and finalize
/// per-bucket statistics. A bucket exists iff at least one transaction
/// landed in it.
pub fn build_index(transactions: &[Transaction]) -> AggregateIndex {
    let mut accums: HashMap<(String, QuarterKey), BucketAccum> = HashMap::new();

    for txn in transactions {
        let quarter = QuarterKey::from_date(txn.date);
        let accum = accums.entry((txn.area.clone(), quarter)).or_default();
        accum.prices.push(txn.price);
        accum.total_value += txn.price;
        if let Some(unit) = txn.price_per_sqm {
            if unit > 0.0 {
                accum.unit_prices.push(unit);
            }
        }
    }

    let mut index = AggregateIndex::default();
    for ((area, quarter), accum) in accums {
        index.latest_quarter = Some(match index.latest_quarter {
            Some(latest) => latest.max(quarter),
            None => quarter,
        });
        let stats = finalize(area.clone(), quarter, accum);
        index.by_area.entry(area).or_default().push(stats);
    }
    for series in index.by_area.values_mut() {
        series.sort_by_key(|bucket| bucket.quarter);
    }

    index
}

fn finalize(area: String, quarter: QuarterKey, accum: BucketAccum) -> BucketStats {
    let mut prices = accum.prices;
    BucketStats {
        area,
        quarter,
        txn_count: prices.len(),
        total_value: accum.total_value,
        median_price: median(&mut prices),
        avg_price_per_sqm: mean(&accum.unit_prices),
    }
}

/// Standard median over a non-empty slice: exact middle for odd lengths,
/// mean of the two middle values for even. Sorts in place.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// None for an empty slice — "no data" stays distinct from zero.
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
