use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::keys;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// One qualifying sale transaction, as loaded from the import job's table.
/// Read-only to this pipeline.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub date: NaiveDate,
    pub area: String,
    pub price: f64,
    /// Price per square metre. None or non-positive means "not recorded".
    pub price_per_sqm: Option<f64>,
}

// ---------------------------------------------------------------------------
// Quarter key
// ---------------------------------------------------------------------------

/// Calendar-quarter grouping key. Derives `Ord` on (year, quarter) so
/// bucket series sort chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuarterKey {
    pub year: i32,
    /// 1..=4
    pub quarter: u32,
}

impl QuarterKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: date.month0() / 3 + 1,
        }
    }

    /// First day of the quarter.
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1)
            .expect("quarter in 1..=4 starts on a valid date")
    }

    /// Last day of the quarter — day zero of the following month, so
    /// variable month lengths come out right.
    pub fn end(&self) -> NaiveDate {
        let (next_year, next_month) = if self.quarter == 4 {
            (self.year + 1, 1)
        } else {
            (self.year, self.quarter * 3 + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first_of_next| first_of_next.pred_opt())
            .expect("quarter in 1..=4 ends on a valid date")
    }

    pub fn label(&self) -> String {
        format!("{}-Q{}", self.year, self.quarter)
    }
}

// ---------------------------------------------------------------------------
// Bucket statistics
// ---------------------------------------------------------------------------

/// Finalized statistics for one (area, quarter) bucket. A bucket exists
/// iff at least one qualifying transaction fell into it; the window's
/// start/end dates come from the quarter key.
#[derive(Debug, Clone)]
pub struct BucketStats {
    pub area: String,
    pub quarter: QuarterKey,
    pub txn_count: usize,
    pub total_value: f64,
    pub median_price: f64,
    /// Mean over the transactions with a positive per-sqm price. None when
    /// the bucket has no such transactions — "no data", never zero.
    pub avg_price_per_sqm: Option<f64>,
}

impl BucketStats {
    pub fn avg_price(&self) -> f64 {
        self.total_value / self.txn_count as f64
    }
}

// ---------------------------------------------------------------------------
// Signal classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Quarter-over-quarter move in an area's median sale price.
    PriceChange,
    /// Sustained high transaction volume in the latest quarter.
    YieldOpportunity,
    /// Sharp quarter-over-quarter growth in transaction count.
    SupplySpike,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::PriceChange => "price_change",
            SignalType::YieldOpportunity => "yield_opportunity",
            SignalType::SupplySpike => "supply_spike",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Watch,
    Urgent,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Watch => "watch",
            Severity::Urgent => "urgent",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// Supporting figures persisted with each signal, tagged by kind so
/// consumers get a stable shape per signal type instead of an open map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    PriceChange {
        prev_quarter: String,
        curr_quarter: String,
        prev_median: f64,
        curr_median: f64,
        prev_sample: usize,
        curr_sample: usize,
    },
    TransactionVolume {
        quarter: String,
        txn_count: usize,
        total_value: f64,
        avg_price: f64,
        avg_price_per_sqm: Option<f64>,
    },
    SupplySpike {
        prev_quarter: String,
        curr_quarter: String,
        prev_count: usize,
        curr_count: usize,
        growth_pct: f64,
    },
}

// ---------------------------------------------------------------------------
// Candidate signal
// ---------------------------------------------------------------------------

/// A detected signal prior to persistence. The dedupe key is its identity:
/// re-running over unchanged data regenerates the same key and the writer
/// updates in place.
#[derive(Debug, Clone)]
pub struct CandidateSignal {
    pub tenant_id: String,
    pub source: &'static str,
    pub signal_type: SignalType,
    pub severity: Severity,
    pub geo_type: &'static str,
    pub geo_id: String,
    pub geo_name: String,
    pub segment: &'static str,
    pub metric: &'static str,
    pub timeframe: &'static str,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub delta_abs: Option<f64>,
    pub delta_pct: Option<f64>,
    pub confidence: f64,
    pub evidence: Evidence,
    pub dedupe_key: String,
}

impl CandidateSignal {
    /// Quarter-over-quarter comparison signal. Always carries both sides
    /// of the comparison and the relative delta. `previous` must be
    /// non-zero — detectors guard for that before comparing.
    #[allow(clippy::too_many_arguments)]
    pub fn qoq(
        tenant_id: &str,
        signal_type: SignalType,
        severity: Severity,
        area: &str,
        metric: &'static str,
        current: f64,
        previous: f64,
        confidence: f64,
        evidence: Evidence,
        anchor: NaiveDate,
    ) -> Self {
        let delta_abs = current - previous;
        Self {
            tenant_id: tenant_id.to_string(),
            source: crate::config::SIGNAL_SOURCE,
            signal_type,
            severity,
            geo_type: crate::config::GEO_TYPE_AREA,
            geo_id: area.to_string(),
            geo_name: area.to_string(),
            segment: crate::config::SIGNAL_SEGMENT,
            metric,
            timeframe: crate::config::TIMEFRAME_QOQ,
            current_value: current,
            previous_value: Some(previous),
            delta_abs: Some(delta_abs),
            delta_pct: Some(delta_abs / previous),
            confidence,
            evidence,
            dedupe_key: keys::signal_key(signal_type, area, anchor),
        }
    }

    /// Single-quarter snapshot signal — a current value with no prior
    /// quarter to compare against.
    #[allow(clippy::too_many_arguments)]
    pub fn snapshot(
        tenant_id: &str,
        signal_type: SignalType,
        severity: Severity,
        area: &str,
        metric: &'static str,
        current: f64,
        confidence: f64,
        evidence: Evidence,
        anchor: NaiveDate,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            source: crate::config::SIGNAL_SOURCE,
            signal_type,
            severity,
            geo_type: crate::config::GEO_TYPE_AREA,
            geo_id: area.to_string(),
            geo_name: area.to_string(),
            segment: crate::config::SIGNAL_SEGMENT,
            metric,
            timeframe: crate::config::TIMEFRAME_QOQ,
            current_value: current,
            previous_value: None,
            delta_abs: None,
            delta_pct: None,
            confidence,
            evidence,
            dedupe_key: keys::signal_key(signal_type, area, anchor),
        }
    }
}
