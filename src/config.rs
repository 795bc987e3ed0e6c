use crate::error::{AppError, Result};

/// Rows fetched per page from the transactions table. The loader pages
/// until a short page comes back — stopping earlier silently truncates
/// the signal set.
pub const LOAD_PAGE_SIZE: i64 = 1000;

/// Signals upserted per write batch. Each batch is its own SQLite
/// transaction; a failed batch is skipped, never fatal.
pub const WRITE_BATCH_SIZE: usize = 100;

/// Provenance tag stamped on every signal row.
pub const SIGNAL_SOURCE: &str = "official";

/// Source family recorded in the composite key alongside the provenance tag.
pub const SIGNAL_SOURCE_TYPE: &str = "market";

/// Geographic scope type for all signals in this pipeline.
pub const GEO_TYPE_AREA: &str = "area";

/// Market segment covered by this pipeline.
pub const SIGNAL_SEGMENT: &str = "residential";

/// Timeframe label for quarter-over-quarter comparisons.
pub const TIMEFRAME_QOQ: &str = "QoQ";

/// Shared severity cut points for relative-delta metrics.
/// The volume detectors carry their own absolute cut points in
/// `Thresholds` — their metric is a count, not a relative change.
pub mod severity_thresholds {
    pub const URGENT_MIN: f64 = 0.12;
    pub const WATCH_MIN: f64 = 0.06;
}

/// Detector tunables, overridable per environment. Defaults match the
/// documented detection rules; every field has an env var of the same
/// name in SCREAMING_SNAKE_CASE prefixed with `SIGNAL_`.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Minimum transactions on both sides of a quarter pair before the
    /// price detector compares medians (SIGNAL_MIN_SAMPLE_SIZE).
    pub min_sample_size: usize,
    /// Relative median move (QoQ) that registers as a price change,
    /// inclusive (SIGNAL_PRICE_DELTA_MIN).
    pub price_delta_min: f64,
    /// Sample size on both sides at which price-change confidence steps
    /// up from 0.7 to 0.9 (SIGNAL_HIGH_CONFIDENCE_SAMPLE).
    pub high_confidence_sample: usize,
    /// Latest-quarter transaction count for an area to register as hot
    /// (SIGNAL_HOT_AREA_MIN_COUNT).
    pub hot_area_min_count: usize,
    /// Hot-area count at which severity escalates to urgent
    /// (SIGNAL_HOT_AREA_URGENT_COUNT).
    pub hot_area_urgent_count: usize,
    /// Previous-quarter count floor before supply growth is measured
    /// (SIGNAL_SPIKE_BASELINE_MIN).
    pub spike_baseline_min: usize,
    /// Relative count growth (QoQ) that registers as a supply spike,
    /// inclusive (SIGNAL_SPIKE_GROWTH_MIN).
    pub spike_growth_min: f64,
    /// Growth at which a supply spike escalates to urgent
    /// (SIGNAL_SPIKE_URGENT_GROWTH).
    pub spike_urgent_growth: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            price_delta_min: 0.05,
            high_confidence_sample: 50,
            hot_area_min_count: 30,
            hot_area_urgent_count: 200,
            spike_baseline_min: 10,
            spike_growth_min: 0.30,
            spike_urgent_growth: 0.50,
        }
    }
}

impl Thresholds {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            min_sample_size: env_parse("SIGNAL_MIN_SAMPLE_SIZE", d.min_sample_size)?,
            price_delta_min: env_parse("SIGNAL_PRICE_DELTA_MIN", d.price_delta_min)?,
            high_confidence_sample: env_parse(
                "SIGNAL_HIGH_CONFIDENCE_SAMPLE",
                d.high_confidence_sample,
            )?,
            hot_area_min_count: env_parse("SIGNAL_HOT_AREA_MIN_COUNT", d.hot_area_min_count)?,
            hot_area_urgent_count: env_parse(
                "SIGNAL_HOT_AREA_URGENT_COUNT",
                d.hot_area_urgent_count,
            )?,
            spike_baseline_min: env_parse("SIGNAL_SPIKE_BASELINE_MIN", d.spike_baseline_min)?,
            spike_growth_min: env_parse("SIGNAL_SPIKE_GROWTH_MIN", d.spike_growth_min)?,
            spike_urgent_growth: env_parse("SIGNAL_SPIKE_URGENT_GROWTH", d.spike_urgent_growth)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub log_level: String,
    /// Tenant to run for (TENANT_ID). When unset, the pipeline falls back
    /// to the first tenant present in the transactions table.
    pub tenant_override: Option<String>,
    pub thresholds: Thresholds,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "signals.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            tenant_override: std::env::var("TENANT_ID").ok().filter(|s| !s.is_empty()),
            thresholds: Thresholds::from_env()?,
        })
    }
}

/// Read a numeric env override, keeping the default when the variable is
/// unset. A set-but-unparseable value is a configuration error, not a
/// silent fallback.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be numeric, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
