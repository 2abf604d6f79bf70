//! # Outlier Detector
//! Sliding-window IQR outlier flagging per `source::metric` key.
//!
//! Deliberately a pure predicate: unlike the anomaly detector it never
//! writes to the store — outliers are a lower-confidence signal left for
//! the caller to act on.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::model::RawDatum;

/// Detection is suppressed until a window holds this many samples.
const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct OutlierConfig {
    /// Sliding-window capacity per key (FIFO eviction past this).
    pub capacity: usize,
    /// IQR multiplier for the fence.
    pub multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            multiplier: 1.5,
        }
    }
}

#[derive(Debug)]
pub struct OutlierDetector {
    cfg: OutlierConfig,
    windows: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl OutlierDetector {
    pub fn new(cfg: OutlierConfig) -> Self {
        Self {
            cfg,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Convenience wrapper around extraction; `None` or non-finite values
    /// are not outliers.
    pub fn ingest<F>(&self, datum: &RawDatum, extract: F) -> bool
    where
        F: Fn(&RawDatum) -> Option<(String, f64)>,
    {
        match extract(datum) {
            Some((metric, value)) if value.is_finite() => {
                self.ingest_numeric(&datum.source, &metric, value)
            }
            _ => false,
        }
    }

    /// Append `value` to the window for `(source, metric)` and report
    /// whether it falls strictly outside the IQR fence.
    pub fn ingest_numeric(&self, source: &str, metric: &str, value: f64) -> bool {
        let key = format!("{source}::{metric}");
        let mut windows = self.windows.lock().expect("outlier windows mutex poisoned");
        let window = windows.entry(key).or_default();

        window.push_back(value);
        while window.len() > self.cfg.capacity {
            window.pop_front();
        }
        if window.len() < MIN_SAMPLES {
            return false; // not enough data to call anything an outlier
        }

        let mut sorted: Vec<f64> = window.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let q1 = sorted[(sorted.len() as f64 * 0.25).floor() as usize];
        let q3 = sorted[(sorted.len() as f64 * 0.75).floor() as usize];
        let iqr = q3 - q1;
        let lower = q1 - self.cfg.multiplier * iqr;
        let upper = q3 + self.cfg.multiplier * iqr;

        value < lower || value > upper
    }
}
