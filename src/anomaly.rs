//! # Anomaly Detector
//! Online statistics per `source::metric` key: Welford running
//! mean/variance plus an EWMA of the series. Two independent rules fire on
//! each observation past the first — a z-score spike and a relative EWMA
//! jump — and may co-occur in one anomaly record.
//!
//! The very first sample for a key never raises (bootstrap exemption):
//! there is no distribution to deviate from yet.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::{Anomaly, RawDatum, Severity};
use crate::store::DatumStore;

/// Guards the EWMA relative-jump division when the average sits at zero.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct AnomalyConfig {
    /// EWMA decay factor.
    pub alpha: f64,
    /// Z-score threshold for the spike rule.
    pub z_threshold: f64,
    /// Relative EWMA deviation (fraction) for the jump rule.
    pub ewma_jump: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            z_threshold: 4.0,
            ewma_jump: 0.2,
        }
    }
}

/// Welford-form running statistics for one `source::metric` key.
#[derive(Debug, Clone, Copy)]
struct RunningStats {
    mean: f64,
    /// Sum of squared deviations from the mean.
    m2: f64,
    n: u64,
    ewma: f64,
}

impl RunningStats {
    fn first(value: f64) -> Self {
        Self {
            mean: value,
            m2: 0.0,
            n: 1,
            ewma: value,
        }
    }

    /// Sample variance; 0 until there are two observations.
    fn variance(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }
}

pub struct AnomalyDetector {
    store: Arc<DatumStore>,
    cfg: AnomalyConfig,
    stats: Mutex<HashMap<String, RunningStats>>,
}

impl AnomalyDetector {
    pub fn new(store: Arc<DatumStore>, cfg: AnomalyConfig) -> Self {
        Self {
            store,
            cfg,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Feed one datum through `extract`. A `None` extraction or a
    /// non-finite value is a no-op. Returns the recorded anomaly, if one
    /// fired.
    pub fn ingest<F>(&self, datum: &RawDatum, extract: F) -> Option<Anomaly>
    where
        F: Fn(&RawDatum) -> Option<(String, f64)>,
    {
        let (metric, value) = extract(datum)?;
        if !value.is_finite() {
            return None;
        }
        self.ingest_numeric(&datum.source, &metric, value)
    }

    /// Update the running stats for `(source, metric)` and evaluate both
    /// rules against `value`.
    pub fn ingest_numeric(&self, source: &str, metric: &str, value: f64) -> Option<Anomaly> {
        let key = format!("{source}::{metric}");
        let stats = {
            let mut map = self.stats.lock().expect("anomaly stats mutex poisoned");
            match map.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(RunningStats::first(value));
                    return None; // bootstrap exemption
                }
                Entry::Occupied(mut e) => {
                    let s = e.get_mut();
                    // Welford update.
                    s.n += 1;
                    let delta = value - s.mean;
                    s.mean += delta / s.n as f64;
                    s.m2 += delta * (value - s.mean);
                    s.ewma = s.ewma * (1.0 - self.cfg.alpha) + value * self.cfg.alpha;
                    *s
                }
            }
        };

        let std = stats.variance().sqrt();
        let z = if std > 0.0 {
            (value - stats.mean).abs() / std
        } else {
            0.0
        };
        let jump = (value - stats.ewma).abs() / (stats.ewma.abs() + EPSILON);

        let mut reasons = Vec::new();
        let mut severity = Severity::Medium;
        if z > self.cfg.z_threshold {
            reasons.push(format!(
                "z-score {:.2} exceeds threshold {}",
                z, self.cfg.z_threshold
            ));
            severity = Severity::High; // z-score takes severity precedence
        }
        if jump > self.cfg.ewma_jump {
            reasons.push(format!("value deviates {:.1}% from EWMA", jump * 100.0));
        }
        if reasons.is_empty() {
            return None;
        }

        let anomaly = Anomaly::new(source, metric, value, reasons.join("; "), severity);
        self.store.record_anomaly(anomaly.clone());
        Some(anomaly)
    }

    #[cfg(test)]
    fn stats_for(&self, source: &str, metric: &str) -> Option<(f64, f64, u64, f64)> {
        let map = self.stats.lock().expect("anomaly stats mutex poisoned");
        map.get(&format!("{source}::{metric}"))
            .map(|s| (s.mean, s.variance(), s.n, s.ewma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(Arc::new(DatumStore::new()), AnomalyConfig::default())
    }

    #[test]
    fn first_sample_never_fires() {
        let d = detector();
        assert!(d.ingest_numeric("binance", "price", 1_000_000.0).is_none());
        assert_eq!(d.store.anomaly_count(), 0);
    }

    #[test]
    fn constant_series_keeps_std_zero_and_never_z_fires() {
        let d = detector();
        for _ in 0..100 {
            let fired = d.ingest_numeric("binance", "price", 42.0);
            assert!(fired.is_none());
        }
        let (mean, var, n, ewma) = d.stats_for("binance", "price").unwrap();
        assert_eq!(mean, 42.0);
        assert_eq!(var, 0.0);
        assert_eq!(n, 100);
        assert_eq!(ewma, 42.0);
    }

    #[test]
    fn welford_mean_and_sample_variance() {
        let d = detector();
        for v in [10.0, 20.0, 30.0] {
            d.ingest_numeric("binance", "price", v);
        }
        let (mean, var, n, _) = d.stats_for("binance", "price").unwrap();
        assert_eq!(n, 3);
        assert!((mean - 20.0).abs() < 1e-12);
        assert!((var - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ewma_jump_fires_medium() {
        let d = detector();
        d.ingest_numeric("binance", "price", 100.0);
        // 130 vs EWMA pre-update 100: post-update ewma = 109, jump ≈ 19.3%
        // -> below threshold; 150 pushes well past 20%.
        let fired = d.ingest_numeric("binance", "price", 150.0).unwrap();
        assert_eq!(fired.severity, Severity::Medium);
        assert!(fired.reason.contains("EWMA"));
        assert_eq!(d.store.score_for("binance").unwrap().anomaly_count, 1);
    }

    #[test]
    fn z_spike_takes_severity_precedence() {
        let d = detector();
        // Flat baseline long enough that a spike clears z > 4 even after
        // the spike itself inflates the updated std (z tops out near √n).
        for _ in 0..25 {
            d.ingest_numeric("kraken", "price", 100.0);
        }
        let fired = d.ingest_numeric("kraken", "price", 500.0).unwrap();
        assert_eq!(fired.severity, Severity::High);
        assert!(fired.reason.contains("z-score"));
        assert!(fired.reason.contains("; "));
    }

    #[test]
    fn non_finite_extraction_is_a_no_op() {
        let d = detector();
        let datum = RawDatum {
            id: None,
            source: "binance".into(),
            timestamp: "2026-08-26T12:00:00Z".into(),
            payload: serde_json::json!({}),
            lineage: None,
        };
        let fired = d.ingest(&datum, |_| Some(("price".into(), f64::NAN)));
        assert!(fired.is_none());
        assert!(d.stats_for("binance", "price").is_none());
    }
}
