//! Environment-driven tunables with sensible defaults. `.env` loading is
//! the binary's job (dotenvy); the library only reads what is already set.

use std::str::FromStr;

use crate::anomaly::AnomalyConfig;
use crate::outlier::OutlierConfig;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub freshness_secs: u64,
    pub reliability_secs: u64,
    pub report_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            freshness_secs: 60,
            reliability_secs: 300,
            report_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub anomaly: AnomalyConfig,
    pub outlier: OutlierConfig,
    /// Sources quieter than this are stale (minutes).
    pub freshness_threshold_min: f64,
    /// Expected per-key cadence (seconds); a gap is > 2x this.
    pub expected_interval_secs: f64,
    pub scheduler: SchedulerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyConfig::default(),
            outlier: OutlierConfig::default(),
            freshness_threshold_min: 15.0,
            expected_interval_secs: 30.0,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            anomaly: AnomalyConfig {
                alpha: env_parse("EWMA_ALPHA", d.anomaly.alpha),
                z_threshold: env_parse("Z_THRESHOLD", d.anomaly.z_threshold),
                ewma_jump: env_parse("EWMA_JUMP", d.anomaly.ewma_jump),
            },
            outlier: OutlierConfig {
                capacity: env_parse("OUTLIER_WINDOW", d.outlier.capacity),
                multiplier: env_parse("OUTLIER_IQR_MULT", d.outlier.multiplier),
            },
            freshness_threshold_min: env_parse(
                "FRESHNESS_THRESHOLD_MIN",
                d.freshness_threshold_min,
            ),
            expected_interval_secs: env_parse("EXPECTED_INTERVAL_SECS", d.expected_interval_secs),
            scheduler: SchedulerConfig {
                freshness_secs: env_parse("FRESHNESS_CHECK_SECS", d.scheduler.freshness_secs),
                reliability_secs: env_parse("RELIABILITY_CHECK_SECS", d.scheduler.reliability_secs),
                report_secs: env_parse("REPORT_INTERVAL_SECS", d.scheduler.report_secs),
            },
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
