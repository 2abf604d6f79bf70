//! # Reliability Scorer
//! Folds per-source stale/anomaly/completeness counters into one bounded
//! 0–100 score. Each recompute is a full overwrite of every source record,
//! executed under a single store lock so it cannot interleave with
//! ingest-path increments.

use std::sync::Arc;

use crate::model::SourceScore;
use crate::store::DatumStore;

const STALE_WEIGHT: f64 = 2.0;
const ANOMALY_WEIGHT: f64 = 3.0;
const COMPLETENESS_WEIGHT: f64 = 0.1;

pub struct ReliabilityScorer {
    store: Arc<DatumStore>,
}

impl ReliabilityScorer {
    pub fn new(store: Arc<DatumStore>) -> Self {
        Self { store }
    }

    /// Recompute and overwrite the score of every known source; returns
    /// the updated records.
    pub fn recompute_all(&self) -> Vec<SourceScore> {
        self.store.update_scores(|s| s.score = compute_score(s))
    }
}

/// `100 - (stale*2 + anomaly*3 + max(0, 50-completeness)*0.1)`, rounded and
/// clamped to 0–100.
fn compute_score(s: &SourceScore) -> i64 {
    let completeness_gap = (50.0 - s.completeness_score).max(0.0);
    let reduction = s.stale_count as f64 * STALE_WEIGHT
        + s.anomaly_count as f64 * ANOMALY_WEIGHT
        + completeness_gap * COMPLETENESS_WEIGHT;
    (100.0 - reduction).round().clamp(0.0, 100.0) as i64
}
