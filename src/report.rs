//! # Report Service
//! Pure read-aggregation over the store; no side effects.

use std::sync::Arc;

use crate::model::{now_iso, Report, ReportSummary};
use crate::store::DatumStore;

const RECENT_ANOMALIES: usize = 50;
const TOP_SOURCES: usize = 10;

pub struct ReportService {
    store: Arc<DatumStore>,
}

impl ReportService {
    pub fn new(store: Arc<DatumStore>) -> Self {
        Self { store }
    }

    pub fn generate(&self) -> Report {
        let anomalies_recent = self.store.recent_anomalies(None, RECENT_ANOMALIES);
        let total_anomalies = self.store.anomaly_count();

        let mut sources = self.store.scores();
        sources.sort_by(|a, b| b.score.cmp(&a.score).then(a.source.cmp(&b.source)));

        let total_sources = sources.len();
        // 100 on an empty system: no sources is not the same as all
        // sources failing.
        let avg_score = if total_sources == 0 {
            100.0
        } else {
            sources.iter().map(|s| s.score as f64).sum::<f64>() / total_sources as f64
        };

        sources.truncate(TOP_SOURCES);

        Report {
            generated_at: now_iso(),
            total_anomalies,
            anomalies_recent,
            top_sources: sources,
            summary: ReportSummary {
                total_sources,
                avg_score,
            },
        }
    }
}
