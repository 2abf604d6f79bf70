//! # Freshness Monitor
//! Tracks the last-seen timestamp per source and, on each periodic check,
//! flags sources whose feed has gone quiet beyond the threshold.
//!
//! A source that stays stale is re-flagged on every check — there is no
//! suppression window. The anomaly log stays a faithful record; flood
//! control belongs to the alert egress (see `DESIGN.md`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::model::{parse_iso, Anomaly, RawDatum, Severity};
use crate::store::DatumStore;

pub struct FreshnessMonitor {
    store: Arc<DatumStore>,
    threshold_min: f64,
    last_seen: Mutex<HashMap<String, String>>,
}

impl FreshnessMonitor {
    pub fn new(store: Arc<DatumStore>, threshold_min: f64) -> Self {
        Self {
            store,
            threshold_min,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record the datum's own timestamp as last-seen for its source
    /// (overwrite, not append) and touch the source's score record.
    pub fn mark_received(&self, datum: &RawDatum) {
        self.lock()
            .insert(datum.source.clone(), datum.timestamp.clone());
        self.store.touch_source(&datum.source, &datum.timestamp);
    }

    /// Cached last-seen timestamp for `source`, if any.
    pub fn last_seen(&self, source: &str) -> Option<String> {
        self.lock().get(source).cloned()
    }

    /// Periodic scan over all known sources. Each stale source gets its
    /// stale counter bumped and one high-severity `freshness` anomaly
    /// appended. Returns the anomalies raised, for alert forwarding.
    pub fn check_freshness(&self) -> Vec<Anomaly> {
        self.check_freshness_at(Utc::now())
    }

    pub fn check_freshness_at(&self, now: DateTime<Utc>) -> Vec<Anomaly> {
        let snapshot: Vec<(String, String)> = self
            .lock()
            .iter()
            .map(|(s, t)| (s.clone(), t.clone()))
            .collect();

        let mut raised = Vec::new();
        for (source, ts) in snapshot {
            let Some(seen) = parse_iso(&ts) else {
                tracing::warn!(source, ts, "unparseable last-seen timestamp, skipping");
                continue;
            };
            let elapsed_min = (now - seen).num_seconds() as f64 / 60.0;
            if elapsed_min <= self.threshold_min {
                continue;
            }
            let anomaly = Anomaly::new(
                &source,
                "freshness",
                elapsed_min,
                format!(
                    "no data for {:.1} min (threshold {} min)",
                    elapsed_min, self.threshold_min
                ),
                Severity::High,
            );
            self.store.record_stale(anomaly.clone());
            raised.push(anomaly);
        }
        raised
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.last_seen.lock().expect("last-seen mutex poisoned")
    }
}
