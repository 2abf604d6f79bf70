//! # Completeness Monitor
//! Tracks the last-seen timestamp per (source, key) and answers pull-based
//! gap queries: a gap exists when nothing arrived for more than twice the
//! expected cadence. Unlike the freshness monitor this does not drive its
//! own periodic scan per key — callers decide when to ask.
//!
//! `sweep_at` is the one push-style hook: it folds currently-gapped keys
//! into each source's completeness score for the reliability formula.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::model::{parse_iso, GapReport, RawDatum};
use crate::store::DatumStore;

/// Score penalty per currently-gapped key during a sweep.
const GAP_PENALTY: f64 = 10.0;

pub struct CompletenessMonitor {
    store: Arc<DatumStore>,
    expected_interval_sec: f64,
    marks: Mutex<HashMap<(String, String), String>>,
}

impl CompletenessMonitor {
    pub fn new(store: Arc<DatumStore>, expected_interval_sec: f64) -> Self {
        Self {
            store,
            expected_interval_sec,
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Record last-seen for `(source, key)` (overwrite).
    pub fn mark(&self, datum: &RawDatum, key: &str) {
        self.lock().insert(
            (datum.source.clone(), key.to_string()),
            datum.timestamp.clone(),
        );
    }

    /// Gap descriptor if `(source, key)` has been silent for more than
    /// twice the expected cadence; `None` otherwise (including unknown or
    /// unparseable marks).
    pub fn detect_gap(&self, source: &str, key: &str) -> Option<GapReport> {
        self.detect_gap_at(source, key, Utc::now())
    }

    pub fn detect_gap_at(&self, source: &str, key: &str, now: DateTime<Utc>) -> Option<GapReport> {
        let last = self
            .lock()
            .get(&(source.to_string(), key.to_string()))
            .cloned()?;
        let seen = parse_iso(&last)?;
        let gap_sec = (now - seen).num_milliseconds() as f64 / 1000.0;
        if gap_sec > 2.0 * self.expected_interval_sec {
            Some(GapReport {
                source: source.to_string(),
                key: key.to_string(),
                last,
                gap_sec,
            })
        } else {
            None
        }
    }

    /// Scan every marked (source, key) pair and refresh each source's
    /// completeness score: 100 minus a fixed penalty per gapped key,
    /// floored at 0. Returns the gaps found. Run on the reliability tick.
    pub fn sweep(&self) -> Vec<GapReport> {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> Vec<GapReport> {
        let keys: Vec<(String, String)> = self.lock().keys().cloned().collect();

        let mut gaps = Vec::new();
        let mut gapped_per_source: HashMap<String, u32> = HashMap::new();
        for (source, key) in keys {
            let gap = self.detect_gap_at(&source, &key, now);
            let counter = gapped_per_source.entry(source).or_insert(0);
            if let Some(gap) = gap {
                *counter += 1;
                gaps.push(gap);
            }
        }

        for (source, gapped) in gapped_per_source {
            let fresh = (100.0 - GAP_PENALTY * gapped as f64).max(0.0);
            self.store
                .with_score(&source, |s| s.completeness_score = fresh);
        }
        gaps
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), String>> {
        self.marks.lock().expect("completeness marks mutex poisoned")
    }
}
