//! # Datum Store
//! In-memory system of record: append-only datum log, anomaly log, and the
//! per-source score table.
//!
//! All `SourceScore` mutation funnels through [`DatumStore::with_score`] (or
//! a composite op that uses it under the same lock acquisition), so
//! read-modify-write sequences on one source record can never interleave.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{Anomaly, RawDatum, SourceScore};

#[derive(Debug, Default)]
struct Inner {
    datums: Vec<RawDatum>,
    anomalies: Vec<Anomaly>,
    scores: HashMap<String, SourceScore>,
}

/// Thread-safe in-memory store. Single logical owner of all score state.
#[derive(Debug, Default)]
pub struct DatumStore {
    inner: Mutex<Inner>,
}

impl DatumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a (corrected) datum to the log.
    pub fn push_datum(&self, datum: RawDatum) {
        let mut g = self.lock();
        g.datums.push(datum);
    }

    /// Run `f` against the score record for `source`, creating the default
    /// record on first touch. This is the only lazy-create path.
    pub fn with_score<T>(&self, source: &str, f: impl FnOnce(&mut SourceScore) -> T) -> T {
        let mut g = self.lock();
        f(score_entry(&mut g, source))
    }

    /// Record that `source` was seen at `last_seen` (ingest path).
    pub fn touch_source(&self, source: &str, last_seen: &str) {
        self.with_score(source, |s| s.last_seen = last_seen.to_string());
    }

    /// Append an anomaly and bump the source's anomaly counter in one
    /// locked operation (anomaly-detector path).
    pub fn record_anomaly(&self, anomaly: Anomaly) {
        let mut g = self.lock();
        let source = anomaly.source.clone();
        score_entry(&mut g, &source).anomaly_count += 1;
        g.anomalies.push(anomaly);
    }

    /// Append a staleness anomaly and bump the source's stale counter in
    /// one locked operation (freshness path).
    pub fn record_stale(&self, anomaly: Anomaly) {
        let mut g = self.lock();
        let source = anomaly.source.clone();
        score_entry(&mut g, &source).stale_count += 1;
        g.anomalies.push(anomaly);
    }

    /// Apply `f` to every score record under a single lock acquisition and
    /// return the updated snapshot. Used by the reliability recompute so a
    /// full pass cannot interleave with ingest-path increments.
    pub fn update_scores(&self, mut f: impl FnMut(&mut SourceScore)) -> Vec<SourceScore> {
        let mut g = self.lock();
        let mut out: Vec<SourceScore> = g
            .scores
            .values_mut()
            .map(|s| {
                f(s);
                s.clone()
            })
            .collect();
        out.sort_by(|a, b| a.source.cmp(&b.source));
        out
    }

    /// Most recent anomalies, newest first, optionally filtered by source.
    pub fn recent_anomalies(&self, source: Option<&str>, limit: usize) -> Vec<Anomaly> {
        let g = self.lock();
        g.anomalies
            .iter()
            .rev()
            .filter(|a| source.is_none_or(|s| a.source == s))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn anomaly_count(&self) -> usize {
        self.lock().anomalies.len()
    }

    pub fn datum_count(&self) -> usize {
        self.lock().datums.len()
    }

    /// Snapshot of all score records, sorted by source name.
    pub fn scores(&self) -> Vec<SourceScore> {
        let g = self.lock();
        let mut out: Vec<SourceScore> = g.scores.values().cloned().collect();
        out.sort_by(|a, b| a.source.cmp(&b.source));
        out
    }

    pub fn score_for(&self, source: &str) -> Option<SourceScore> {
        self.lock().scores.get(source).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("datum store mutex poisoned")
    }
}

fn score_entry<'a>(inner: &'a mut Inner, source: &str) -> &'a mut SourceScore {
    inner
        .scores
        .entry(source.to_string())
        .or_insert_with(|| SourceScore::new(source))
}
