//! Core data model shared across the pipeline.
//!
//! Timestamps travel as ISO-8601 strings (what the feeds send us) and are
//! parsed to `DateTime<Utc>` only at computation boundaries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One ingested record. Immutable once validated; the correction engine
/// produces a new value rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDatum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Defaulted (not rejected) when absent, so the validator can report
    /// it rather than the deserializer.
    #[serde(default)]
    pub source: String,
    /// ISO-8601, as received (may be garbage until corrected).
    #[serde(default)]
    pub timestamp: String,
    /// Opaque payload; schema varies by feed type.
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<DataLineage>,
}

/// Payload shape, decided once at ingress. Unknown shapes are allowed
/// through on purpose; only the known ones get extra checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Has a `price` field (takes precedence over order-book fields).
    PriceTick,
    /// Has both `bids` and `asks`.
    OrderBook,
    Unknown,
}

impl RawDatum {
    pub fn payload_kind(&self) -> PayloadKind {
        match self.payload.as_object() {
            Some(obj) if obj.contains_key("price") => PayloadKind::PriceTick,
            Some(obj) if obj.contains_key("bids") && obj.contains_key("asks") => {
                PayloadKind::OrderBook
            }
            _ => PayloadKind::Unknown,
        }
    }
}

/// Outcome of schema validation. Never an error path: failures are data
/// for the caller to act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }
}

/// Provenance trail attached at ingress; grows monotonically, never shrinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLineage {
    pub source: String,
    pub received_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    pub transformations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Appended to the store by the anomaly detector or freshness monitor;
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub source: String,
    pub timestamp: String,
    pub metric: String,
    pub value: f64,
    /// Which rule(s) fired, joined with "; ".
    pub reason: String,
    pub severity: Severity,
}

impl Anomaly {
    pub fn new(source: &str, metric: &str, value: f64, reason: String, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            timestamp: now_iso(),
            metric: metric.to_string(),
            value,
            reason,
            severity,
        }
    }
}

/// Per-source health record. Created lazily on first touch; all mutation
/// goes through the store to keep it serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceScore {
    pub source: String,
    /// 0–100, starts at 100.
    pub score: i64,
    pub last_seen: String,
    pub stale_count: u32,
    pub anomaly_count: u32,
    pub completeness_score: f64,
}

impl SourceScore {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            score: 100,
            last_seen: now_iso(),
            stale_count: 0,
            anomaly_count: 0,
            completeness_score: 100.0,
        }
    }
}

/// Gap descriptor returned by the completeness monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub source: String,
    pub key: String,
    pub last: String,
    pub gap_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sources: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: String,
    pub total_anomalies: usize,
    pub anomalies_recent: Vec<Anomaly>,
    pub top_sources: Vec<SourceScore>,
    pub summary: ReportSummary,
}

/// Current time as ISO-8601 with millisecond precision (the same shape the
/// feeds use).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp to UTC. `None` on garbage.
pub fn parse_iso(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
