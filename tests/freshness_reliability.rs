// tests/freshness_reliability.rs
//
// Freshness staleness flow, completeness gaps, and how both feed the
// reliability score.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use feedpulse::completeness::CompletenessMonitor;
use feedpulse::freshness::FreshnessMonitor;
use feedpulse::model::{RawDatum, Severity};
use feedpulse::reliability::ReliabilityScorer;
use feedpulse::store::DatumStore;

fn datum_at(source: &str, ts: chrono::DateTime<Utc>) -> RawDatum {
    RawDatum {
        id: None,
        source: source.into(),
        timestamp: ts.to_rfc3339(),
        payload: json!({"price": 1.0, "symbol": "BTCUSD"}),
        lineage: None,
    }
}

#[test]
fn stale_source_gets_one_anomaly_and_one_stale_increment() {
    let store = Arc::new(DatumStore::new());
    let monitor = FreshnessMonitor::new(Arc::clone(&store), 15.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark_received(&datum_at("binance", t0));

    let raised = monitor.check_freshness_at(t0 + Duration::minutes(16));
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].metric, "freshness");
    assert_eq!(raised[0].severity, Severity::High);
    assert!((raised[0].value - 16.0).abs() < 0.01);

    let score = store.score_for("binance").unwrap();
    assert_eq!(score.stale_count, 1);
    assert_eq!(store.anomaly_count(), 1);
}

#[test]
fn staleness_refires_every_check_without_suppression() {
    let store = Arc::new(DatumStore::new());
    let monitor = FreshnessMonitor::new(Arc::clone(&store), 15.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark_received(&datum_at("binance", t0));

    monitor.check_freshness_at(t0 + Duration::minutes(16));
    monitor.check_freshness_at(t0 + Duration::minutes(17));
    assert_eq!(store.score_for("binance").unwrap().stale_count, 2);
    assert_eq!(store.anomaly_count(), 2);
}

#[test]
fn fresh_source_is_left_alone() {
    let store = Arc::new(DatumStore::new());
    let monitor = FreshnessMonitor::new(Arc::clone(&store), 15.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark_received(&datum_at("binance", t0));

    let raised = monitor.check_freshness_at(t0 + Duration::minutes(14));
    assert!(raised.is_empty());
    assert_eq!(store.score_for("binance").unwrap().stale_count, 0);
}

#[test]
fn mark_received_overwrites_and_touches_last_seen() {
    let store = Arc::new(DatumStore::new());
    let monitor = FreshnessMonitor::new(Arc::clone(&store), 15.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    let t1 = t0 + Duration::minutes(5);
    monitor.mark_received(&datum_at("binance", t0));
    monitor.mark_received(&datum_at("binance", t1));

    assert_eq!(monitor.last_seen("binance"), Some(t1.to_rfc3339()));
    assert_eq!(store.score_for("binance").unwrap().last_seen, t1.to_rfc3339());
    assert_eq!(monitor.last_seen("unknown"), None);
}

#[test]
fn gap_detected_only_past_twice_the_expected_cadence() {
    let store = Arc::new(DatumStore::new());
    let monitor = CompletenessMonitor::new(store, 30.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark(&datum_at("binance", t0), "BTCUSD");

    assert!(monitor
        .detect_gap_at("binance", "BTCUSD", t0 + Duration::seconds(59))
        .is_none());

    let gap = monitor
        .detect_gap_at("binance", "BTCUSD", t0 + Duration::seconds(61))
        .expect("gap past 60s");
    assert_eq!(gap.source, "binance");
    assert_eq!(gap.key, "BTCUSD");
    assert!((gap.gap_sec - 61.0).abs() < 0.01);

    // Unknown key: nothing to say.
    assert!(monitor
        .detect_gap_at("binance", "ETHUSD", t0 + Duration::seconds(300))
        .is_none());
}

#[test]
fn sweep_degrades_completeness_per_gapped_key_and_recovers() {
    let store = Arc::new(DatumStore::new());
    let monitor = CompletenessMonitor::new(Arc::clone(&store), 30.0);

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark(&datum_at("binance", t0), "BTCUSD");
    monitor.mark(&datum_at("binance", t0), "ETHUSD");
    monitor.mark(&datum_at("binance", t0 + Duration::minutes(5)), "SOLUSD");

    let gaps = monitor.sweep_at(t0 + Duration::minutes(2));
    assert_eq!(gaps.len(), 2);
    assert_eq!(
        store.score_for("binance").unwrap().completeness_score,
        80.0
    );

    // Everything recent again: score resets to 100.
    let t1 = t0 + Duration::minutes(10);
    monitor.mark(&datum_at("binance", t1), "BTCUSD");
    monitor.mark(&datum_at("binance", t1), "ETHUSD");
    monitor.mark(&datum_at("binance", t1), "SOLUSD");
    let gaps = monitor.sweep_at(t1 + Duration::seconds(10));
    assert!(gaps.is_empty());
    assert_eq!(
        store.score_for("binance").unwrap().completeness_score,
        100.0
    );
}

#[test]
fn stale_then_recompute_lowers_the_reliability_score() {
    let store = Arc::new(DatumStore::new());
    let monitor = FreshnessMonitor::new(Arc::clone(&store), 15.0);
    let scorer = ReliabilityScorer::new(Arc::clone(&store));

    let t0 = Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap();
    monitor.mark_received(&datum_at("binance", t0));
    monitor.check_freshness_at(t0 + Duration::minutes(16));

    let updated = scorer.recompute_all();
    assert_eq!(updated.len(), 1);
    // stale_count=1 -> reduction 2 -> 98.
    assert_eq!(store.score_for("binance").unwrap().score, 98);
}
