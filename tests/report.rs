// tests/report.rs

use std::sync::Arc;

use feedpulse::model::{Anomaly, Severity};
use feedpulse::report::ReportService;
use feedpulse::store::DatumStore;

#[test]
fn empty_store_reports_avg_100_not_0() {
    let store = Arc::new(DatumStore::new());
    let report = ReportService::new(store).generate();

    assert_eq!(report.summary.total_sources, 0);
    assert_eq!(report.summary.avg_score, 100.0);
    assert_eq!(report.total_anomalies, 0);
    assert!(report.anomalies_recent.is_empty());
    assert!(report.top_sources.is_empty());
    assert!(!report.generated_at.is_empty());
}

#[test]
fn top_sources_capped_at_ten_sorted_by_score_desc() {
    let store = Arc::new(DatumStore::new());
    for i in 0..12 {
        let source = format!("source-{i:02}");
        store.with_score(&source, |s| s.score = 100 - i as i64);
    }
    let report = ReportService::new(Arc::clone(&store)).generate();

    assert_eq!(report.summary.total_sources, 12);
    assert_eq!(report.top_sources.len(), 10);
    assert_eq!(report.top_sources[0].score, 100);
    assert!(report
        .top_sources
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
    // avg over all 12, not just the top 10: (100 + 99 + ... + 89) / 12
    let expected = (89..=100).sum::<i64>() as f64 / 12.0;
    assert!((report.summary.avg_score - expected).abs() < 1e-9);
}

#[test]
fn recent_anomalies_capped_at_50_while_total_counts_all() {
    let store = Arc::new(DatumStore::new());
    for i in 0..60 {
        store.record_anomaly(Anomaly::new(
            "binance",
            "price",
            i as f64,
            "test".into(),
            Severity::Low,
        ));
    }
    let report = ReportService::new(store).generate();

    assert_eq!(report.total_anomalies, 60);
    assert_eq!(report.anomalies_recent.len(), 50);
    // Newest first.
    assert_eq!(report.anomalies_recent[0].value, 59.0);
}
