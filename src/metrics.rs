use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feedpulse_datums_ingested_total",
            "Datums accepted by the ingest path."
        );
        describe_counter!(
            "feedpulse_validation_failures_total",
            "Datums that failed schema validation (still processed)."
        );
        describe_counter!(
            "feedpulse_corrections_total",
            "Datums with at least one correction action applied."
        );
        describe_counter!(
            "feedpulse_anomalies_total",
            "Anomalies recorded by the online detector."
        );
        describe_counter!(
            "feedpulse_outliers_total",
            "Values flagged by the IQR outlier detector (not stored)."
        );
        describe_counter!(
            "feedpulse_scheduler_ticks_total",
            "Scheduler ticks, labeled by task."
        );
        describe_gauge!(
            "feedpulse_report_avg_score",
            "Average source reliability score at the last report."
        );
        describe_gauge!(
            "feedpulse_freshness_threshold_min",
            "Configured staleness threshold in minutes."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish static config gauges.
    pub fn init(freshness_threshold_min: f64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();
        gauge!("feedpulse_freshness_threshold_min").set(freshness_threshold_min);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
