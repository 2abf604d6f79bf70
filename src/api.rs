//! HTTP surface: one POST ingress plus read-only projections of store
//! state. Handlers have no logic of their own — everything delegates to
//! the pipeline components.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::completeness::CompletenessMonitor;
use crate::config::PipelineConfig;
use crate::freshness::FreshnessMonitor;
use crate::model::{Anomaly, GapReport, RawDatum, Report, SourceScore};
use crate::notify::{AlertEvent, NotifierMux};
use crate::pipeline::{IngestOutcome, Pipeline};
use crate::report::ReportService;
use crate::store::DatumStore;

const DEFAULT_ANOMALY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    store: Arc<DatumStore>,
    freshness: Arc<FreshnessMonitor>,
    completeness: Arc<CompletenessMonitor>,
    reporter: Arc<ReportService>,
    notifier: NotifierMux,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, reporter: Arc<ReportService>) -> Self {
        Self {
            store: Arc::clone(pipeline.store()),
            freshness: Arc::clone(pipeline.freshness()),
            completeness: Arc::clone(pipeline.completeness()),
            pipeline,
            reporter,
            notifier: NotifierMux::default(),
        }
    }

    /// Forward ingress anomalies to the given sinks (the scheduler carries
    /// its own mux for the freshness path).
    pub fn with_notifier(mut self, notifier: NotifierMux) -> Self {
        self.notifier = notifier;
        self
    }

    /// Standalone state for tests and simple embedding.
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        let store = Arc::new(DatumStore::new());
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&store), cfg));
        let reporter = Arc::new(ReportService::new(store));
        Self::new(pipeline, reporter)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ingest", post(ingest))
        .route("/anomalies", get(anomalies))
        .route("/sources", get(sources))
        .route("/report", get(report))
        .route("/freshness/{source}", get(freshness))
        .route("/gaps/{source}", get(gaps))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn ingest(State(state): State<AppState>, Json(datum): Json<RawDatum>) -> Json<IngestOutcome> {
    let out = state.pipeline.ingest(datum);
    // Anomalies raised on the ingest path are forwarded best-effort; the
    // store record is the only guarantee.
    if let Some(anomaly) = &out.anomaly {
        state.notifier.notify(&AlertEvent::from(anomaly)).await;
    }
    Json(out)
}

#[derive(Deserialize)]
struct AnomaliesQuery {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn anomalies(
    State(state): State<AppState>,
    Query(q): Query<AnomaliesQuery>,
) -> Json<Vec<Anomaly>> {
    let limit = q.limit.unwrap_or(DEFAULT_ANOMALY_LIMIT);
    Json(state.store.recent_anomalies(q.source.as_deref(), limit))
}

async fn sources(State(state): State<AppState>) -> Json<Vec<SourceScore>> {
    Json(state.store.scores())
}

async fn report(State(state): State<AppState>) -> Json<Report> {
    Json(state.reporter.generate())
}

#[derive(Serialize)]
struct FreshnessOut {
    source: String,
    last_seen: Option<String>,
}

async fn freshness(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Json<FreshnessOut> {
    let last_seen = state.freshness.last_seen(&source);
    Json(FreshnessOut { source, last_seen })
}

#[derive(Deserialize)]
struct GapQuery {
    #[serde(default)]
    key: Option<String>,
}

async fn gaps(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(q): Query<GapQuery>,
) -> Json<Option<GapReport>> {
    let key = q.key.as_deref().unwrap_or("default");
    Json(state.completeness.detect_gap(&source, key))
}
