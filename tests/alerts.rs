// tests/alerts.rs
//
// Alert egress: anomalies raised on the ingest path and by the freshness
// check are forwarded to the configured webhook. A tiny local axum server
// stands in for the external sink and captures what arrives.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{body::Body, Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tower::ServiceExt as _; // for `oneshot`

use feedpulse::api::{router, AppState};
use feedpulse::completeness::CompletenessMonitor;
use feedpulse::config::{PipelineConfig, SchedulerConfig};
use feedpulse::freshness::FreshnessMonitor;
use feedpulse::model::RawDatum;
use feedpulse::notify::webhook::WebhookNotifier;
use feedpulse::notify::NotifierMux;
use feedpulse::reliability::ReliabilityScorer;
use feedpulse::report::ReportService;
use feedpulse::scheduler::Scheduler;
use feedpulse::store::DatumStore;

async fn capture(State(tx): State<UnboundedSender<Value>>, Json(body): Json<Value>) -> StatusCode {
    tx.send(body).ok();
    StatusCode::OK
}

/// Spawn a one-route sink and return its URL plus the capture channel.
async fn spawn_sink() -> (String, UnboundedReceiver<Value>) {
    let (tx, rx) = unbounded_channel();
    let app = Router::new().route("/", post(capture)).with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind sink");
    let addr = listener.local_addr().expect("sink addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve sink");
    });
    (format!("http://{addr}/"), rx)
}

async fn recv_alert(rx: &mut UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("alert within 5s")
        .expect("sink channel open")
}

#[tokio::test]
async fn ingress_anomaly_is_forwarded_to_the_webhook() {
    let (url, mut rx) = spawn_sink().await;
    let mux = NotifierMux::with_webhook(WebhookNotifier::new(url).with_retries(1));
    let app = router(AppState::from_config(&PipelineConfig::default()).with_notifier(mux));

    // First tick is the bootstrap sample; the second is a 40%+ jump.
    for price in [100.0, 200.0] {
        let req = Request::post("/ingest")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "source": "binance",
                    "timestamp": Utc::now().to_rfc3339(),
                    "payload": {"price": price, "symbol": "BTCUSD"}
                })
                .to_string(),
            ))
            .expect("build POST /ingest");
        let resp = app.clone().oneshot(req).await.expect("oneshot /ingest");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let alert = recv_alert(&mut rx).await;
    assert_eq!(alert["source"], json!("binance"));
    assert_eq!(alert["metric"], json!("price"));
    assert_eq!(alert["severity"], json!("medium"));

    // The clean first tick produced no alert.
    assert!(rx.try_recv().is_err(), "only the anomalous tick alerts");
}

#[tokio::test]
async fn freshness_tick_forwards_staleness_alerts() {
    let (url, mut rx) = spawn_sink().await;
    let mux = NotifierMux::with_webhook(WebhookNotifier::new(url).with_retries(1));

    let store = Arc::new(DatumStore::new());
    let freshness = Arc::new(FreshnessMonitor::new(Arc::clone(&store), 15.0));
    let scheduler = Scheduler::new(
        Arc::clone(&freshness),
        Arc::new(CompletenessMonitor::new(Arc::clone(&store), 30.0)),
        Arc::new(ReliabilityScorer::new(Arc::clone(&store))),
        Arc::new(ReportService::new(Arc::clone(&store))),
        mux,
        SchedulerConfig::default(),
    );

    let old = Utc::now() - ChronoDuration::minutes(20);
    freshness.mark_received(&RawDatum {
        id: None,
        source: "binance".into(),
        timestamp: old.to_rfc3339(),
        payload: json!({"price": 1.0, "symbol": "BTCUSD"}),
        lineage: None,
    });

    scheduler.tick_freshness().await;

    let alert = recv_alert(&mut rx).await;
    assert_eq!(alert["source"], json!("binance"));
    assert_eq!(alert["metric"], json!("freshness"));
    assert_eq!(alert["severity"], json!("high"));
}
