//! Feedpulse — Binary Entrypoint
//! Boots the Axum HTTP server and the periodic scheduler over one shared
//! in-memory store.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedpulse::api::{router, AppState};
use feedpulse::completeness::CompletenessMonitor;
use feedpulse::config::PipelineConfig;
use feedpulse::freshness::FreshnessMonitor;
use feedpulse::metrics::Metrics;
use feedpulse::notify::NotifierMux;
use feedpulse::pipeline::Pipeline;
use feedpulse::reliability::ReliabilityScorer;
use feedpulse::report::ReportService;
use feedpulse::scheduler::Scheduler;
use feedpulse::store::DatumStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedpulse=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::from_env();
    let metrics = Metrics::init(cfg.freshness_threshold_min);

    let store = Arc::new(DatumStore::new());
    let pipeline = Arc::new(Pipeline::new(Arc::clone(&store), &cfg));
    let reporter = Arc::new(ReportService::new(Arc::clone(&store)));
    let scorer = Arc::new(ReliabilityScorer::new(Arc::clone(&store)));
    let freshness: Arc<FreshnessMonitor> = Arc::clone(pipeline.freshness());
    let completeness: Arc<CompletenessMonitor> = Arc::clone(pipeline.completeness());

    let notifier = NotifierMux::from_env();
    let scheduler = Scheduler::new(
        freshness,
        completeness,
        scorer,
        Arc::clone(&reporter),
        notifier.clone(),
        cfg.scheduler,
    );
    scheduler.start();

    let state = AppState::new(pipeline, reporter).with_notifier(notifier);
    let app = router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "feedpulse listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    scheduler.stop();
    Ok(())
}
