// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod anomaly;
pub mod api;
pub mod completeness;
pub mod config;
pub mod correct;
pub mod freshness;
pub mod lineage;
pub mod metrics;
pub mod model;
pub mod outlier;
pub mod pipeline;
pub mod reliability;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod validate;

// Notifications (webhook alert egress)
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::PipelineConfig;
pub use crate::model::{Anomaly, RawDatum, Report, Severity, SourceScore};
pub use crate::pipeline::{IngestOutcome, Pipeline};
pub use crate::store::DatumStore;
