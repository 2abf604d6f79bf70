//! Ingest path wiring: validate → attach lineage → correct (which stores)
//! → detector updates → freshness/completeness marks. Each stage is
//! metered; nothing on this path blocks on network or disk.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use crate::anomaly::AnomalyDetector;
use crate::completeness::CompletenessMonitor;
use crate::config::PipelineConfig;
use crate::correct::CorrectionEngine;
use crate::freshness::FreshnessMonitor;
use crate::lineage;
use crate::model::{Anomaly, PayloadKind, RawDatum, ValidationResult};
use crate::outlier::OutlierDetector;
use crate::store::DatumStore;
use crate::validate::SchemaValidator;

/// What happened to one datum on its way in. Returned to the caller (and
/// the HTTP ingress) so rejection/acceptance policy stays outside the core.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<Anomaly>,
    pub outlier: bool,
}

pub struct Pipeline {
    store: Arc<DatumStore>,
    validator: SchemaValidator,
    corrector: CorrectionEngine,
    anomalies: AnomalyDetector,
    outliers: OutlierDetector,
    freshness: Arc<FreshnessMonitor>,
    completeness: Arc<CompletenessMonitor>,
}

impl Pipeline {
    pub fn new(store: Arc<DatumStore>, cfg: &PipelineConfig) -> Self {
        let freshness = Arc::new(FreshnessMonitor::new(
            Arc::clone(&store),
            cfg.freshness_threshold_min,
        ));
        let completeness = Arc::new(CompletenessMonitor::new(
            Arc::clone(&store),
            cfg.expected_interval_secs,
        ));
        Self {
            validator: SchemaValidator::new(),
            corrector: CorrectionEngine::new(Arc::clone(&store)),
            anomalies: AnomalyDetector::new(Arc::clone(&store), cfg.anomaly),
            outliers: OutlierDetector::new(cfg.outlier),
            freshness,
            completeness,
            store,
        }
    }

    /// Run one datum through the whole ingest path. Validation failures do
    /// not stop the pipeline — the datum is still corrected and stored,
    /// and the caller decides what to do with the error list.
    pub fn ingest(&self, datum: RawDatum) -> IngestOutcome {
        counter!("feedpulse_datums_ingested_total").increment(1);

        let validation = self.validator.validate(&datum);
        if !validation.ok {
            counter!("feedpulse_validation_failures_total").increment(1);
            tracing::debug!(
                source = %datum.source,
                errors = ?validation.errors,
                "validation failed, continuing with correction"
            );
        }

        let datum = lineage::attach(datum, Some("received"));
        let (datum, correction) = self.corrector.attempt_correction(datum);
        if correction.is_some() {
            counter!("feedpulse_corrections_total").increment(1);
        }

        let anomaly = self.anomalies.ingest(&datum, price_metric);
        if anomaly.is_some() {
            counter!("feedpulse_anomalies_total").increment(1);
        }
        let outlier = self.outliers.ingest(&datum, price_metric);
        if outlier {
            counter!("feedpulse_outliers_total").increment(1);
        }

        self.freshness.mark_received(&datum);
        self.completeness.mark(&datum, &completeness_key(&datum));

        IngestOutcome {
            validation,
            correction,
            anomaly,
            outlier,
        }
    }

    pub fn store(&self) -> &Arc<DatumStore> {
        &self.store
    }

    pub fn freshness(&self) -> &Arc<FreshnessMonitor> {
        &self.freshness
    }

    pub fn completeness(&self) -> &Arc<CompletenessMonitor> {
        &self.completeness
    }
}

/// Default metric extractor: the price of a price tick.
pub fn price_metric(datum: &RawDatum) -> Option<(String, f64)> {
    if datum.payload_kind() != PayloadKind::PriceTick {
        return None;
    }
    let price = datum.payload.get("price")?.as_f64()?;
    Some(("price".to_string(), price))
}

/// Completeness is tracked per symbol where the payload has one, else per
/// a catch-all key.
pub fn completeness_key(datum: &RawDatum) -> String {
    datum
        .payload
        .get("symbol")
        .and_then(|s| s.as_str())
        .unwrap_or("default")
        .to_string()
}
