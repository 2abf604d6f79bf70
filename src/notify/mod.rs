//! Alert egress. The store record is the only guarantee the core makes;
//! forwarding to an external sink is best-effort and failures are logged,
//! never propagated back into the pipeline.

pub mod webhook;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Anomaly, Severity};
use webhook::WebhookNotifier;

/// One alert as shipped to external sinks.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub source: String,
    pub metric: String,
    pub value: f64,
    pub severity: Severity,
    pub reason: String,
    pub ts: DateTime<Utc>,
}

impl From<&Anomaly> for AlertEvent {
    fn from(a: &Anomaly) -> Self {
        Self {
            source: a.source.clone(),
            metric: a.metric.clone(),
            value: a.value,
            severity: a.severity,
            reason: a.reason.clone(),
            ts: Utc::now(),
        }
    }
}

/// Fan-out to whichever sinks are configured. With none configured, alerts
/// only land in the log.
#[derive(Default, Clone)]
pub struct NotifierMux {
    webhook: Option<WebhookNotifier>,
}

impl NotifierMux {
    /// Sinks are opt-in via env: `ALERT_WEBHOOK_URL`.
    pub fn from_env() -> Self {
        let webhook = std::env::var("ALERT_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(WebhookNotifier::new);
        Self { webhook }
    }

    /// Mux with one explicit webhook sink (embedding and tests).
    pub fn with_webhook(webhook: WebhookNotifier) -> Self {
        Self {
            webhook: Some(webhook),
        }
    }

    pub async fn notify(&self, event: &AlertEvent) {
        tracing::info!(
            source = %event.source,
            metric = %event.metric,
            severity = ?event.severity,
            reason = %event.reason,
            "alert"
        );
        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.send_alert(event).await {
                tracing::warn!("webhook alert failed: {e:#}");
            }
        }
    }
}
