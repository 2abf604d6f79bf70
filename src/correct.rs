//! # Correction Engine
//! Best-effort repair of malformed fields before storage: price type
//! coercion, imputation from the last known value, and timestamp
//! sanitization. Unresolvable repairs are reported in the action string,
//! never raised as errors — downstream consumers check the action.
//!
//! The corrected datum is pushed to the store here, as a side effect of
//! `attempt_correction` — callers must not double-push.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::lineage;
use crate::model::{parse_iso, RawDatum};
use crate::store::DatumStore;

/// Timestamps further in the future than this are treated as clock garbage.
const MAX_FUTURE_SKEW_SECS: i64 = 5 * 60;

pub struct CorrectionEngine {
    store: Arc<DatumStore>,
    /// Last known good price per source, for imputation.
    last_known: Mutex<HashMap<String, f64>>,
}

impl CorrectionEngine {
    pub fn new(store: Arc<DatumStore>) -> Self {
        Self {
            store,
            last_known: Mutex::new(HashMap::new()),
        }
    }

    /// Repair what can be repaired, record the result in the store, and
    /// report which actions were taken (joined with "; "), if any.
    pub fn attempt_correction(&self, datum: RawDatum) -> (RawDatum, Option<String>) {
        self.attempt_correction_at(datum, Utc::now())
    }

    pub fn attempt_correction_at(
        &self,
        mut datum: RawDatum,
        now: DateTime<Utc>,
    ) -> (RawDatum, Option<String>) {
        let mut actions: Vec<&str> = Vec::new();

        // Price rules apply only when the payload carries a price field.
        let has_price = datum
            .payload
            .as_object()
            .is_some_and(|o| o.contains_key("price"));
        if has_price {
            match parse_price(&datum.payload["price"]) {
                Some(num) => {
                    datum.payload["price"] = json!(num);
                    self.lock_last_known().insert(datum.source.clone(), num);
                    actions.push("type_cast_price");
                }
                None => {
                    let last = self.lock_last_known().get(&datum.source).copied();
                    match last {
                        Some(v) => {
                            datum.payload["price"] = json!(v);
                            actions.push("imputed_price_from_last");
                        }
                        None => {
                            // Nothing to impute from; leave price unset.
                            if let Some(obj) = datum.payload.as_object_mut() {
                                obj.remove("price");
                            }
                            actions.push("could_not_impute_price");
                        }
                    }
                }
            }
        }

        // Timestamp sanity, independent of payload shape.
        let needs_fix = match parse_iso(&datum.timestamp) {
            Some(ts) => ts > now + Duration::seconds(MAX_FUTURE_SKEW_SECS),
            None => true,
        };
        if needs_fix {
            datum.timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
            actions.push("fixed_timestamp");
        }

        for action in &actions {
            datum = lineage::add_transform(datum, action);
        }

        let action = if actions.is_empty() {
            None
        } else {
            Some(actions.join("; "))
        };

        self.store.push_datum(datum.clone());
        (datum, action)
    }

    fn lock_last_known(&self) -> std::sync::MutexGuard<'_, HashMap<String, f64>> {
        self.last_known.lock().expect("last-known mutex poisoned")
    }
}

/// Accept numbers and numeric strings; anything non-finite is malformed.
fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
