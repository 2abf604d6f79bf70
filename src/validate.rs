//! # Schema Validator
//! Structural checks on an inbound datum before further processing.
//!
//! Validation never throws: every applicable check runs (no short-circuit)
//! and failures come back as an ordered error list for the caller to act
//! on. Unknown payload shapes pass unconditionally — the permissive default
//! is policy, not an oversight.

use serde_json::Value;

use crate::model::{PayloadKind, RawDatum, ValidationResult};

#[derive(Debug, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, datum: &RawDatum) -> ValidationResult {
        let mut errors = Vec::new();

        if datum.source.trim().is_empty() {
            errors.push("missing source".to_string());
        }
        if datum.timestamp.trim().is_empty() {
            errors.push("missing timestamp".to_string());
        }
        if datum.payload.is_null() {
            errors.push("missing payload".to_string());
        }

        match datum.payload_kind() {
            PayloadKind::PriceTick => {
                if !matches!(datum.payload.get("price"), Some(Value::Number(_))) {
                    errors.push("price is not numeric".to_string());
                }
                if !matches!(datum.payload.get("symbol"), Some(Value::String(_))) {
                    errors.push("missing symbol".to_string());
                }
            }
            PayloadKind::OrderBook => {
                // No element-type checking; sequence shape only.
                if !matches!(datum.payload.get("bids"), Some(Value::Array(_))) {
                    errors.push("bids is not a sequence".to_string());
                }
                if !matches!(datum.payload.get("asks"), Some(Value::Array(_))) {
                    errors.push("asks is not a sequence".to_string());
                }
            }
            PayloadKind::Unknown => {}
        }

        ValidationResult::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn datum(source: &str, timestamp: &str, payload: Value) -> RawDatum {
        RawDatum {
            id: None,
            source: source.into(),
            timestamp: timestamp.into(),
            payload,
            lineage: None,
        }
    }

    #[test]
    fn valid_price_tick_passes() {
        let d = datum(
            "binance",
            "2026-08-26T12:00:00Z",
            json!({"price": 42.5, "symbol": "BTCUSD"}),
        );
        let res = SchemaValidator::new().validate(&d);
        assert!(res.ok);
        assert!(res.errors.is_empty());
    }

    #[test]
    fn all_checks_run_in_order_without_short_circuit() {
        let d = datum("", "", json!({"price": "abc"}));
        let res = SchemaValidator::new().validate(&d);
        assert!(!res.ok);
        assert_eq!(
            res.errors,
            vec![
                "missing source",
                "missing timestamp",
                "price is not numeric",
                "missing symbol"
            ]
        );
    }

    #[test]
    fn orderbook_requires_sequences() {
        let d = datum(
            "kraken",
            "2026-08-26T12:00:00Z",
            json!({"bids": {"p": 1}, "asks": []}),
        );
        let res = SchemaValidator::new().validate(&d);
        assert!(!res.ok);
        assert_eq!(res.errors, vec!["bids is not a sequence"]);
    }

    #[test]
    fn unknown_shape_passes_unconditionally() {
        let d = datum("feed", "2026-08-26T12:00:00Z", json!({"whatever": true}));
        assert!(SchemaValidator::new().validate(&d).ok);
    }
}
