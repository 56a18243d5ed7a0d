//! Processor Webhook Events
//!
//! The processor posts JSON webhooks with loosely-typed fields (ids arrive as
//! strings or numbers depending on the endpoint). Parsing happens once at the
//! boundary; the rest of the lifecycle only sees this closed event type.

use serde_json::Value;

use crate::gateway::{json_id, map_processor_status};
use crate::types::DepositStatus;

/// A normalized payment-status event from the processor
#[derive(Debug, Clone)]
pub struct ProcessorEvent {
    /// Invoice the event refers to (correlation key)
    pub invoice_id: String,
    /// Processor payment id, if assigned
    pub payment_id: Option<String>,
    /// Reported status, mapped to the internal vocabulary
    pub status: DepositStatus,
    /// Observed paid amount in the pay currency
    pub paid_amount: Option<f64>,
}

impl ProcessorEvent {
    /// Parse a webhook body.
    ///
    /// Only `invoice_id` and `payment_status` are required; everything else
    /// is best-effort. Returns a description of the problem on failure so the
    /// webhook handler can log it.
    pub fn from_value(payload: &Value) -> Result<Self, String> {
        let invoice_id = payload
            .get("invoice_id")
            .and_then(json_id)
            .ok_or_else(|| "missing invoice_id".to_string())?;

        let raw_status = payload
            .get("payment_status")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing payment_status".to_string())?;

        let payment_id = payload.get("payment_id").and_then(json_id);

        let paid_amount = payload
            .get("actually_paid")
            .and_then(Value::as_f64)
            .filter(|amount| *amount > 0.0)
            .or_else(|| payload.get("pay_amount").and_then(Value::as_f64));

        Ok(Self {
            invoice_id,
            payment_id,
            status: map_processor_status(raw_status),
            paid_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_payload() {
        let payload = json!({
            "invoice_id": 4521,
            "payment_id": "6011054766",
            "payment_status": "finished",
            "actually_paid": 0.0021,
            "pay_amount": 0.0022,
        });

        let event = ProcessorEvent::from_value(&payload).unwrap();
        assert_eq!(event.invoice_id, "4521");
        assert_eq!(event.payment_id.as_deref(), Some("6011054766"));
        assert_eq!(event.status, DepositStatus::Confirmed);
        assert_eq!(event.paid_amount, Some(0.0021));
    }

    #[test]
    fn test_parse_minimal_payload() {
        let payload = json!({
            "invoice_id": "INV1",
            "payment_status": "waiting",
        });

        let event = ProcessorEvent::from_value(&payload).unwrap();
        assert_eq!(event.invoice_id, "INV1");
        assert!(event.payment_id.is_none());
        assert_eq!(event.status, DepositStatus::Waiting);
        assert!(event.paid_amount.is_none());
    }

    #[test]
    fn test_zero_actually_paid_falls_back_to_pay_amount() {
        let payload = json!({
            "invoice_id": "INV1",
            "payment_status": "confirming",
            "actually_paid": 0.0,
            "pay_amount": 0.5,
        });

        let event = ProcessorEvent::from_value(&payload).unwrap();
        assert_eq!(event.paid_amount, Some(0.5));
    }

    #[test]
    fn test_missing_required_fields() {
        assert!(ProcessorEvent::from_value(&json!({"payment_status": "waiting"})).is_err());
        assert!(ProcessorEvent::from_value(&json!({"invoice_id": "INV1"})).is_err());
        assert!(ProcessorEvent::from_value(&json!("not an object")).is_err());
    }

    #[test]
    fn test_unmapped_status_is_waiting() {
        let payload = json!({
            "invoice_id": "INV1",
            "payment_status": "partially_paid",
        });

        let event = ProcessorEvent::from_value(&payload).unwrap();
        assert_eq!(event.status, DepositStatus::Waiting);
    }
}
