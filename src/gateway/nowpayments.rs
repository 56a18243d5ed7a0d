//! NOWPayments Gateway Client
//!
//! HTTP client for the NOWPayments invoice API. The lifecycle manager only
//! sees the `PaymentGateway` trait, so tests can substitute a mock.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::types::{DepositStatus, PayCurrency};

/// Per-request timeout for processor calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Gateway error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure or non-2xx response; retryable by the caller
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The processor has no record of the given payment id
    #[error("payment not found: {0}")]
    PaymentNotFound(String),

    /// The processor answered with a body we cannot use
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether the caller may retry and expect a different outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Unavailable(e.to_string())
    }
}

/// A processor-acknowledged invoice
#[derive(Debug, Clone)]
pub struct Invoice {
    /// Processor-assigned invoice id (webhook correlation key)
    pub invoice_id: String,
    /// Processor-hosted checkout URL
    pub invoice_url: String,
}

/// Normalized result of a payment-status query
#[derive(Debug, Clone)]
pub struct PaymentStatus {
    /// Internal status mapped from the processor vocabulary
    pub status: DepositStatus,
    /// Observed paid amount in the pay currency, if reported
    pub paid_amount: Option<f64>,
}

/// Payment gateway interface
///
/// Implementations:
/// - `NowPaymentsClient` - Production client against the NOWPayments API
/// - `MockPaymentGateway` - mockall mock for tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an invoice for the given fiat amount.
    ///
    /// Must not leave any local state behind on failure; the caller persists
    /// the deposit record only after a successful response.
    async fn create_invoice(
        &self,
        amount_cents: u64,
        pay_currency: PayCurrency,
        order_id: &str,
    ) -> Result<Invoice, GatewayError>;

    /// Query the processor for the current status of a payment
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, GatewayError>;
}

/// Map a processor status string to the internal status.
///
/// Applied identically on the webhook and poll paths. Unmapped statuses fall
/// back to `waiting` (the least destructive status) and are logged.
pub fn map_processor_status(raw: &str) -> DepositStatus {
    match raw {
        "waiting" => DepositStatus::Waiting,
        "confirming" => DepositStatus::Confirming,
        "confirmed" | "finished" => DepositStatus::Confirmed,
        "failed" | "refunded" => DepositStatus::Failed,
        "expired" => DepositStatus::Expired,
        other => {
            warn!(processor_status = other, "unmapped processor status, treating as waiting");
            DepositStatus::Waiting
        }
    }
}

/// Coerce a JSON id field to a string.
///
/// The processor serializes ids inconsistently (sometimes numbers, sometimes
/// strings); both forms must correlate to the same stored invoice id.
pub fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// NOWPayments HTTP client
#[derive(Debug, Clone)]
pub struct NowPaymentsClient {
    client: Client,
    base_url: String,
    api_key: String,
    ipn_callback_url: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Serialize)]
struct InvoiceRequest<'a> {
    price_amount: f64,
    price_currency: &'a str,
    pay_currency: String,
    order_id: &'a str,
    order_description: String,
    ipn_callback_url: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    id: serde_json::Value,
    invoice_url: String,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusResponse {
    payment_status: String,
    actually_paid: Option<f64>,
    pay_amount: Option<f64>,
}

impl NowPaymentsClient {
    /// Create a new client
    pub fn new(
        base_url: &str,
        api_key: String,
        ipn_callback_url: String,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            ipn_callback_url,
            success_url,
            cancel_url,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PaymentGateway for NowPaymentsClient {
    async fn create_invoice(
        &self,
        amount_cents: u64,
        pay_currency: PayCurrency,
        order_id: &str,
    ) -> Result<Invoice, GatewayError> {
        let url = format!("{}/v1/invoice", self.base_url);
        let amount_usd = crate::types::cents_to_usd(amount_cents);

        let body = InvoiceRequest {
            price_amount: amount_usd,
            price_currency: "usd",
            pay_currency: pay_currency.to_string(),
            order_id,
            order_description: format!(
                "Deposit - {}",
                crate::types::cents_to_display(amount_cents)
            ),
            ipn_callback_url: &self.ipn_callback_url,
            success_url: &self.success_url,
            cancel_url: &self.cancel_url,
        };

        let resp = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!(
                "invoice creation failed: {} {}",
                status, text
            )));
        }

        let invoice: InvoiceResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let invoice_id = json_id(&invoice.id)
            .ok_or_else(|| GatewayError::InvalidResponse("invoice id missing".to_string()))?;

        Ok(Invoice {
            invoice_id,
            invoice_url: invoice.invoice_url,
        })
    }

    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, GatewayError> {
        let url = format!("{}/v1/payment/{}", self.base_url, payment_id);

        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::PaymentNotFound(payment_id.to_string()));
        }

        if !resp.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "payment status query failed: {}",
                resp.status()
            )));
        }

        let payment: PaymentStatusResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        // actually_paid is reported as 0 until the processor sees funds
        let paid_amount = payment
            .actually_paid
            .filter(|amount| *amount > 0.0)
            .or(payment.pay_amount);

        Ok(PaymentStatus {
            status: map_processor_status(&payment.payment_status),
            paid_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(map_processor_status("waiting"), DepositStatus::Waiting);
        assert_eq!(map_processor_status("confirming"), DepositStatus::Confirming);
        assert_eq!(map_processor_status("confirmed"), DepositStatus::Confirmed);
        assert_eq!(map_processor_status("finished"), DepositStatus::Confirmed);
        assert_eq!(map_processor_status("failed"), DepositStatus::Failed);
        assert_eq!(map_processor_status("refunded"), DepositStatus::Failed);
        assert_eq!(map_processor_status("expired"), DepositStatus::Expired);
    }

    #[test]
    fn test_unmapped_status_defaults_to_waiting() {
        assert_eq!(map_processor_status("partially_paid"), DepositStatus::Waiting);
        assert_eq!(map_processor_status("sending"), DepositStatus::Waiting);
        assert_eq!(map_processor_status(""), DepositStatus::Waiting);
    }

    #[test]
    fn test_json_id_coercion() {
        assert_eq!(json_id(&serde_json::json!("INV1")), Some("INV1".to_string()));
        assert_eq!(json_id(&serde_json::json!(4521)), Some("4521".to_string()));
        assert_eq!(json_id(&serde_json::json!("")), None);
        assert_eq!(json_id(&serde_json::json!(null)), None);
        assert_eq!(json_id(&serde_json::json!({})), None);
    }

    #[test]
    fn test_client_url_normalization() {
        let client = NowPaymentsClient::new(
            "https://api.nowpayments.io/",
            "key".to_string(),
            "https://pay.example.com/api/webhooks/nowpayments".to_string(),
            "https://app.example.com/ok".to_string(),
            "https://app.example.com/cancel".to_string(),
        );
        assert_eq!(client.base_url(), "https://api.nowpayments.io");
    }
}
