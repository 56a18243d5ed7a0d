//! Mail Delivery
//!
//! HTTP client for the Resend transactional email API, behind a `Mailer`
//! trait so the rest of the service never depends on the provider. Delivery
//! is best-effort everywhere: no deposit or investment operation fails
//! because an email did not go out.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Per-request timeout for provider calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resend API endpoint
const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The provider rejected the message; retrying the same message will fail
    #[error("mail provider rejected message: {0}")]
    ProviderRejected(String),

    /// Transport failure or provider outage; retryable
    #[error("mail delivery failed: {0}")]
    DeliveryFailed(String),
}

impl NotifyError {
    /// Whether a retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::DeliveryFailed(_))
    }
}

/// A rendered email ready for delivery
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail delivery interface
///
/// Implementations:
/// - `ResendMailer` - Production delivery via the Resend API
/// - `NullMailer` - Logs and drops, used when no API key is configured
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a single email
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

/// Resend HTTP mailer
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    /// Create a new mailer sending from the given address
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let body = SendRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let resp = self
            .client
            .post(RESEND_API_URL)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(NotifyError::ProviderRejected(format!("{} {}", status, text)))
        } else {
            Err(NotifyError::DeliveryFailed(format!("{} {}", status, text)))
        }
    }
}

/// No-op mailer used when no provider key is configured.
///
/// Keeps the rest of the service unchanged in development environments.
#[derive(Debug, Clone, Default)]
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        info!(to = %email.to, subject = %email.subject, "mail delivery disabled, dropping email");
        Ok(())
    }
}
