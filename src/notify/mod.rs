//! Notification Module
//!
//! Best-effort transactional email. Delivery runs detached from the request
//! that triggered it; failures are logged, never propagated.
//!
//! This module contains:
//! - The `Mailer` trait and the Resend implementation
//! - HTML templates for the emails the service sends
//! - The `Notifier` front-end used by the API layer

pub mod mailer;
pub mod templates;

use std::sync::Arc;
use tracing::warn;

pub use mailer::{Email, Mailer, NotifyError, NullMailer, ResendMailer};

#[cfg(test)]
pub use mailer::MockMailer;

/// Notification front-end
///
/// Owns the mailer and spawns deliveries so callers never wait on the
/// provider.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    /// Create a notifier over the given mailer
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Queue an email for delivery and return immediately.
    ///
    /// The delivery outcome is logged; the caller has already answered its
    /// own request by the time the provider responds.
    pub fn send_detached(&self, email: Email) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&email).await {
                warn!(to = %email.to, error = %e, "email delivery failed");
            }
        });
    }

    /// Deliver an email and wait for the outcome (used in tests and by
    /// callers that need the result)
    pub async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        self.mailer.send(email).await
    }
}
