//! Common Error Types for the Fundgate Service
//!
//! Provides unified error handling across all modules.

use thiserror::Error;

/// Root error type for the fundgate service
#[derive(Debug, Error)]
pub enum FundgateError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// Payment gateway errors
    #[error("gateway error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Balance ledger errors
    #[error("ledger error: {0}")]
    Ledger(#[from] crate::storage::LedgerError),

    /// Deposit lifecycle errors
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    /// Notification errors
    #[error("notification error: {0}")]
    Notify(#[from] crate::notify::NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FundgateError {
    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            FundgateError::Gateway(e) => e.is_retryable(),
            FundgateError::Storage(_) | FundgateError::Io(_) => true,
            FundgateError::Notify(crate::notify::NotifyError::DeliveryFailed(_)) => true,
            _ => false,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            FundgateError::Config(_) => "CONFIG_ERROR",
            FundgateError::Logging(_) => "LOGGING_ERROR",
            FundgateError::Gateway(_) => "GATEWAY_ERROR",
            FundgateError::Storage(_) => "STORAGE_ERROR",
            FundgateError::Ledger(_) => "LEDGER_ERROR",
            FundgateError::Lifecycle(_) => "LIFECYCLE_ERROR",
            FundgateError::Notify(_) => "NOTIFY_ERROR",
            FundgateError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using FundgateError
pub type Result<T> = std::result::Result<T, FundgateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;

    #[test]
    fn test_error_codes() {
        let err = FundgateError::Gateway(GatewayError::Unavailable("connection refused".into()));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.error_code(), "GATEWAY_ERROR");
    }

    #[test]
    fn test_retryable_errors() {
        let transient = FundgateError::Gateway(GatewayError::Unavailable("timeout".into()));
        assert!(transient.is_retryable());

        let permanent = FundgateError::Gateway(GatewayError::PaymentNotFound("p1".into()));
        assert!(!permanent.is_retryable());
    }
}
