//! Structured Logging for the Fundgate Service
//!
//! Provides tracing-based logging with env-filter support and optional JSON
//! output for log aggregation services.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fundgate::logging::init_logging;
//!
//! // Initialize at startup; JSON mode for production
//! init_logging("info", true).unwrap();
//! ```

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Initialize the global tracing subscriber.
///
/// `level` is an env-filter directive (e.g. "info" or "fundgate=debug");
/// `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str, json: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_failure() {
        // First init may succeed or fail depending on test ordering; the
        // second must fail because the global subscriber is already set.
        let _ = init_logging("info", false);
        assert!(init_logging("info", false).is_err());
    }
}
