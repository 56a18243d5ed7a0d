//! Environment-based Configuration for the Fundgate Service
//!
//! All sensitive values (API keys) MUST come from environment variables,
//! never from hardcoded values.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FUNDGATE_NOWPAYMENTS_API_KEY` - NOWPayments API key
//!
//! ## Optional
//! - `FUNDGATE_API_PORT` - REST API port (default: 3001)
//! - `FUNDGATE_DB_PATH` - SQLite database path (default: "data/fundgate.db")
//! - `FUNDGATE_NOWPAYMENTS_API_URL` - Processor base URL
//!   (default: "https://api.nowpayments.io")
//! - `FUNDGATE_PUBLIC_URL` - Public base URL of this service, used to build
//!   the IPN callback URL (default: "http://localhost:3001")
//! - `FUNDGATE_SITE_URL` - Front-end base URL for success/cancel redirects
//!   and email links (default: same as public URL)
//! - `FUNDGATE_MIN_DEPOSIT_CENTS` - Minimum deposit (default: 1000 = $10)
//! - `FUNDGATE_RESEND_API_KEY` - Resend API key; email is disabled if unset
//! - `FUNDGATE_EMAIL_FROM` - Sender address for outbound email
//! - `FUNDGATE_LOG_LEVEL` - Logging level (default: "info")
//! - `FUNDGATE_LOG_JSON` - Set to "1" for JSON log output

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct FundgateConfig {
    /// REST API port
    pub api_port: u16,

    /// SQLite database path
    pub db_path: String,

    /// NOWPayments API key
    pub nowpayments_api_key: String,

    /// NOWPayments base URL
    pub nowpayments_api_url: String,

    /// Public base URL of this service (for the IPN callback)
    pub public_url: String,

    /// Front-end base URL (for redirects and email links)
    pub site_url: String,

    /// Minimum deposit in cents
    pub min_deposit_cents: u64,

    /// Resend API key; None disables outbound email
    pub resend_api_key: Option<String>,

    /// Sender address for outbound email
    pub email_from: String,

    /// Log level
    pub log_level: String,

    /// Whether to emit JSON logs
    pub log_json: bool,
}

impl FundgateConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_port = parse_env_or("FUNDGATE_API_PORT", 3001u16)?;

        let db_path =
            env::var("FUNDGATE_DB_PATH").unwrap_or_else(|_| "data/fundgate.db".to_string());

        let nowpayments_api_key = env::var("FUNDGATE_NOWPAYMENTS_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("FUNDGATE_NOWPAYMENTS_API_KEY".to_string()))?;

        let nowpayments_api_url = env::var("FUNDGATE_NOWPAYMENTS_API_URL")
            .unwrap_or_else(|_| "https://api.nowpayments.io".to_string());

        let public_url = env::var("FUNDGATE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", api_port));

        let site_url = env::var("FUNDGATE_SITE_URL").unwrap_or_else(|_| public_url.clone());

        let min_deposit_cents = parse_env_or("FUNDGATE_MIN_DEPOSIT_CENTS", 1_000u64)?;
        if min_deposit_cents == 0 {
            return Err(ConfigError::InvalidValue(
                "FUNDGATE_MIN_DEPOSIT_CENTS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let resend_api_key = env::var("FUNDGATE_RESEND_API_KEY").ok();

        let email_from = env::var("FUNDGATE_EMAIL_FROM")
            .unwrap_or_else(|_| "Fundgate <onboarding@resend.dev>".to_string());

        let log_level = env::var("FUNDGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("FUNDGATE_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        Ok(Self {
            api_port,
            db_path,
            nowpayments_api_key,
            nowpayments_api_url,
            public_url,
            site_url,
            min_deposit_cents,
            resend_api_key,
            email_from,
            log_level,
            log_json,
        })
    }

    /// IPN callback URL handed to the processor at invoice creation
    pub fn ipn_callback_url(&self) -> String {
        format!(
            "{}/api/webhooks/nowpayments",
            self.public_url.trim_end_matches('/')
        )
    }

    /// Redirect URL for a completed checkout
    pub fn success_url(&self) -> String {
        format!(
            "{}/dashboard/wallet?status=success",
            self.site_url.trim_end_matches('/')
        )
    }

    /// Redirect URL for a cancelled checkout
    pub fn cancel_url(&self) -> String {
        format!(
            "{}/dashboard/wallet?status=cancelled",
            self.site_url.trim_end_matches('/')
        )
    }
}

/// Parse an env var into `T`, falling back to `default` when unset
fn parse_env_or<T: std::str::FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("cannot parse: {}", value))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FundgateConfig {
        FundgateConfig {
            api_port: 3001,
            db_path: ":memory:".to_string(),
            nowpayments_api_key: "key".to_string(),
            nowpayments_api_url: "https://api.nowpayments.io".to_string(),
            public_url: "https://pay.example.com/".to_string(),
            site_url: "https://app.example.com".to_string(),
            min_deposit_cents: 1_000,
            resend_api_key: None,
            email_from: "Fundgate <noreply@example.com>".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    #[test]
    fn test_callback_urls() {
        let config = test_config();
        assert_eq!(
            config.ipn_callback_url(),
            "https://pay.example.com/api/webhooks/nowpayments"
        );
        assert_eq!(
            config.success_url(),
            "https://app.example.com/dashboard/wallet?status=success"
        );
        assert_eq!(
            config.cancel_url(),
            "https://app.example.com/dashboard/wallet?status=cancelled"
        );
    }
}
