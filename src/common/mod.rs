//! Common Infrastructure Module
//!
//! Shared error types for the fundgate service. Configuration and logging
//! live in their own top-level modules.

pub mod error;

// Re-exports for convenience
pub use error::{FundgateError, Result};
