//! Deposit Lifecycle Module
//!
//! Drives deposit records through waiting → confirming → confirmed and owns
//! the exactly-once balance credit on first confirmation.
//!
//! This module contains:
//! - The `DepositService` coordinating gateway, store and ledger
//! - The normalized `ProcessorEvent` parsed from webhook bodies

pub mod event;
pub mod service;

// Re-exports for convenience
pub use event::ProcessorEvent;
pub use service::{DepositService, LifecycleError};
