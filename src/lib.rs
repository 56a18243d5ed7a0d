//! Fundgate - Deposit Lifecycle Reconciliation Service
//!
//! Tracks fiat deposits paid through a crypto payment processor from invoice
//! creation to balance credit:
//!
//! - **gateway**: NOWPayments client and the processor status mapping
//! - **storage**: SQLite and in-memory stores for deposits, balances and
//!   investments
//! - **lifecycle**: the deposit state machine and the exactly-once credit
//! - **notify**: best-effort transactional email via Resend
//! - **api**: the Axum REST surface, including the processor webhook
//!
//! The service holds one invariant above all others: a confirmed deposit
//! credits its account's balance exactly once, no matter how webhooks and
//! polls race or repeat.

pub mod api;
pub mod common;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use common::error::{FundgateError, Result};
pub use config::FundgateConfig;
pub use lifecycle::DepositService;
pub use types::{DepositRecord, DepositStatus};
