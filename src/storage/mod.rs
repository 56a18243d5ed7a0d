//! Storage Layer Module
//!
//! Provides persistence for deposit, balance and investment records.
//!
//! This module contains:
//! - Storage trait definitions for abstraction
//! - SQLite implementation for production
//! - In-memory implementation for testing

pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience
pub use memory::MemoryStores;
pub use sqlite::SqliteStores;
pub use traits::{
    BalanceLedger, DepositStore, InvestmentStore, LedgerError, StorageError, StorageResult,
    TransitionOutcome,
};
