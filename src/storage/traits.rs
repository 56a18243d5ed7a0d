//! Storage Trait Definitions
//!
//! Abstract storage interfaces for deposits, balances and investments.
//! Implementations can use SQLite (production) or in-memory (testing).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{DepositRecord, DepositStatus, InvestmentRecord};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a conditional status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied; this caller observed the status change
    /// first and is responsible for any side effect tied to it.
    Applied,
    /// The record exists but the transition is not a forward move
    /// (duplicate delivery, stale status, or terminal record).
    NoOp,
    /// No record with the given id
    NotFound,
}

/// Deposit storage interface
///
/// Implementations:
/// - `SqliteStores` - Production storage with SQLite
/// - `MemoryStores` - In-memory storage for testing
#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Insert a new deposit record
    async fn insert(&self, record: &DepositRecord) -> StorageResult<()>;

    /// Get a deposit by ID
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<DepositRecord>>;

    /// Get a deposit by processor invoice ID (webhook correlation lookup,
    /// backed by a uniqueness constraint on `invoice_id`)
    async fn get_by_invoice_id(&self, invoice_id: &str) -> StorageResult<Option<DepositRecord>>;

    /// All deposits for an account, newest first
    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<DepositRecord>>;

    /// Conditionally move a deposit to `new_status`.
    ///
    /// The update only applies when the stored status permits the forward
    /// transition; concurrent duplicate updates to the same status are
    /// idempotent no-ops. This is the linearization point that makes the
    /// confirmed-deposit credit exactly-once. `payment_id` and `paid_amount`
    /// are recorded when provided, whether or not the status changes.
    async fn transition(
        &self,
        id: &str,
        new_status: DepositStatus,
        payment_id: Option<&str>,
        paid_amount: Option<f64>,
    ) -> StorageResult<TransitionOutcome>;

    /// Move a deposit back out of `confirmed` after a failed ledger credit,
    /// so a later webhook or poll retries the transition+credit pair.
    async fn revert_confirmation(&self, id: &str, to: DepositStatus) -> StorageResult<()>;
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid amount: must be positive")]
    InvalidAmount,

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("insufficient funds: requested {requested} cents, available {available} cents")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Balance ledger interface
///
/// Credit and debit are logically atomic per account: no interleaved
/// read-modify-write from a concurrent operation on the same account may be
/// lost. Operations on different accounts are independent.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Create an account with a zero balance; a no-op if it already exists
    async fn create_account(&self, account_id: &str) -> StorageResult<()>;

    /// Current balance in cents
    async fn balance_of(&self, account_id: &str) -> Result<u64, LedgerError>;

    /// Atomically add `amount_cents`; returns the new balance
    async fn credit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError>;

    /// Atomically subtract `amount_cents` if covered; returns the new balance
    async fn debit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError>;
}

/// Investment storage interface
#[async_trait]
pub trait InvestmentStore: Send + Sync {
    /// Debit the principal from the owning account's balance and insert the
    /// record as one atomic step; either both happen or neither does.
    async fn create_funded(&self, record: &InvestmentRecord) -> Result<(), LedgerError>;

    /// Get an investment by ID
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<InvestmentRecord>>;

    /// All investments for an account, newest first
    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<InvestmentRecord>>;

    /// Mark an active investment completed and credit principal + earnings
    /// back to the balance, atomically.
    async fn complete(&self, id: &str, earned_cents: u64) -> Result<(), LedgerError>;
}
