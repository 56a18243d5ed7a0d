//! In-Memory Storage Implementations
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the service restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{
    BalanceLedger, DepositStore, InvestmentStore, LedgerError, StorageError, StorageResult,
    TransitionOutcome,
};
use crate::types::{unix_now, DepositRecord, DepositStatus, InvestmentRecord, InvestmentStatus};

#[derive(Default)]
struct Inner {
    /// Deposit records indexed by deposit ID
    deposits: HashMap<String, DepositRecord>,
    /// Index: processor invoice ID -> deposit ID
    by_invoice: HashMap<String, String>,
    /// Account balances in cents
    balances: HashMap<String, u64>,
    /// Investment records indexed by investment ID
    investments: HashMap<String, InvestmentRecord>,
}

/// In-memory store implementing all storage traits
///
/// All mutating operations take the write lock for their full duration, which
/// gives the same per-operation atomicity the SQLite statements provide.
#[derive(Clone)]
pub struct MemoryStores {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStores {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for MemoryStores {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DepositStore for MemoryStores {
    async fn insert(&self, record: &DepositRecord) -> StorageResult<()> {
        let mut inner = self.inner.write().await;

        if inner.deposits.contains_key(&record.id) {
            return Err(StorageError::Duplicate(record.id.clone()));
        }
        if inner.by_invoice.contains_key(&record.invoice_id) {
            return Err(StorageError::Duplicate(record.invoice_id.clone()));
        }

        inner
            .by_invoice
            .insert(record.invoice_id.clone(), record.id.clone());
        inner.deposits.insert(record.id.clone(), record.clone());

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<DepositRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.deposits.get(id).cloned())
    }

    async fn get_by_invoice_id(&self, invoice_id: &str) -> StorageResult<Option<DepositRecord>> {
        let inner = self.inner.read().await;
        let id = match inner.by_invoice.get(invoice_id) {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(inner.deposits.get(id).cloned())
    }

    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<DepositRecord>> {
        let inner = self.inner.read().await;

        let mut records: Vec<DepositRecord> = inner
            .deposits
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(records)
    }

    async fn transition(
        &self,
        id: &str,
        new_status: DepositStatus,
        payment_id: Option<&str>,
        paid_amount: Option<f64>,
    ) -> StorageResult<TransitionOutcome> {
        let mut inner = self.inner.write().await;

        let record = match inner.deposits.get_mut(id) {
            Some(record) => record,
            None => return Ok(TransitionOutcome::NotFound),
        };

        if let Some(payment_id) = payment_id {
            record.payment_id = Some(payment_id.to_string());
        }
        if let Some(paid_amount) = paid_amount {
            record.paid_amount = Some(paid_amount);
        }

        if record.status.can_transition(new_status) {
            record.status = new_status;
            record.updated_at = unix_now();
            Ok(TransitionOutcome::Applied)
        } else {
            Ok(TransitionOutcome::NoOp)
        }
    }

    async fn revert_confirmation(&self, id: &str, to: DepositStatus) -> StorageResult<()> {
        if to.is_terminal() {
            return Err(StorageError::InvalidData(format!(
                "cannot revert confirmation to terminal status {}",
                to
            )));
        }

        let mut inner = self.inner.write().await;

        let record = inner
            .deposits
            .get_mut(id)
            .filter(|r| r.status == DepositStatus::Confirmed)
            .ok_or_else(|| StorageError::NotFound(format!("confirmed deposit {}", id)))?;

        record.status = to;
        record.updated_at = unix_now();

        Ok(())
    }
}

#[async_trait]
impl BalanceLedger for MemoryStores {
    async fn create_account(&self, account_id: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner.balances.entry(account_id.to_string()).or_insert(0);
        Ok(())
    }

    async fn balance_of(&self, account_id: &str) -> Result<u64, LedgerError> {
        let inner = self.inner.read().await;
        inner
            .balances
            .get(account_id)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    async fn credit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        if amount_cents == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut inner = self.inner.write().await;
        let balance = inner
            .balances
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        *balance += amount_cents;
        Ok(*balance)
    }

    async fn debit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        if amount_cents == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut inner = self.inner.write().await;
        let balance = inner
            .balances
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        if *balance < amount_cents {
            return Err(LedgerError::InsufficientFunds {
                requested: amount_cents,
                available: *balance,
            });
        }

        *balance -= amount_cents;
        Ok(*balance)
    }
}

#[async_trait]
impl InvestmentStore for MemoryStores {
    async fn create_funded(&self, record: &InvestmentRecord) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;

        if inner.investments.contains_key(&record.id) {
            return Err(StorageError::Duplicate(record.id.clone()).into());
        }

        let balance = inner
            .balances
            .get_mut(&record.account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(record.account_id.clone()))?;

        if *balance < record.principal_cents {
            return Err(LedgerError::InsufficientFunds {
                requested: record.principal_cents,
                available: *balance,
            });
        }

        *balance -= record.principal_cents;
        inner.investments.insert(record.id.clone(), record.clone());

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<InvestmentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.investments.get(id).cloned())
    }

    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<InvestmentRecord>> {
        let inner = self.inner.read().await;

        let mut records: Vec<InvestmentRecord> = inner
            .investments
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(records)
    }

    async fn complete(&self, id: &str, earned_cents: u64) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;

        let (account_id, principal_cents) = {
            let record = inner
                .investments
                .get_mut(id)
                .filter(|r| r.status == InvestmentStatus::Active)
                .ok_or_else(|| {
                    LedgerError::Storage(StorageError::NotFound(format!(
                        "active investment {}",
                        id
                    )))
                })?;

            record.status = InvestmentStatus::Completed;
            record.earned_cents = earned_cents;
            record.updated_at = unix_now();

            (record.account_id.clone(), record.principal_cents)
        };

        let balance = inner
            .balances
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        *balance += principal_cents + earned_cents;

        Ok(())
    }
}
