//! SQLite Persistent Storage
//!
//! Durable storage for deposits, balances and investments that survives
//! service restarts. Uses connection pooling via r2d2 for concurrent access.
//!
//! The two correctness-critical operations live here as single SQL
//! statements, so SQLite's per-statement atomicity provides the per-record
//! linearization the lifecycle relies on:
//! - the conditional deposit status transition (`WHERE status IN (...)`)
//! - the guarded balance debit (`WHERE balance_cents >= ?`)

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use super::traits::{
    BalanceLedger, DepositStore, InvestmentStore, LedgerError, StorageError, StorageResult,
    TransitionOutcome,
};
use crate::types::{unix_now, DepositRecord, DepositStatus, InvestmentRecord, InvestmentStatus};

/// SQLite-backed store implementing all storage traits
pub struct SqliteStores {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStores {
    /// Create a new store with the given database path
    ///
    /// Creates the database file and runs migrations if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Get a connection from the pool
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS deposits (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                pay_currency TEXT NOT NULL,
                payment_id TEXT,
                invoice_id TEXT NOT NULL UNIQUE,
                invoice_url TEXT NOT NULL,
                paid_amount REAL,
                status TEXT NOT NULL DEFAULT 'waiting',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_deposits_account ON deposits(account_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_deposits_invoice ON deposits(invoice_id);

            CREATE TABLE IF NOT EXISTS balances (
                account_id TEXT PRIMARY KEY,
                balance_cents INTEGER NOT NULL DEFAULT 0 CHECK (balance_cents >= 0),
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS investments (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                plan_id TEXT NOT NULL,
                plan_name TEXT NOT NULL,
                principal_cents INTEGER NOT NULL,
                roi_bps INTEGER NOT NULL,
                duration_days INTEGER NOT NULL,
                start_at INTEGER NOT NULL,
                end_at INTEGER NOT NULL,
                earned_cents INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_investments_account ON investments(account_id, created_at);
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    /// Convert a database row to DepositRecord
    fn row_to_deposit(row: &rusqlite::Row) -> rusqlite::Result<DepositRecord> {
        let status_str: String = row.get("status")?;
        let status = status_str.parse().unwrap_or(DepositStatus::Waiting);
        let currency_str: String = row.get("pay_currency")?;
        let pay_currency = currency_str.parse().unwrap_or(crate::types::PayCurrency::Btc);

        Ok(DepositRecord {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            amount_cents: row.get::<_, i64>("amount_cents")? as u64,
            pay_currency,
            payment_id: row.get("payment_id")?,
            invoice_id: row.get("invoice_id")?,
            invoice_url: row.get("invoice_url")?,
            paid_amount: row.get("paid_amount")?,
            status,
            created_at: row.get::<_, i64>("created_at")? as u64,
            updated_at: row.get::<_, i64>("updated_at")? as u64,
        })
    }

    /// Convert a database row to InvestmentRecord
    fn row_to_investment(row: &rusqlite::Row) -> rusqlite::Result<InvestmentRecord> {
        let status_str: String = row.get("status")?;
        let status = status_str.parse().unwrap_or(InvestmentStatus::Active);

        Ok(InvestmentRecord {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            plan_id: row.get("plan_id")?,
            plan_name: row.get("plan_name")?,
            principal_cents: row.get::<_, i64>("principal_cents")? as u64,
            roi_bps: row.get::<_, i64>("roi_bps")? as u32,
            duration_days: row.get::<_, i64>("duration_days")? as u32,
            start_at: row.get::<_, i64>("start_at")? as u64,
            end_at: row.get::<_, i64>("end_at")? as u64,
            earned_cents: row.get::<_, i64>("earned_cents")? as u64,
            status,
            created_at: row.get::<_, i64>("created_at")? as u64,
            updated_at: row.get::<_, i64>("updated_at")? as u64,
        })
    }

    // Synchronous helpers for the trait implementations

    fn insert_deposit_sync(&self, record: &DepositRecord) -> StorageResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO deposits (
                id, account_id, amount_cents, pay_currency, payment_id,
                invoice_id, invoice_url, paid_amount, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.id,
                record.account_id,
                record.amount_cents as i64,
                record.pay_currency.to_string(),
                record.payment_id,
                record.invoice_id,
                record.invoice_url,
                record.paid_amount,
                record.status.to_string(),
                record.created_at as i64,
                record.updated_at as i64,
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.extended_code == 1555 || err.extended_code == 2067 {
                    return StorageError::Duplicate(record.invoice_id.clone());
                }
            }
            StorageError::Database(e.to_string())
        })?;

        Ok(())
    }

    fn get_deposit_by_id_sync(&self, id: &str) -> StorageResult<Option<DepositRecord>> {
        let conn = self.conn()?;

        conn.query_row("SELECT * FROM deposits WHERE id = ?1", params![id], |row| {
            Self::row_to_deposit(row)
        })
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn get_deposit_by_invoice_sync(&self, invoice_id: &str) -> StorageResult<Option<DepositRecord>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT * FROM deposits WHERE invoice_id = ?1",
            params![invoice_id],
            |row| Self::row_to_deposit(row),
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn get_deposits_for_account_sync(&self, account_id: &str) -> StorageResult<Vec<DepositRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT * FROM deposits WHERE account_id = ?1 ORDER BY created_at DESC, id DESC")
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let records = stmt
            .query_map(params![account_id], |row| Self::row_to_deposit(row))
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(records)
    }

    fn transition_sync(
        &self,
        id: &str,
        new_status: DepositStatus,
        payment_id: Option<&str>,
        paid_amount: Option<f64>,
    ) -> StorageResult<TransitionOutcome> {
        let conn = self.conn()?;

        let predecessors = DepositStatus::predecessors(new_status);
        if !predecessors.is_empty() {
            // Status strings come from the internal enum, never from input.
            let allowed = predecessors
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ");

            let sql = format!(
                r#"
                UPDATE deposits SET
                    status = ?2,
                    payment_id = COALESCE(?3, payment_id),
                    paid_amount = COALESCE(?4, paid_amount),
                    updated_at = ?5
                WHERE id = ?1 AND status IN ({})
                "#,
                allowed
            );

            let rows = conn
                .execute(
                    &sql,
                    params![
                        id,
                        new_status.to_string(),
                        payment_id,
                        paid_amount,
                        unix_now() as i64
                    ],
                )
                .map_err(|e| StorageError::Database(e.to_string()))?;

            if rows > 0 {
                return Ok(TransitionOutcome::Applied);
            }
        }

        // Not a forward move. Keep processor metadata anyway; a duplicate
        // delivery may still carry a payment id the record never saw.
        let rows = conn
            .execute(
                r#"
                UPDATE deposits SET
                    payment_id = COALESCE(?2, payment_id),
                    paid_amount = COALESCE(?3, paid_amount)
                WHERE id = ?1
                "#,
                params![id, payment_id, paid_amount],
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if rows == 0 {
            Ok(TransitionOutcome::NotFound)
        } else {
            Ok(TransitionOutcome::NoOp)
        }
    }

    fn revert_confirmation_sync(&self, id: &str, to: DepositStatus) -> StorageResult<()> {
        if to.is_terminal() {
            return Err(StorageError::InvalidData(format!(
                "cannot revert confirmation to terminal status {}",
                to
            )));
        }

        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE deposits SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'confirmed'",
                params![id, to.to_string(), unix_now() as i64],
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if rows == 0 {
            return Err(StorageError::NotFound(format!("confirmed deposit {}", id)));
        }

        Ok(())
    }

    fn create_account_sync(&self, account_id: &str) -> StorageResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO balances (account_id, balance_cents, updated_at)
            VALUES (?1, 0, ?2)
            ON CONFLICT(account_id) DO NOTHING
            "#,
            params![account_id, unix_now() as i64],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    fn balance_of_sync(&self, account_id: &str) -> Result<u64, LedgerError> {
        let conn = self.conn()?;

        let balance: Option<i64> = conn
            .query_row(
                "SELECT balance_cents FROM balances WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        balance
            .map(|b| b as u64)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    fn credit_sync(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        if amount_cents == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let conn = self.conn()?;

        let balance: Option<i64> = conn
            .query_row(
                r#"
                UPDATE balances SET balance_cents = balance_cents + ?2, updated_at = ?3
                WHERE account_id = ?1
                RETURNING balance_cents
                "#,
                params![account_id, amount_cents as i64, unix_now() as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        balance
            .map(|b| b as u64)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    fn debit_sync(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        if amount_cents == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let conn = self.conn()?;

        let balance: Option<i64> = conn
            .query_row(
                r#"
                UPDATE balances SET balance_cents = balance_cents - ?2, updated_at = ?3
                WHERE account_id = ?1 AND balance_cents >= ?2
                RETURNING balance_cents
                "#,
                params![account_id, amount_cents as i64, unix_now() as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if let Some(balance) = balance {
            return Ok(balance as u64);
        }

        // Guard did not match: distinguish a missing account from a shortfall.
        // Release this connection first so balance_of_sync can get one from
        // the pool (the in-memory pool has a single connection).
        drop(conn);
        let available = self.balance_of_sync(account_id)?;
        Err(LedgerError::InsufficientFunds {
            requested: amount_cents,
            available,
        })
    }

    fn create_funded_sync(&self, record: &InvestmentRecord) -> Result<(), LedgerError> {
        let mut conn = self.conn()?;

        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let debited: Option<i64> = tx
            .query_row(
                r#"
                UPDATE balances SET balance_cents = balance_cents - ?2, updated_at = ?3
                WHERE account_id = ?1 AND balance_cents >= ?2
                RETURNING balance_cents
                "#,
                params![
                    record.account_id,
                    record.principal_cents as i64,
                    unix_now() as i64
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if debited.is_none() {
            let available: Option<i64> = tx
                .query_row(
                    "SELECT balance_cents FROM balances WHERE account_id = ?1",
                    params![record.account_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StorageError::Database(e.to_string()))?;

            // Dropping the transaction rolls back.
            return Err(match available {
                None => LedgerError::AccountNotFound(record.account_id.clone()),
                Some(available) => LedgerError::InsufficientFunds {
                    requested: record.principal_cents,
                    available: available as u64,
                },
            });
        }

        tx.execute(
            r#"
            INSERT INTO investments (
                id, account_id, plan_id, plan_name, principal_cents, roi_bps,
                duration_days, start_at, end_at, earned_cents, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.id,
                record.account_id,
                record.plan_id,
                record.plan_name,
                record.principal_cents as i64,
                record.roi_bps as i64,
                record.duration_days as i64,
                record.start_at as i64,
                record.end_at as i64,
                record.earned_cents as i64,
                record.status.to_string(),
                record.created_at as i64,
                record.updated_at as i64,
            ],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_investment_by_id_sync(&self, id: &str) -> StorageResult<Option<InvestmentRecord>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT * FROM investments WHERE id = ?1",
            params![id],
            |row| Self::row_to_investment(row),
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn get_investments_for_account_sync(
        &self,
        account_id: &str,
    ) -> StorageResult<Vec<InvestmentRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT * FROM investments WHERE account_id = ?1 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let records = stmt
            .query_map(params![account_id], |row| Self::row_to_investment(row))
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(records)
    }

    fn complete_sync(&self, id: &str, earned_cents: u64) -> Result<(), LedgerError> {
        let mut conn = self.conn()?;

        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let completed: Option<(String, i64)> = tx
            .query_row(
                r#"
                UPDATE investments SET status = 'completed', earned_cents = ?2, updated_at = ?3
                WHERE id = ?1 AND status = 'active'
                RETURNING account_id, principal_cents
                "#,
                params![id, earned_cents as i64, unix_now() as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let (account_id, principal_cents) = completed.ok_or_else(|| {
            LedgerError::Storage(StorageError::NotFound(format!("active investment {}", id)))
        })?;

        let rows = tx
            .execute(
                "UPDATE balances SET balance_cents = balance_cents + ?2, updated_at = ?3 WHERE account_id = ?1",
                params![
                    account_id,
                    principal_cents + earned_cents as i64,
                    unix_now() as i64
                ],
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if rows == 0 {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        tx.commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DepositStore for SqliteStores {
    async fn insert(&self, record: &DepositRecord) -> StorageResult<()> {
        self.insert_deposit_sync(record)
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<DepositRecord>> {
        self.get_deposit_by_id_sync(id)
    }

    async fn get_by_invoice_id(&self, invoice_id: &str) -> StorageResult<Option<DepositRecord>> {
        self.get_deposit_by_invoice_sync(invoice_id)
    }

    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<DepositRecord>> {
        self.get_deposits_for_account_sync(account_id)
    }

    async fn transition(
        &self,
        id: &str,
        new_status: DepositStatus,
        payment_id: Option<&str>,
        paid_amount: Option<f64>,
    ) -> StorageResult<TransitionOutcome> {
        self.transition_sync(id, new_status, payment_id, paid_amount)
    }

    async fn revert_confirmation(&self, id: &str, to: DepositStatus) -> StorageResult<()> {
        self.revert_confirmation_sync(id, to)
    }
}

#[async_trait]
impl BalanceLedger for SqliteStores {
    async fn create_account(&self, account_id: &str) -> StorageResult<()> {
        self.create_account_sync(account_id)
    }

    async fn balance_of(&self, account_id: &str) -> Result<u64, LedgerError> {
        self.balance_of_sync(account_id)
    }

    async fn credit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        self.credit_sync(account_id, amount_cents)
    }

    async fn debit(&self, account_id: &str, amount_cents: u64) -> Result<u64, LedgerError> {
        self.debit_sync(account_id, amount_cents)
    }
}

#[async_trait]
impl InvestmentStore for SqliteStores {
    async fn create_funded(&self, record: &InvestmentRecord) -> Result<(), LedgerError> {
        self.create_funded_sync(record)
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<InvestmentRecord>> {
        self.get_investment_by_id_sync(id)
    }

    async fn get_for_account(&self, account_id: &str) -> StorageResult<Vec<InvestmentRecord>> {
        self.get_investments_for_account_sync(account_id)
    }

    async fn complete(&self, id: &str, earned_cents: u64) -> Result<(), LedgerError> {
        self.complete_sync(id, earned_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PayCurrency;
    use std::sync::Arc;

    fn test_deposit(id: &str, invoice_id: &str) -> DepositRecord {
        let mut record = DepositRecord::new(
            "acct_1".to_string(),
            10_000,
            PayCurrency::Btc,
            invoice_id.to_string(),
            format!("https://pay.example/{}", invoice_id),
        );
        record.id = id.to_string();
        record
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteStores::in_memory().unwrap();
        let record = test_deposit("dep_1", "INV1");

        store.insert(&record).await.unwrap();

        let by_id = DepositStore::get_by_id(&store, "dep_1").await.unwrap().unwrap();
        assert_eq!(by_id.invoice_id, "INV1");
        assert_eq!(by_id.status, DepositStatus::Waiting);

        let by_invoice = store.get_by_invoice_id("INV1").await.unwrap().unwrap();
        assert_eq!(by_invoice.id, "dep_1");
    }

    #[tokio::test]
    async fn test_duplicate_invoice_id() {
        let store = SqliteStores::in_memory().unwrap();

        store.insert(&test_deposit("dep_1", "INV1")).await.unwrap();
        let result = store.insert(&test_deposit("dep_2", "INV1")).await;

        assert!(matches!(result, Err(StorageError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_get_for_account_newest_first() {
        let store = SqliteStores::in_memory().unwrap();

        let mut older = test_deposit("dep_1", "INV1");
        older.created_at -= 100;
        let newer = test_deposit("dep_2", "INV2");

        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();

        let deposits = DepositStore::get_for_account(&store, "acct_1").await.unwrap();
        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].id, "dep_2");
        assert_eq!(deposits[1].id, "dep_1");
    }

    #[tokio::test]
    async fn test_transition_forward_and_duplicate() {
        let store = SqliteStores::in_memory().unwrap();
        store.insert(&test_deposit("dep_1", "INV1")).await.unwrap();

        let first = store
            .transition("dep_1", DepositStatus::Confirmed, Some("pay_1"), Some(0.0021))
            .await
            .unwrap();
        assert_eq!(first, TransitionOutcome::Applied);

        // Duplicate delivery of the same terminal status is a no-op
        let second = store
            .transition("dep_1", DepositStatus::Confirmed, Some("pay_1"), Some(0.0021))
            .await
            .unwrap();
        assert_eq!(second, TransitionOutcome::NoOp);

        let record = DepositStore::get_by_id(&store, "dep_1").await.unwrap().unwrap();
        assert_eq!(record.status, DepositStatus::Confirmed);
        assert_eq!(record.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(record.paid_amount, Some(0.0021));
    }

    #[tokio::test]
    async fn test_transition_never_moves_backward() {
        let store = SqliteStores::in_memory().unwrap();
        store.insert(&test_deposit("dep_1", "INV1")).await.unwrap();

        store
            .transition("dep_1", DepositStatus::Confirming, None, None)
            .await
            .unwrap();

        let outcome = store
            .transition("dep_1", DepositStatus::Waiting, None, None)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NoOp);

        let record = DepositStore::get_by_id(&store, "dep_1").await.unwrap().unwrap();
        assert_eq!(record.status, DepositStatus::Confirming);
    }

    #[tokio::test]
    async fn test_terminal_records_stay_terminal() {
        let store = SqliteStores::in_memory().unwrap();
        store.insert(&test_deposit("dep_1", "INV1")).await.unwrap();

        store
            .transition("dep_1", DepositStatus::Expired, None, None)
            .await
            .unwrap();

        for target in [
            DepositStatus::Waiting,
            DepositStatus::Confirming,
            DepositStatus::Confirmed,
            DepositStatus::Failed,
        ] {
            let outcome = store.transition("dep_1", target, None, None).await.unwrap();
            assert_eq!(outcome, TransitionOutcome::NoOp);
        }

        let record = DepositStore::get_by_id(&store, "dep_1").await.unwrap().unwrap();
        assert_eq!(record.status, DepositStatus::Expired);
    }

    #[tokio::test]
    async fn test_transition_unknown_id() {
        let store = SqliteStores::in_memory().unwrap();
        let outcome = store
            .transition("missing", DepositStatus::Confirmed, None, None)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_revert_confirmation() {
        let store = SqliteStores::in_memory().unwrap();
        store.insert(&test_deposit("dep_1", "INV1")).await.unwrap();

        store
            .transition("dep_1", DepositStatus::Confirmed, None, None)
            .await
            .unwrap();
        store
            .revert_confirmation("dep_1", DepositStatus::Waiting)
            .await
            .unwrap();

        let record = DepositStore::get_by_id(&store, "dep_1").await.unwrap().unwrap();
        assert_eq!(record.status, DepositStatus::Waiting);

        // Record is no longer confirmed, so a second revert fails
        let result = store
            .revert_confirmation("dep_1", DepositStatus::Waiting)
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ledger_credit_and_debit() {
        let store = SqliteStores::in_memory().unwrap();
        store.create_account("acct_1").await.unwrap();

        assert_eq!(store.credit("acct_1", 10_000).await.unwrap(), 10_000);
        assert_eq!(store.debit("acct_1", 4_000).await.unwrap(), 6_000);
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 6_000);
    }

    #[tokio::test]
    async fn test_ledger_insufficient_funds_leaves_balance_unchanged() {
        let store = SqliteStores::in_memory().unwrap();
        store.create_account("acct_1").await.unwrap();
        store.credit("acct_1", 5_000).await.unwrap();

        let result = store.debit("acct_1", 6_000).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                requested: 6_000,
                available: 5_000
            })
        ));
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_ledger_unknown_account_and_invalid_amount() {
        let store = SqliteStores::in_memory().unwrap();

        assert!(matches!(
            store.credit("nobody", 100).await,
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(matches!(
            store.debit("nobody", 100).await,
            Err(LedgerError::AccountNotFound(_))
        ));

        store.create_account("acct_1").await.unwrap();
        assert!(matches!(
            store.credit("acct_1", 0).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            store.debit("acct_1", 0).await,
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_create_account_is_idempotent() {
        let store = SqliteStores::in_memory().unwrap();
        store.create_account("acct_1").await.unwrap();
        store.credit("acct_1", 1_000).await.unwrap();

        // Re-creating must not reset the balance
        store.create_account("acct_1").await.unwrap();
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 1_000);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_credits_are_not_lost() {
        let store = Arc::new(SqliteStores::in_memory().unwrap());
        store.create_account("acct_1").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.credit("acct_1", 250).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.balance_of("acct_1").await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_investment_funding_is_atomic() {
        let store = SqliteStores::in_memory().unwrap();
        store.create_account("acct_1").await.unwrap();
        store.credit("acct_1", 100_000).await.unwrap();

        let record = InvestmentRecord::new(
            "acct_1".to_string(),
            "plan_gold".to_string(),
            "Gold".to_string(),
            60_000,
            150,
            30,
        );
        store.create_funded(&record).await.unwrap();

        assert_eq!(store.balance_of("acct_1").await.unwrap(), 40_000);
        let investments = InvestmentStore::get_for_account(&store, "acct_1").await.unwrap();
        assert_eq!(investments.len(), 1);

        // Second funding exceeds the remaining balance: nothing changes
        let second = InvestmentRecord::new(
            "acct_1".to_string(),
            "plan_gold".to_string(),
            "Gold".to_string(),
            60_000,
            150,
            30,
        );
        let result = store.create_funded(&second).await;
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 40_000);
        assert_eq!(
            InvestmentStore::get_for_account(&store, "acct_1")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_investment_completion_credits_back() {
        let store = SqliteStores::in_memory().unwrap();
        store.create_account("acct_1").await.unwrap();
        store.credit("acct_1", 100_000).await.unwrap();

        let record = InvestmentRecord::new(
            "acct_1".to_string(),
            "plan".to_string(),
            "Plan".to_string(),
            50_000,
            100,
            30,
        );
        store.create_funded(&record).await.unwrap();
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 50_000);

        store.complete(&record.id, 15_000).await.unwrap();
        assert_eq!(store.balance_of("acct_1").await.unwrap(), 115_000);

        let stored = InvestmentStore::get_by_id(&store, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvestmentStatus::Completed);
        assert_eq!(stored.earned_cents, 15_000);

        // Completing twice is rejected
        assert!(store.complete(&record.id, 15_000).await.is_err());
    }
}
