//! Deposit Lifecycle Service
//!
//! Coordinates the gateway, the deposit store and the balance ledger through
//! the deposit lifecycle: invoice creation, webhook ingestion, client polling
//! and the exactly-once balance credit on first confirmation.
//!
//! The credit invariant rests on the store's conditional transition: whichever
//! caller (webhook or poll) first moves a record into `confirmed` observes
//! `TransitionOutcome::Applied` and runs the credit; everyone else sees a
//! no-op. If the credit itself fails, the record is moved back out of
//! `confirmed` so a later delivery retries the pair.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::event::ProcessorEvent;
use crate::gateway::{GatewayError, PaymentGateway};
use crate::storage::{
    BalanceLedger, DepositStore, LedgerError, StorageError, TransitionOutcome,
};
use crate::types::{
    units, unix_now, CreateDepositRequest, DepositRecord, DepositStatus, PayCurrency,
};

/// Lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("deposit not found: {0}")]
    NotFound(String),

    #[error("no deposit for invoice: {0}")]
    UnknownInvoice(String),

    #[error("deposit belongs to a different account")]
    Forbidden,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unsupported pay currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid processor event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Deposit lifecycle service
///
/// Generic over trait objects so tests can substitute an in-memory store and
/// a mock gateway.
pub struct DepositService {
    gateway: Arc<dyn PaymentGateway>,
    deposits: Arc<dyn DepositStore>,
    ledger: Arc<dyn BalanceLedger>,
    min_deposit_cents: u64,
}

impl DepositService {
    /// Create a new service
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        deposits: Arc<dyn DepositStore>,
        ledger: Arc<dyn BalanceLedger>,
        min_deposit_cents: u64,
    ) -> Self {
        Self {
            gateway,
            deposits,
            ledger,
            min_deposit_cents,
        }
    }

    /// Initiate a deposit: create a processor invoice, then persist the
    /// record in `waiting`.
    ///
    /// The gateway call happens first; if it fails, no record exists and the
    /// client simply retries. The record is only persisted once the processor
    /// has acknowledged the invoice.
    pub async fn initiate(
        &self,
        account_id: &str,
        request: &CreateDepositRequest,
    ) -> Result<DepositRecord, LifecycleError> {
        let amount_cents = units::usd_to_cents(request.amount_usd)
            .ok_or_else(|| LifecycleError::InvalidAmount(format!("{}", request.amount_usd)))?;

        if amount_cents < self.min_deposit_cents {
            return Err(LifecycleError::InvalidAmount(format!(
                "minimum deposit is {}",
                units::cents_to_display(self.min_deposit_cents)
            )));
        }

        let pay_currency = match &request.pay_currency {
            Some(raw) => raw
                .parse::<PayCurrency>()
                .map_err(|_| LifecycleError::UnsupportedCurrency(raw.clone()))?,
            None => PayCurrency::Btc,
        };

        // The account must exist before a webhook can credit it
        self.ledger.create_account(account_id).await?;

        let order_id = format!("deposit-{}-{}", account_id, unix_now());
        let invoice = self
            .gateway
            .create_invoice(amount_cents, pay_currency, &order_id)
            .await?;

        let record = DepositRecord::new(
            account_id.to_string(),
            amount_cents,
            pay_currency,
            invoice.invoice_id,
            invoice.invoice_url,
        );
        self.deposits.insert(&record).await?;

        info!(
            deposit_id = %record.id,
            account_id = %account_id,
            amount_cents = amount_cents,
            pay_currency = %pay_currency,
            "deposit initiated"
        );

        Ok(record)
    }

    /// Ingest a processor webhook body.
    ///
    /// The caller (webhook handler) acknowledges with 200 regardless of the
    /// outcome; errors returned here are for logging only.
    pub async fn ingest_webhook(&self, payload: &serde_json::Value) -> Result<(), LifecycleError> {
        let event =
            ProcessorEvent::from_value(payload).map_err(LifecycleError::InvalidEvent)?;

        let record = self
            .deposits
            .get_by_invoice_id(&event.invoice_id)
            .await?
            .ok_or_else(|| LifecycleError::UnknownInvoice(event.invoice_id.clone()))?;

        info!(
            deposit_id = %record.id,
            invoice_id = %event.invoice_id,
            status = %event.status,
            "webhook received"
        );

        self.reconcile(
            &record.id,
            event.status,
            event.payment_id.as_deref(),
            event.paid_amount,
        )
        .await
    }

    /// Poll the current state of a deposit on behalf of its owner.
    ///
    /// For non-terminal deposits with a known payment id, the processor is
    /// queried and the answer reconciled before responding. Gateway and
    /// reconciliation failures degrade to the last stored state; polling is
    /// read-mostly and must not fail because the processor is briefly down.
    pub async fn poll(
        &self,
        account_id: &str,
        deposit_id: &str,
    ) -> Result<DepositRecord, LifecycleError> {
        let record = self
            .deposits
            .get_by_id(deposit_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(deposit_id.to_string()))?;

        if record.account_id != account_id {
            return Err(LifecycleError::Forbidden);
        }

        if record.status.is_terminal() {
            return Ok(record);
        }

        let payment_id = match &record.payment_id {
            Some(payment_id) => payment_id.clone(),
            // Nothing to query until the processor has seen a payment
            None => return Ok(record),
        };

        match self.gateway.payment_status(&payment_id).await {
            Ok(status) => {
                if let Err(e) = self
                    .reconcile(deposit_id, status.status, None, status.paid_amount)
                    .await
                {
                    warn!(deposit_id = %deposit_id, error = %e, "poll reconciliation failed");
                }
            }
            Err(e) => {
                warn!(deposit_id = %deposit_id, error = %e, "payment status query failed");
            }
        }

        self.deposits
            .get_by_id(deposit_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(deposit_id.to_string()))
    }

    /// All deposits for an account, newest first
    pub async fn deposits_for(&self, account_id: &str) -> Result<Vec<DepositRecord>, LifecycleError> {
        Ok(self.deposits.get_for_account(account_id).await?)
    }

    /// Apply an observed processor status to a deposit, crediting the balance
    /// when this observation is the first to land on `confirmed`.
    ///
    /// Shared by the webhook and poll paths so both apply identical rules.
    async fn reconcile(
        &self,
        deposit_id: &str,
        status: DepositStatus,
        payment_id: Option<&str>,
        paid_amount: Option<f64>,
    ) -> Result<(), LifecycleError> {
        let outcome = self
            .deposits
            .transition(deposit_id, status, payment_id, paid_amount)
            .await?;

        match outcome {
            TransitionOutcome::NotFound => {
                return Err(LifecycleError::NotFound(deposit_id.to_string()))
            }
            TransitionOutcome::NoOp => return Ok(()),
            TransitionOutcome::Applied => {}
        }

        if status != DepositStatus::Confirmed {
            info!(deposit_id = %deposit_id, status = %status, "deposit status updated");
            return Ok(());
        }

        // This caller won the transition into confirmed; it owns the credit.
        let record = self
            .deposits
            .get_by_id(deposit_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(deposit_id.to_string()))?;

        match self
            .ledger
            .credit(&record.account_id, record.amount_cents)
            .await
        {
            Ok(balance_cents) => {
                info!(
                    deposit_id = %deposit_id,
                    account_id = %record.account_id,
                    amount_cents = record.amount_cents,
                    balance_cents = balance_cents,
                    "deposit confirmed and credited"
                );
                Ok(())
            }
            Err(credit_err) => {
                // Move the record back so the next webhook or poll retries
                // the transition+credit pair.
                error!(
                    deposit_id = %deposit_id,
                    account_id = %record.account_id,
                    error = %credit_err,
                    "balance credit failed, reverting confirmation"
                );

                if let Err(revert_err) = self
                    .deposits
                    .revert_confirmation(deposit_id, DepositStatus::Confirming)
                    .await
                {
                    error!(
                        deposit_id = %deposit_id,
                        error = %revert_err,
                        "confirmation revert failed; deposit is confirmed but uncredited"
                    );
                }

                Err(LifecycleError::Ledger(credit_err))
            }
        }
    }
}
