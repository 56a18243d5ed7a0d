//! Deposit Types
//!
//! Types for tracking fiat deposits paid via the crypto payment processor:
//! waiting → confirming → confirmed (terminal), with failed/expired as the
//! terminal failure states. The status strings are part of the wire contract
//! with both the UI and the processor mapping table.

use serde::{Deserialize, Serialize};

use super::units;

/// Status of a deposit through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Invoice created, waiting for the processor to see a payment
    Waiting,
    /// Payment seen, waiting for network confirmations
    Confirming,
    /// Payment confirmed by the processor; balance credited
    Confirmed,
    /// Payment failed or was refunded
    Failed,
    /// Invoice expired without payment
    Expired,
}

impl DepositStatus {
    /// All statuses, used to derive transition predecessor sets
    pub const ALL: [DepositStatus; 5] = [
        DepositStatus::Waiting,
        DepositStatus::Confirming,
        DepositStatus::Confirmed,
        DepositStatus::Failed,
        DepositStatus::Expired,
    ];

    /// Terminal statuses permit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::Confirmed | DepositStatus::Failed | DepositStatus::Expired
        )
    }

    /// Position in the forward order waiting < confirming < confirmed.
    /// Failure terminals sit outside the order and are handled separately.
    fn rank(&self) -> u8 {
        match self {
            DepositStatus::Waiting => 0,
            DepositStatus::Confirming => 1,
            DepositStatus::Confirmed => 2,
            DepositStatus::Failed | DepositStatus::Expired => 3,
        }
    }

    /// Whether a stored record in `self` may move to `to`.
    ///
    /// Only strict forward moves are allowed: a record never leaves a
    /// terminal status, never moves backward, and a repeat of the current
    /// status is not a transition (callers treat it as a no-op).
    pub fn can_transition(&self, to: DepositStatus) -> bool {
        if self.is_terminal() || *self == to {
            return false;
        }
        self.rank() < to.rank()
    }

    /// Statuses from which `to` is reachable
    pub fn predecessors(to: DepositStatus) -> Vec<DepositStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|from| from.can_transition(to))
            .collect()
    }
}

impl Default for DepositStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Confirming => write!(f, "confirming"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for DepositStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "confirming" => Ok(Self::Confirming),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown deposit status: {}", other)),
        }
    }
}

/// Supported processor payout currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayCurrency {
    Btc,
    Eth,
    Ltc,
    Sol,
    #[serde(rename = "usdttrc20")]
    UsdtTrc20,
    #[serde(rename = "usdterc20")]
    UsdtErc20,
}

impl std::fmt::Display for PayCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Btc => write!(f, "btc"),
            Self::Eth => write!(f, "eth"),
            Self::Ltc => write!(f, "ltc"),
            Self::Sol => write!(f, "sol"),
            Self::UsdtTrc20 => write!(f, "usdttrc20"),
            Self::UsdtErc20 => write!(f, "usdterc20"),
        }
    }
}

impl std::str::FromStr for PayCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "btc" => Ok(Self::Btc),
            "eth" => Ok(Self::Eth),
            "ltc" => Ok(Self::Ltc),
            "sol" => Ok(Self::Sol),
            "usdttrc20" => Ok(Self::UsdtTrc20),
            "usdterc20" => Ok(Self::UsdtErc20),
            other => Err(format!("unsupported pay currency: {}", other)),
        }
    }
}

/// A deposit record tracking one funding attempt through its lifecycle.
///
/// The record is created when the processor acknowledges the invoice and is
/// never deleted; it is the audit trail for the credited balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Unique deposit ID
    pub id: String,
    /// Owning account
    pub account_id: String,
    /// Requested amount in fiat cents
    pub amount_cents: u64,
    /// Processor payout currency
    pub pay_currency: PayCurrency,
    /// Processor payment ID, assigned once the processor sees a payment
    pub payment_id: Option<String>,
    /// Processor invoice ID, the webhook correlation key (immutable)
    pub invoice_id: String,
    /// Processor-hosted checkout URL
    pub invoice_url: String,
    /// Observed paid amount in the pay currency
    pub paid_amount: Option<f64>,
    /// Current lifecycle status
    pub status: DepositStatus,
    /// Timestamp when the deposit was created
    pub created_at: u64,
    /// Timestamp of last status update
    pub updated_at: u64,
}

impl DepositRecord {
    /// Create a new deposit in `waiting` with the processor-assigned invoice
    pub fn new(
        account_id: String,
        amount_cents: u64,
        pay_currency: PayCurrency,
        invoice_id: String,
        invoice_url: String,
    ) -> Self {
        let now = unix_now();
        let id = format!("dep_{}", uuid::Uuid::new_v4().simple());

        Self {
            id,
            account_id,
            amount_cents,
            pay_currency,
            payment_id: None,
            invoice_id,
            invoice_url,
            paid_amount: None,
            status: DepositStatus::Waiting,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Current unix timestamp in seconds
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// POST /api/deposits - Initiate a deposit
#[derive(Debug, Deserialize)]
pub struct CreateDepositRequest {
    /// Requested amount in USD
    pub amount_usd: f64,
    /// Processor payout currency (defaults to btc)
    pub pay_currency: Option<String>,
}

/// Response to POST /api/deposits
#[derive(Debug, Serialize)]
pub struct CreateDepositResponse {
    pub success: bool,
    pub deposit_id: Option<String>,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub error: Option<String>,
}

/// Deposit as exposed to the UI (GET /api/deposits, GET /api/deposits/:id)
#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub id: String,
    pub amount_usd: f64,
    pub pay_currency: String,
    pub payment_id: Option<String>,
    pub invoice_id: String,
    pub invoice_url: String,
    pub paid_amount: Option<f64>,
    pub status: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&DepositRecord> for DepositResponse {
    fn from(record: &DepositRecord) -> Self {
        Self {
            id: record.id.clone(),
            amount_usd: units::cents_to_usd(record.amount_cents),
            pay_currency: record.pay_currency.to_string(),
            payment_id: record.payment_id.clone(),
            invoice_id: record.invoice_id.clone(),
            invoice_url: record.invoice_url.clone(),
            paid_amount: record.paid_amount,
            status: record.status.to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
