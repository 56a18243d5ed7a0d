//! Investment Types
//!
//! Fixed-term allocations of balance into a yield plan. Investments share the
//! balance invariant with deposits: funding one debits the ledger atomically
//! with the insert, and completing one credits principal plus earnings back.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::deposit::unix_now;
use super::units;

/// Status of an investment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for InvestmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown investment status: {}", other)),
        }
    }
}

/// A fixed-term investment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRecord {
    /// Unique investment ID
    pub id: String,
    /// Owning account
    pub account_id: String,
    /// Yield plan identifier
    pub plan_id: String,
    /// Human-readable plan name
    pub plan_name: String,
    /// Principal in fiat cents, debited from the balance at creation
    pub principal_cents: u64,
    /// Daily yield in basis points of the principal
    pub roi_bps: u32,
    /// Term length in days
    pub duration_days: u32,
    /// Term start timestamp
    pub start_at: u64,
    /// Term end timestamp
    pub end_at: u64,
    /// Earnings accrued so far, in cents
    pub earned_cents: u64,
    /// Current status
    pub status: InvestmentStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

impl InvestmentRecord {
    /// Create a new active investment starting now
    pub fn new(
        account_id: String,
        plan_id: String,
        plan_name: String,
        principal_cents: u64,
        roi_bps: u32,
        duration_days: u32,
    ) -> Self {
        let now = unix_now();
        let end = (Utc::now() + Duration::days(duration_days as i64)).timestamp() as u64;
        let id = format!("inv_{}", uuid::Uuid::new_v4().simple());

        Self {
            id,
            account_id,
            plan_id,
            plan_name,
            principal_cents,
            roi_bps,
            duration_days,
            start_at: now,
            end_at: end,
            earned_cents: 0,
            status: InvestmentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total earnings in cents if the investment runs the full term
    pub fn expected_earnings_cents(&self) -> u64 {
        let total = self.principal_cents as u128 * self.roi_bps as u128 * self.duration_days as u128
            / 10_000;
        total as u64
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// POST /api/investments - Create a funded investment
#[derive(Debug, Deserialize)]
pub struct CreateInvestmentRequest {
    pub plan_id: String,
    pub plan_name: String,
    pub amount_usd: f64,
    /// Daily yield as a percentage (e.g. 1.5 for 1.5%/day)
    pub roi_percent: f64,
    pub duration_days: u32,
}

/// Investment as exposed to the UI
#[derive(Debug, Serialize)]
pub struct InvestmentResponse {
    pub id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub amount_usd: f64,
    pub roi_percent: f64,
    pub duration_days: u32,
    pub start_at: u64,
    pub end_at: u64,
    pub earned_usd: f64,
    pub status: String,
}

impl From<&InvestmentRecord> for InvestmentResponse {
    fn from(record: &InvestmentRecord) -> Self {
        Self {
            id: record.id.clone(),
            plan_id: record.plan_id.clone(),
            plan_name: record.plan_name.clone(),
            amount_usd: units::cents_to_usd(record.principal_cents),
            roi_percent: record.roi_bps as f64 / 100.0,
            duration_days: record.duration_days,
            start_at: record.start_at,
            end_at: record.end_at,
            earned_usd: units::cents_to_usd(record.earned_cents),
            status: record.status.to_string(),
        }
    }
}
