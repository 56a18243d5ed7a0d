//! Shared Types Module
//!
//! Data types shared across the fundgate service.

pub mod deposit;
pub mod investment;
pub mod units;

// Re-exports for convenience
pub use deposit::{
    unix_now, CreateDepositRequest, CreateDepositResponse, DepositRecord, DepositResponse,
    DepositStatus, PayCurrency,
};
pub use investment::{
    CreateInvestmentRequest, InvestmentRecord, InvestmentResponse, InvestmentStatus,
};
pub use units::{cents_to_display, cents_to_usd, cents_to_usd_string, usd_to_cents, CENTS_PER_USD};
