//! Payment Gateway Module
//!
//! Adapter between internal deposit records and the payment processor's
//! invoice/payment-status vocabulary.
//!
//! This module contains:
//! - The `PaymentGateway` trait used by the lifecycle manager
//! - A NOWPayments HTTP client implementation
//! - The processor-status → internal-status mapping table

pub mod nowpayments;

// Re-exports for convenience
pub use nowpayments::{
    json_id, map_processor_status, GatewayError, Invoice, NowPaymentsClient, PaymentGateway,
    PaymentStatus,
};

#[cfg(test)]
pub use nowpayments::MockPaymentGateway;
