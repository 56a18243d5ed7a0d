//! API Server Module
//!
//! Provides the Axum application state and server startup logic. Wires the
//! production dependencies (SQLite stores, NOWPayments client, Resend mailer)
//! and hands the assembled state to the router.

use std::sync::Arc;
use tracing::info;

use crate::common::Result;
use crate::config::FundgateConfig;
use crate::gateway::{NowPaymentsClient, PaymentGateway};
use crate::lifecycle::DepositService;
use crate::notify::{Mailer, Notifier, NullMailer, ResendMailer};
use crate::storage::{BalanceLedger, DepositStore, InvestmentStore, SqliteStores};

/// Combined application state for all API endpoints
pub struct AppState {
    /// Deposit lifecycle service
    pub service: DepositService,
    /// Balance ledger, read directly by the balance endpoint
    pub ledger: Arc<dyn BalanceLedger>,
    /// Investment store
    pub investments: Arc<dyn InvestmentStore>,
    /// Outbound email front-end
    pub notifier: Notifier,
}

/// Shared application state type
pub type SharedAppState = Arc<AppState>;

impl AppState {
    /// Create new application state over the given dependencies
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        deposits: Arc<dyn DepositStore>,
        ledger: Arc<dyn BalanceLedger>,
        investments: Arc<dyn InvestmentStore>,
        notifier: Notifier,
        min_deposit_cents: u64,
    ) -> SharedAppState {
        let service = DepositService::new(gateway, deposits, ledger.clone(), min_deposit_cents);

        Arc::new(Self {
            service,
            ledger,
            investments,
            notifier,
        })
    }
}

/// Start the API server with production dependencies
pub async fn start_server(config: &FundgateConfig) -> Result<()> {
    let stores = Arc::new(SqliteStores::new(&config.db_path)?);

    let gateway = Arc::new(NowPaymentsClient::new(
        &config.nowpayments_api_url,
        config.nowpayments_api_key.clone(),
        config.ipn_callback_url(),
        config.success_url(),
        config.cancel_url(),
    ));

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendMailer::new(api_key.clone(), config.email_from.clone())),
        None => {
            info!("no mail provider key configured, outbound email disabled");
            Arc::new(NullMailer)
        }
    };

    let state = AppState::new(
        gateway,
        stores.clone(),
        stores.clone(),
        stores,
        Notifier::new(mailer),
        config.min_deposit_cents,
    );

    let app = super::routes::create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));

    info!(addr = %addr, db_path = %config.db_path, "fundgate API listening");
    info!("  POST /api/deposits              - Initiate deposit");
    info!("  GET  /api/deposits              - List deposits");
    info!("  GET  /api/deposits/:id          - Poll deposit status");
    info!("  POST /api/webhooks/nowpayments  - Processor webhook");
    info!("  GET  /api/balance               - Account balance");
    info!("  POST /api/investments           - Create investment");
    info!("  GET  /api/investments           - List investments");
    info!("  POST /api/notify/*              - Queue transactional email");
    info!("  GET  /api/health                - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
