//! Fundgate - Deposit Lifecycle Service
//!
//! Server-side service tracking fiat deposits paid through a crypto payment
//! processor, crediting account balances exactly once on confirmation, and
//! funding fixed-term investments from those balances.
//!
//! Run modes:
//!   cargo run -- api             - Start REST API server
//!   cargo run -- help            - Show usage

use std::env;
use tracing::error;

use fundgate::api;
use fundgate::config::FundgateConfig;
use fundgate::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "api" => run_api_server(&args[2..]).await,
        "help" | "--help" | "-h" => print_usage(),
        _ => print_usage(),
    }
}

fn print_usage() {
    println!("Fundgate - Deposit Lifecycle Service");
    println!();
    println!("Usage:");
    println!("  fundgate-api api [--port <port>]    Start REST API server (default: 3001)");
    println!();
    println!("Environment Variables:");
    println!("  FUNDGATE_NOWPAYMENTS_API_KEY  NOWPayments API key (required)");
    println!("  FUNDGATE_API_PORT             REST API port (default: 3001)");
    println!("  FUNDGATE_DB_PATH              SQLite database path (default: data/fundgate.db)");
    println!("  FUNDGATE_PUBLIC_URL           Public base URL for the webhook callback");
    println!("  FUNDGATE_SITE_URL             Front-end base URL for checkout redirects");
    println!("  FUNDGATE_MIN_DEPOSIT_CENTS    Minimum deposit (default: 1000 = $10)");
    println!("  FUNDGATE_RESEND_API_KEY       Resend API key; email disabled if unset");
    println!("  FUNDGATE_EMAIL_FROM           Sender address for outbound email");
    println!("  FUNDGATE_LOG_LEVEL            Log level (default: info)");
    println!("  FUNDGATE_LOG_JSON             Set to 1 for JSON log output");
}

/// Start REST API server
async fn run_api_server(args: &[String]) {
    let mut config = match FundgateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Parse arguments
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.api_port = args[i + 1].parse().unwrap_or(config.api_port);
                i += 2;
            }
            _ => i += 1,
        }
    }

    if let Err(e) = init_logging(&config.log_level, config.log_json) {
        eprintln!("Logging error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = api::start_server(&config).await {
        error!(error = %e, "API server error");
        std::process::exit(1);
    }
}
