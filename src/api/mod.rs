//! REST API Module
//!
//! This module contains:
//! - The route table and request handlers
//! - Application state assembly and server startup

pub mod routes;
pub mod server;

// Re-exports for convenience
pub use routes::create_router;
pub use server::{start_server, AppState, SharedAppState};
