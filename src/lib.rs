//! Estate402: a pay-per-request property data API.
//!
//! Two gated endpoints are sold over the x402 protocol: listings queries
//! (tier 1) and a comparables-based valuation (tier 2). Payments are
//! off-chain signed EIP-3009 authorizations settled on-chain by the
//! server's relayer wallet; callers never spend gas.

use std::sync::Arc;

pub mod config;
pub mod controllers;
pub mod db;
pub mod models;
pub mod valuation;
pub mod x402;

use config::Config;
use db::Database;
use x402::PaymentVerifier;

/// Shared application state passed to every handler
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub verifier: Arc<PaymentVerifier>,
}
