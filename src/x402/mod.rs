//! x402 payment protocol engine.
//!
//! Everything needed to run pay-per-request HTTP endpoints: challenge
//! construction for 402 responses, envelope decoding and validation,
//! off-chain authorization signing for the client side, and relayed
//! on-chain settlement with replay prevention delegated to the token
//! contract.

pub mod challenge;
pub mod client;
pub mod erc20;
pub mod error;
pub mod ledger;
pub mod settlement;
pub mod signer;
pub mod tiers;
pub mod types;
pub mod verifier;

pub use challenge::ChallengeBuilder;
pub use client::X402Client;
pub use error::PaymentError;
pub use ledger::{EvmLedger, Ledger};
pub use signer::X402Signer;
pub use tiers::PriceTier;
pub use types::{parse_address, PaymentPayload, PaymentRequired, SignedAuthorization};
pub use verifier::PaymentVerifier;

/// HTTP header carrying the signed payment envelope
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// HTTP header carrying the base64 challenge on 402 responses
pub const X_PAYMENT_REQUIRED_HEADER: &str = "X-PAYMENT-REQUIRED";

#[cfg(test)]
pub(crate) mod testutil {
    use std::time::Duration;

    use crate::config::PaymentConfig;

    /// Payment configuration shared by engine tests. Uses well-known
    /// development keys and the Base Sepolia USDC parameters.
    pub(crate) fn test_payment_config() -> PaymentConfig {
        PaymentConfig {
            network: "base-sepolia".to_string(),
            chain_id: 84532,
            rpc_url: "http://localhost:8545".to_string(),
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
                .parse()
                .unwrap(),
            asset_name: "USDC".to_string(),
            asset_version: "2".to_string(),
            pay_to: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
                .parse()
                .unwrap(),
            relayer_private_key:
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
            max_timeout_seconds: 300,
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}
