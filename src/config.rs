//! Process configuration.
//!
//! Everything is read once at startup into one explicit object that is passed
//! by reference into every handler. A missing or malformed value aborts the
//! process before it binds a socket; configuration problems never surface as
//! per-request errors.

use std::env;
use std::time::Duration;

use ethers::types::Address;

use crate::x402::parse_address;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub payment: PaymentConfig,
}

/// Static payment parameters shared by the challenge builder, the verifier
/// and the settlement path.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Network identifier advertised in challenges, e.g. "base-sepolia"
    pub network: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// ERC-20 asset contract that supports EIP-3009
    pub asset: Address,
    /// EIP-712 domain name of the asset contract
    pub asset_name: String,
    /// EIP-712 domain version of the asset contract
    pub asset_version: String,
    /// Address every authorization must pay
    pub pay_to: Address,
    /// Private key of the relayer wallet that submits settlements and pays gas
    pub relayer_private_key: String,
    /// Validity window advertised to callers in challenges
    pub max_timeout_seconds: u64,
    /// How long a settlement waits for on-chain confirmation
    pub confirmation_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let pay_to_raw =
            env::var("RECIPIENT_ADDRESS").map_err(|_| "RECIPIENT_ADDRESS must be set".to_string())?;
        let pay_to = parse_address("RECIPIENT_ADDRESS", &pay_to_raw)?;

        let asset_raw = env::var("USDC_CONTRACT_ADDRESS")
            .unwrap_or_else(|_| "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string());
        let asset = parse_address("USDC_CONTRACT_ADDRESS", &asset_raw)?;

        let relayer_private_key = env::var("RELAYER_PRIVATE_KEY")
            .map_err(|_| "RELAYER_PRIVATE_KEY must be set".to_string())?;

        Ok(Self {
            port: parse_env("PORT", 8080)?,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./.db/estate402.db".to_string()),
            payment: PaymentConfig {
                network: env::var("PAYMENT_NETWORK").unwrap_or_else(|_| "base-sepolia".to_string()),
                chain_id: parse_env("CHAIN_ID", 84532)?,
                rpc_url: env::var("BASE_SEPOLIA_RPC")
                    .unwrap_or_else(|_| "https://sepolia.base.org".to_string()),
                asset,
                asset_name: env::var("ASSET_DOMAIN_NAME").unwrap_or_else(|_| "USDC".to_string()),
                asset_version: env::var("ASSET_DOMAIN_VERSION").unwrap_or_else(|_| "2".to_string()),
                pay_to,
                relayer_private_key,
                max_timeout_seconds: parse_env("MAX_TIMEOUT_SECONDS", 300)?,
                confirmation_timeout: Duration::from_secs(parse_env("SETTLEMENT_TIMEOUT_SECS", 60)?),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
