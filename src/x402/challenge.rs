//! Challenge construction.
//!
//! A challenge is the machine-parseable half of a 402 response: it carries
//! every field a generic caller needs to sign a valid authorization without
//! prior knowledge of this server. Building one is pure and deterministic
//! given the static payment configuration.

use ethers::utils::to_checksum;

use crate::config::PaymentConfig;

use super::error::PaymentError;
use super::tiers::PriceTier;
use super::types::{AssetDomain, PaymentRequired, PaymentRequirements, EXACT_SCHEME, X402_VERSION};

pub struct ChallengeBuilder {
    network: String,
    asset: String,
    asset_name: String,
    asset_version: String,
    pay_to: String,
    max_timeout_seconds: u64,
}

impl ChallengeBuilder {
    pub fn new(payment: &PaymentConfig) -> Self {
        Self {
            network: payment.network.clone(),
            asset: to_checksum(&payment.asset, None),
            asset_name: payment.asset_name.clone(),
            asset_version: payment.asset_version.clone(),
            pay_to: to_checksum(&payment.pay_to, None),
            max_timeout_seconds: payment.max_timeout_seconds,
        }
    }

    /// Build the challenge for a tier
    pub fn build(&self, tier: PriceTier) -> PaymentRequired {
        PaymentRequired {
            x402_version: X402_VERSION,
            accepts: vec![PaymentRequirements {
                scheme: EXACT_SCHEME.to_string(),
                network: self.network.clone(),
                max_amount_required: tier.price().to_string(),
                resource: tier.resource().to_string(),
                description: Some(tier.description()),
                mime_type: Some("application/json".to_string()),
                pay_to: self.pay_to.clone(),
                max_timeout_seconds: self.max_timeout_seconds,
                asset: self.asset.clone(),
                extra: Some(AssetDomain {
                    name: self.asset_name.clone(),
                    version: self.asset_version.clone(),
                }),
            }],
            error: None,
        }
    }

    /// Build a challenge that also explains why a presented envelope failed
    pub fn build_rejection(&self, tier: PriceTier, error: &PaymentError) -> PaymentRequired {
        let mut required = self.build(tier);
        required.error = Some(error.to_string());
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x402::testutil::test_payment_config;

    #[test]
    fn test_amount_and_payee_match_config_for_every_tier() {
        let config = test_payment_config();
        let builder = ChallengeBuilder::new(&config);

        for tier in PriceTier::ALL {
            let required = builder.build(tier);
            assert_eq!(required.x402_version, X402_VERSION);
            assert_eq!(required.accepts.len(), 1);

            let req = &required.accepts[0];
            assert_eq!(req.max_amount_required, tier.price().to_string());
            assert_eq!(req.pay_to, to_checksum(&config.pay_to, None));
            assert_eq!(req.resource, tier.resource());
            assert_eq!(req.scheme, EXACT_SCHEME);
            assert_eq!(req.max_timeout_seconds, 300);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ChallengeBuilder::new(&test_payment_config());
        let a = builder.build(PriceTier::Listings).to_base64().unwrap();
        let b = builder.build(PriceTier::Listings).to_base64().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejection_carries_reason() {
        let builder = ChallengeBuilder::new(&test_payment_config());
        let required = builder.build_rejection(PriceTier::Listings, &PaymentError::NonceReused);
        assert!(required.error.unwrap().contains("already been used"));
    }
}
