//! Payment verification pipeline.
//!
//! Checks run cheapest-first and the pipeline stops at the first failure:
//! structural decoding, recipient, amount, validity window, nonce state,
//! balance, then on-chain settlement. The token contract remains the final
//! authority on both the signature and the nonce; the pre-checks exist to
//! reject obviously invalid envelopes without spending gas.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ethers::types::{Address, U256};

use crate::config::PaymentConfig;
use crate::db::{Database, SettlementRecord};

use super::challenge::ChallengeBuilder;
use super::error::PaymentError;
use super::ledger::Ledger;
use super::settlement::SettlementSubmitter;
use super::tiers::PriceTier;
use super::types::{PaymentPayload, SignedAuthorization};

pub struct PaymentVerifier {
    pay_to: Address,
    network: String,
    ledger: Arc<dyn Ledger>,
    settlement: SettlementSubmitter,
    challenge: ChallengeBuilder,
}

impl PaymentVerifier {
    pub fn new(
        payment: &PaymentConfig,
        ledger: Arc<dyn Ledger>,
        db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            pay_to: payment.pay_to,
            network: payment.network.clone(),
            ledger: ledger.clone(),
            settlement: SettlementSubmitter::new(ledger, db, payment.confirmation_timeout),
            challenge: ChallengeBuilder::new(payment),
        }
    }

    pub fn challenge(&self) -> &ChallengeBuilder {
        &self.challenge
    }

    /// Verify the X-PAYMENT header for a tier and settle on success.
    pub async fn verify_and_settle(
        &self,
        header: Option<&str>,
        tier: PriceTier,
    ) -> Result<SettlementRecord, PaymentError> {
        let header = header.ok_or(PaymentError::ChallengeRequired)?;

        let payload =
            PaymentPayload::from_base64(header).map_err(PaymentError::FormatInvalid)?;
        if payload.network != self.network {
            return Err(PaymentError::FormatInvalid(format!(
                "Unsupported network: {}",
                payload.network
            )));
        }
        let auth =
            SignedAuthorization::try_from(&payload).map_err(PaymentError::FormatInvalid)?;

        if auth.to != self.pay_to {
            return Err(PaymentError::RecipientMismatch);
        }

        // Overpayment is accepted as payment in full
        if auth.value < U256::from(tier.price()) {
            return Err(PaymentError::AmountInsufficient);
        }

        let now = U256::from(unix_now().as_secs());
        if now < auth.valid_after || now >= auth.valid_before {
            return Err(PaymentError::TimeWindowInvalid);
        }

        // Advisory pre-check; the contract enforces this atomically at
        // settlement
        match self.ledger.is_nonce_used(auth.from, auth.nonce).await {
            Ok(true) => return Err(PaymentError::NonceReused),
            Ok(false) => {}
            Err(e) => {
                return Err(PaymentError::SettlementReverted(format!(
                    "Nonce check failed: {}",
                    e
                )))
            }
        }

        match self.ledger.get_balance(auth.from).await {
            Ok(balance) if balance < auth.value => {
                return Err(PaymentError::BalanceInsufficient)
            }
            Ok(_) => {}
            Err(e) => {
                return Err(PaymentError::SettlementReverted(format!(
                    "Balance check failed: {}",
                    e
                )))
            }
        }

        self.settlement.settle(&auth, tier).await
    }
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x402::ledger::mock::MockLedger;
    use crate::x402::ledger::ConfirmationStatus;
    use crate::x402::testutil::test_payment_config;
    use ethers::types::H256;

    fn payer() -> Address {
        "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
            .parse()
            .unwrap()
    }

    fn funded_ledger() -> Arc<MockLedger> {
        Arc::new(MockLedger::new().with_balance(payer(), U256::from(1_000_000u64)))
    }

    fn verifier_with(ledger: Arc<MockLedger>) -> PaymentVerifier {
        PaymentVerifier::new(&test_payment_config(), ledger, None)
    }

    fn auth_for(tier: PriceTier, nonce: u64) -> SignedAuthorization {
        let now = unix_now().as_secs();
        SignedAuthorization {
            from: payer(),
            to: test_payment_config().pay_to,
            value: U256::from(tier.price()),
            valid_after: U256::from(now.saturating_sub(10)),
            valid_before: U256::from(now + 300),
            nonce: H256::from_low_u64_be(nonce),
            signature: vec![0x01; 65],
        }
    }

    fn encode(auth: &SignedAuthorization) -> String {
        auth.to_payload("base-sepolia").to_base64().unwrap()
    }

    #[tokio::test]
    async fn test_valid_payment_settles() {
        let ledger = funded_ledger();
        let verifier = verifier_with(ledger.clone());

        let header = encode(&auth_for(PriceTier::Listings, 1));
        let record = verifier
            .verify_and_settle(Some(&header), PriceTier::Listings)
            .await
            .unwrap();

        assert_eq!(record.tier, 1);
        assert_eq!(record.value, "10000");
        assert_eq!(ledger.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_header_is_challenge() {
        let verifier = verifier_with(funded_ledger());
        let err = verifier
            .verify_and_settle(None, PriceTier::Listings)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::ChallengeRequired);
    }

    #[tokio::test]
    async fn test_garbage_header_is_format_invalid() {
        let verifier = verifier_with(funded_ledger());
        let err = verifier
            .verify_and_settle(Some("!!not-an-envelope!!"), PriceTier::Listings)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::FormatInvalid(_)));
    }

    #[tokio::test]
    async fn test_wrong_network_is_format_invalid() {
        let verifier = verifier_with(funded_ledger());
        let header = auth_for(PriceTier::Listings, 2)
            .to_payload("base-mainnet")
            .to_base64()
            .unwrap();
        let err = verifier
            .verify_and_settle(Some(&header), PriceTier::Listings)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::FormatInvalid(_)));
    }

    #[tokio::test]
    async fn test_wrong_recipient_rejected_before_settlement() {
        let ledger = funded_ledger();
        let verifier = verifier_with(ledger.clone());

        let mut auth = auth_for(PriceTier::Listings, 3);
        auth.to = "0x000000000000000000000000000000000000dead"
            .parse()
            .unwrap();
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap_err();

        assert_eq!(err, PaymentError::RecipientMismatch);
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_underpayment_rejected_before_settlement() {
        let ledger = funded_ledger();
        let verifier = verifier_with(ledger.clone());

        let mut auth = auth_for(PriceTier::Listings, 4);
        auth.value = U256::from(5_000u64);
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap_err();

        assert_eq!(err, PaymentError::AmountInsufficient);
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_overpayment_accepted() {
        let verifier = verifier_with(funded_ledger());

        let mut auth = auth_for(PriceTier::Listings, 5);
        auth.value = U256::from(25_000u64);
        let record = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap();
        assert_eq!(record.value, "25000");
    }

    #[tokio::test]
    async fn test_expired_window_rejected_before_settlement() {
        let ledger = funded_ledger();
        let verifier = verifier_with(ledger.clone());

        let now = unix_now().as_secs();
        let mut auth = auth_for(PriceTier::Listings, 6);
        auth.valid_after = U256::from(now - 600);
        auth.valid_before = U256::from(now - 300);
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap_err();

        assert_eq!(err, PaymentError::TimeWindowInvalid);
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_window_end_is_exclusive() {
        let verifier = verifier_with(funded_ledger());

        // validBefore == now is rejected, matching the contract's
        // block.timestamp < validBefore check
        let now = unix_now().as_secs();
        let mut auth = auth_for(PriceTier::Listings, 13);
        auth.valid_before = U256::from(now);
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::TimeWindowInvalid);
    }

    #[tokio::test]
    async fn test_not_yet_valid_window_rejected() {
        let verifier = verifier_with(funded_ledger());

        let now = unix_now().as_secs();
        let mut auth = auth_for(PriceTier::Listings, 7);
        auth.valid_after = U256::from(now + 100);
        auth.valid_before = U256::from(now + 400);
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Listings)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::TimeWindowInvalid);
    }

    #[tokio::test]
    async fn test_replay_rejected() {
        let ledger = funded_ledger();
        let verifier = verifier_with(ledger.clone());

        let header = encode(&auth_for(PriceTier::Listings, 8));
        verifier
            .verify_and_settle(Some(&header), PriceTier::Listings)
            .await
            .unwrap();

        // Same envelope, byte for byte
        let err = verifier
            .verify_and_settle(Some(&header), PriceTier::Listings)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::NonceReused);
        // Replays are caught by the pre-check; no second submission
        assert_eq!(ledger.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_low_balance_rejected_before_settlement() {
        let ledger =
            Arc::new(MockLedger::new().with_balance(payer(), U256::from(100u64)));
        let verifier = verifier_with(ledger.clone());

        let err = verifier
            .verify_and_settle(
                Some(&encode(&auth_for(PriceTier::Listings, 9))),
                PriceTier::Listings,
            )
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::BalanceInsufficient);
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_valuation_tier_requires_its_own_price() {
        let verifier = verifier_with(funded_ledger());

        // A tier-1 amount cannot pay for tier 2
        let mut auth = auth_for(PriceTier::Valuation, 10);
        auth.value = U256::from(PriceTier::Listings.price());
        let err = verifier
            .verify_and_settle(Some(&encode(&auth)), PriceTier::Valuation)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::AmountInsufficient);
    }

    #[tokio::test]
    async fn test_concurrent_same_nonce_settles_exactly_once() {
        let ledger = funded_ledger();
        let verifier = Arc::new(verifier_with(ledger.clone()));

        // Two distinct envelopes over the same (payer, nonce)
        let mut a = auth_for(PriceTier::Listings, 11);
        a.value = U256::from(10_000u64);
        let mut b = auth_for(PriceTier::Listings, 11);
        b.value = U256::from(11_000u64);
        let (header_a, header_b) = (encode(&a), encode(&b));

        let (ra, rb) = tokio::join!(
            verifier.verify_and_settle(Some(&header_a), PriceTier::Listings),
            verifier.verify_and_settle(Some(&header_b), PriceTier::Listings),
        );

        let oks = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(oks, 1);
        for outcome in [ra, rb] {
            if let Err(e) = outcome {
                assert_eq!(e, PaymentError::NonceReused);
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_propagates_with_tx_hash() {
        let ledger = funded_ledger();
        ledger.set_outcome(ConfirmationStatus::Pending);
        let verifier = verifier_with(ledger);

        let err = verifier
            .verify_and_settle(
                Some(&encode(&auth_for(PriceTier::Listings, 12))),
                PriceTier::Listings,
            )
            .await
            .unwrap_err();
        match err {
            PaymentError::SettlementTimeout { tx_hash } => {
                assert!(tx_hash.starts_with("0x"));
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }
}
