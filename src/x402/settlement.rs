//! Settlement submission and confirmation tracking.
//!
//! The relayer wallet pays gas; the payer only ever signed. A settlement
//! attempt is recorded as pending before we wait on confirmation, so a
//! timeout never loses the transaction hash. Timeouts are reported as
//! indeterminate, never as failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ethers::utils::to_checksum;
use uuid::Uuid;

use crate::db::{Database, SettlementRecord, SettlementStatus};

use super::error::PaymentError;
use super::ledger::{ConfirmationStatus, Ledger, LedgerError};
use super::tiers::PriceTier;
use super::types::SignedAuthorization;

pub struct SettlementSubmitter {
    ledger: Arc<dyn Ledger>,
    db: Option<Arc<Database>>,
    confirmation_timeout: Duration,
}

impl SettlementSubmitter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        db: Option<Arc<Database>>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            db,
            confirmation_timeout,
        }
    }

    /// Submit the authorization on-chain and wait for confirmation.
    pub async fn settle(
        &self,
        auth: &SignedAuthorization,
        tier: PriceTier,
    ) -> Result<SettlementRecord, PaymentError> {
        let tx_hash = match self.ledger.submit_authorized_transfer(auth).await {
            Ok(hash) => hash,
            Err(LedgerError::NonceAlreadyUsed) => return Err(PaymentError::NonceReused),
            Err(LedgerError::Rpc(detail)) => {
                return Err(PaymentError::SettlementReverted(detail))
            }
        };

        let mut record = SettlementRecord {
            uuid: Uuid::new_v4().to_string(),
            payer: to_checksum(&auth.from, None),
            pay_to: to_checksum(&auth.to, None),
            value: auth.value.to_string(),
            nonce: format!("{:?}", auth.nonce),
            tier: tier.number(),
            resource: tier.resource().to_string(),
            tx_hash: format!("{:?}", tx_hash),
            block_number: None,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
        };

        // Persist before waiting so a timeout or crash still leaves the
        // transaction hash on record for reconciliation
        self.persist_pending(&record);

        log::info!(
            "[Settlement] Submitted tx {} for payer {} (tier {})",
            record.tx_hash,
            record.payer,
            record.tier
        );

        match self
            .ledger
            .wait_for_confirmation(tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(ConfirmationStatus::Confirmed { block_number }) => {
                record.status = SettlementStatus::Confirmed;
                record.block_number = Some(block_number);
                self.persist_status(&record.uuid, SettlementStatus::Confirmed, Some(block_number));
                log::info!(
                    "[Settlement] Confirmed tx {} in block {}",
                    record.tx_hash,
                    block_number
                );
                Ok(record)
            }
            Ok(ConfirmationStatus::Pending) => {
                log::warn!(
                    "[Settlement] Tx {} not confirmed within {:?}; outcome indeterminate",
                    record.tx_hash,
                    self.confirmation_timeout
                );
                Err(PaymentError::SettlementTimeout {
                    tx_hash: record.tx_hash,
                })
            }
            Ok(ConfirmationStatus::Reverted) => {
                self.persist_status(&record.uuid, SettlementStatus::Failed, None);

                // A revert where the nonce is now consumed means another
                // settlement of the same authorization won the race
                match self.ledger.is_nonce_used(auth.from, auth.nonce).await {
                    Ok(true) => Err(PaymentError::NonceReused),
                    _ => Err(PaymentError::SettlementReverted(format!(
                        "transaction {} reverted",
                        record.tx_hash
                    ))),
                }
            }
            Err(e) => {
                log::warn!(
                    "[Settlement] Receipt polling failed for tx {}: {}",
                    record.tx_hash,
                    e
                );
                Err(PaymentError::SettlementTimeout {
                    tx_hash: record.tx_hash,
                })
            }
        }
    }

    fn persist_pending(&self, record: &SettlementRecord) {
        if let Some(db) = &self.db {
            if let Err(e) = db.insert_settlement(record) {
                log::error!("[Settlement] Failed to record settlement {}: {}", record.uuid, e);
            }
        }
    }

    fn persist_status(&self, uuid: &str, status: SettlementStatus, block_number: Option<u64>) {
        if let Some(db) = &self.db {
            if let Err(e) = db.update_settlement_status(uuid, status, block_number) {
                log::error!("[Settlement] Failed to update settlement {}: {}", uuid, e);
            }
        }
    }
}
