//! Ledger collaborator abstraction.
//!
//! The payment engine never owns ledger state: nonce consumption and
//! balances live on the token contract, and replay prevention rests on the
//! contract's own atomic guarantees. This module defines the narrow
//! interface the engine depends on plus the JSON-RPC implementation used in
//! production. Tests substitute a mock.

use std::time::Duration;

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};

use super::erc20;
use super::types::SignedAuthorization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed { block_number: u64 },
    Reverted,
    /// Not yet mined within the allotted wait; the transaction may still
    /// confirm later
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The (payer, nonce) pair was already consumed
    NonceAlreadyUsed,
    Rpc(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::NonceAlreadyUsed => write!(f, "authorization nonce already used"),
            LedgerError::Rpc(detail) => write!(f, "ledger error: {}", detail),
        }
    }
}

/// The four ledger capabilities the payment engine consumes
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Asset balance of an address, in minor units
    async fn get_balance(&self, address: Address) -> Result<U256, LedgerError>;

    /// Whether the (authorizer, nonce) pair has been consumed
    async fn is_nonce_used(&self, authorizer: Address, nonce: H256) -> Result<bool, LedgerError>;

    /// Submit a transferWithAuthorization using the implementation's own
    /// relayer identity for gas. Returns the transaction hash.
    async fn submit_authorized_transfer(
        &self,
        auth: &SignedAuthorization,
    ) -> Result<H256, LedgerError>;

    /// Wait for the transaction to be mined, up to `timeout`
    async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        timeout: Duration,
    ) -> Result<ConfirmationStatus, LedgerError>;
}

/// Ledger implementation over an EVM JSON-RPC endpoint. The relayer wallet
/// funds gas for every settlement; payers only ever sign off-chain.
pub struct EvmLedger {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    token: Address,
}

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

impl EvmLedger {
    pub fn new(
        rpc_url: &str,
        chain_id: u64,
        token: Address,
        relayer_private_key: &str,
    ) -> Result<Self, String> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| format!("Invalid RPC URL '{}': {}", rpc_url, e))?;

        let key_hex = relayer_private_key
            .strip_prefix("0x")
            .unwrap_or(relayer_private_key);
        let wallet: LocalWallet = key_hex
            .parse()
            .map_err(|e| format!("Invalid relayer private key: {}", e))?;
        let wallet = wallet.with_chain_id(chain_id);

        log::info!(
            "[Ledger] Relayer wallet {:?} on chain {}",
            wallet.address(),
            chain_id
        );

        Ok(Self {
            client: SignerMiddleware::new(provider, wallet),
            token,
        })
    }

    pub fn relayer_address(&self) -> Address {
        self.client.signer().address()
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Bytes, LedgerError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.token)
            .data(data)
            .into();
        self.client
            .call(&tx, None)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    async fn get_balance(&self, address: Address) -> Result<U256, LedgerError> {
        let response = self.eth_call(erc20::encode_balance_of(address)).await?;
        erc20::decode_balance(&response).map_err(LedgerError::Rpc)
    }

    async fn is_nonce_used(&self, authorizer: Address, nonce: H256) -> Result<bool, LedgerError> {
        let response = self
            .eth_call(erc20::encode_authorization_state(authorizer, nonce))
            .await?;
        erc20::decode_bool(&response).map_err(LedgerError::Rpc)
    }

    async fn submit_authorized_transfer(
        &self,
        auth: &SignedAuthorization,
    ) -> Result<H256, LedgerError> {
        let data = erc20::encode_transfer_with_authorization(auth).map_err(LedgerError::Rpc)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.token)
            .data(data)
            .into();

        let pending = self.client.send_transaction(tx, None).await.map_err(|e| {
            let message = e.to_string();
            // Gas estimation reverts surface nonce consumption before the
            // transaction is ever broadcast
            if message.contains("authorization is used")
                || message.contains("authorization used")
            {
                LedgerError::NonceAlreadyUsed
            } else {
                LedgerError::Rpc(message)
            }
        })?;

        Ok(*pending)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        timeout: Duration,
    ) -> Result<ConfirmationStatus, LedgerError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.client.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let succeeded = receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false);
                    return if succeeded {
                        Ok(ConfirmationStatus::Confirmed {
                            block_number: receipt
                                .block_number
                                .map(|b| b.as_u64())
                                .unwrap_or_default(),
                        })
                    } else {
                        Ok(ConfirmationStatus::Reverted)
                    };
                }
                Ok(None) => {}
                Err(e) => return Err(LedgerError::Rpc(e.to_string())),
            }

            if tokio::time::Instant::now() + RECEIPT_POLL_INTERVAL > deadline {
                return Ok(ConfirmationStatus::Pending);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process ledger with the same atomicity guarantees the real token
    //! contract provides for nonce consumption.

    use super::*;
    use dashmap::DashMap;
    use ethers::utils::keccak256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct MockLedger {
        balances: DashMap<Address, U256>,
        used: DashMap<(Address, H256), ()>,
        outcome: Mutex<ConfirmationStatus>,
        submit_calls: AtomicUsize,
    }

    impl MockLedger {
        pub fn new() -> Self {
            Self {
                balances: DashMap::new(),
                used: DashMap::new(),
                outcome: Mutex::new(ConfirmationStatus::Confirmed { block_number: 1 }),
                submit_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_balance(self, address: Address, amount: U256) -> Self {
            self.balances.insert(address, amount);
            self
        }

        /// Outcome returned by `wait_for_confirmation` for subsequent submissions
        pub fn set_outcome(&self, outcome: ConfirmationStatus) {
            *self.outcome.lock().unwrap() = outcome;
        }

        /// Simulate another relayer consuming this nonce out from under us
        pub fn mark_nonce_used(&self, authorizer: Address, nonce: H256) {
            self.used.insert((authorizer, nonce), ());
        }

        pub fn submit_count(&self) -> usize {
            self.submit_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Ledger for MockLedger {
        async fn get_balance(&self, address: Address) -> Result<U256, LedgerError> {
            Ok(self
                .balances
                .get(&address)
                .map(|b| *b)
                .unwrap_or_default())
        }

        async fn is_nonce_used(
            &self,
            authorizer: Address,
            nonce: H256,
        ) -> Result<bool, LedgerError> {
            Ok(self.used.contains_key(&(authorizer, nonce)))
        }

        async fn submit_authorized_transfer(
            &self,
            auth: &SignedAuthorization,
        ) -> Result<H256, LedgerError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);

            let outcome = self.outcome.lock().unwrap().clone();
            if let ConfirmationStatus::Confirmed { .. } = outcome {
                // Atomic consume: exactly one submission per (payer, nonce)
                // can ever win, matching the contract's guarantee
                if self
                    .used
                    .insert((auth.from, auth.nonce), ())
                    .is_some()
                {
                    return Err(LedgerError::NonceAlreadyUsed);
                }
            }

            let mut seed = Vec::new();
            seed.extend_from_slice(auth.from.as_bytes());
            seed.extend_from_slice(auth.nonce.as_bytes());
            Ok(H256::from(keccak256(&seed)))
        }

        async fn wait_for_confirmation(
            &self,
            _tx_hash: H256,
            _timeout: Duration,
        ) -> Result<ConfirmationStatus, LedgerError> {
            Ok(self.outcome.lock().unwrap().clone())
        }
    }
}
