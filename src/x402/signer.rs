//! Client-side EIP-3009 authorization signing.
//!
//! Given the payment requirements from a challenge, builds a time-bounded,
//! nonced TransferWithAuthorization message, binds it to the asset's EIP-712
//! domain and signs it with the payer's local key. The key never leaves the
//! process; only the signature travels.

use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{
    Eip3009Authorization, PaymentPayload, PaymentRequirements, EXACT_SCHEME, X402_VERSION,
};

/// Default authorization validity window in seconds. Long enough to cover
/// network and settlement latency, short enough to bound replay exposure.
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 300;

/// x402 payment signer backed by a local wallet
pub struct X402Signer {
    wallet: LocalWallet,
    chain_id: u64,
    validity_window_secs: u64,
}

impl X402Signer {
    /// Create a signer from a private key (hex string, 0x prefix optional)
    pub fn new(private_key: &str, chain_id: u64) -> Result<Self, String> {
        let key_hex = private_key.strip_prefix("0x").unwrap_or(private_key);
        let key_bytes =
            hex::decode(key_hex).map_err(|e| format!("Invalid private key hex: {}", e))?;
        if key_bytes.len() != 32 {
            return Err(format!(
                "Private key must be 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| format!("Invalid private key: {}", e))?;

        let wallet = LocalWallet::from(signing_key).with_chain_id(chain_id);

        Ok(Self {
            wallet,
            chain_id,
            validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
        })
    }

    pub fn with_validity_window(mut self, secs: u64) -> Self {
        self.validity_window_secs = secs;
        self
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn address_string(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    /// Generate a fresh authorization nonce. Always 32 cryptographically
    /// random bytes, never derived from the payer or the amount.
    fn generate_nonce() -> Result<H256, String> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| format!("Failed to generate random nonce: {}", e))?;
        Ok(H256::from(bytes))
    }

    /// Sign a TransferWithAuthorization for the given payment requirements.
    /// Each call produces a single-use envelope: fresh nonce, fresh window.
    pub fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, String> {
        let to: Address = requirements
            .pay_to
            .parse()
            .map_err(|_| format!("Invalid payTo address: {}", requirements.pay_to))?;
        let verifying_contract: Address = requirements
            .asset
            .parse()
            .map_err(|_| format!("Invalid asset address: {}", requirements.asset))?;
        let value = U256::from_dec_str(&requirements.max_amount_required)
            .map_err(|_| format!("Invalid amount: {}", requirements.max_amount_required))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| format!("Time error: {}", e))?
            .as_secs();
        let valid_after = U256::from(now);
        let valid_before = U256::from(now + self.validity_window_secs);

        let nonce = Self::generate_nonce()?;

        let (name, version) = match &requirements.extra {
            Some(extra) => (extra.name.clone(), extra.version.clone()),
            None => ("USD Coin".to_string(), "2".to_string()),
        };
        let domain = Eip712Domain {
            name,
            version,
            chain_id: self.chain_id,
            verifying_contract,
        };

        let message = TransferWithAuthorizationMessage {
            from: self.wallet.address(),
            to,
            value,
            valid_after,
            valid_before,
            nonce,
        };

        let digest = eip3009_digest(&domain, &message);
        let signature = self
            .wallet
            .sign_hash(digest)
            .map_err(|e| format!("Failed to sign authorization: {}", e))?;

        Ok(PaymentPayload {
            x402_version: X402_VERSION,
            scheme: EXACT_SCHEME.to_string(),
            network: requirements.network.clone(),
            signature: format!("0x{}", hex::encode(signature.to_vec())),
            authorization: Eip3009Authorization {
                from: self.address_string(),
                to: requirements.pay_to.clone(),
                value: value.to_string(),
                valid_after: valid_after.to_string(),
                valid_before: valid_before.to_string(),
                nonce: format!("{:?}", nonce),
            },
        })
    }
}

/// EIP-712 domain of the asset contract
pub(crate) struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    fn separator(&self) -> H256 {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );

        let mut encoded = Vec::new();
        encoded.extend_from_slice(&type_hash);
        encoded.extend_from_slice(&keccak256(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.version.as_bytes()));
        encoded.extend_from_slice(&ethers::abi::encode(&[ethers::abi::Token::Uint(
            U256::from(self.chain_id),
        )]));
        encoded.extend_from_slice(&ethers::abi::encode(&[ethers::abi::Token::Address(
            self.verifying_contract,
        )]));

        H256::from(keccak256(&encoded))
    }
}

/// TransferWithAuthorization message fields (EIP-3009)
pub(crate) struct TransferWithAuthorizationMessage {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub valid_after: U256,
    pub valid_before: U256,
    pub nonce: H256,
}

impl TransferWithAuthorizationMessage {
    fn struct_hash(&self) -> H256 {
        let type_hash = keccak256(
            b"TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)",
        );

        let encoded = ethers::abi::encode(&[
            ethers::abi::Token::FixedBytes(type_hash.to_vec()),
            ethers::abi::Token::Address(self.from),
            ethers::abi::Token::Address(self.to),
            ethers::abi::Token::Uint(self.value),
            ethers::abi::Token::Uint(self.valid_after),
            ethers::abi::Token::Uint(self.valid_before),
            ethers::abi::Token::FixedBytes(self.nonce.as_bytes().to_vec()),
        ]);

        H256::from(keccak256(&encoded))
    }
}

/// keccak256("\x19\x01" ++ domainSeparator ++ structHash)
pub(crate) fn eip3009_digest(
    domain: &Eip712Domain,
    message: &TransferWithAuthorizationMessage,
) -> H256 {
    let mut to_sign = Vec::with_capacity(66);
    to_sign.push(0x19);
    to_sign.push(0x01);
    to_sign.extend_from_slice(domain.separator().as_bytes());
    to_sign.extend_from_slice(message.struct_hash().as_bytes());
    H256::from(keccak256(&to_sign))
}
