//! x402 protocol wire types
//!
//! Two payloads cross the wire, both as base64-encoded JSON:
//!
//! - `PaymentRequired` rides the `X-PAYMENT-REQUIRED` header of a 402
//!   response and tells the caller everything needed to construct a valid
//!   authorization: asset, payee, exact amount, resource, validity window.
//! - `PaymentPayload` rides the `X-PAYMENT` header of the retried request
//!   and carries the signed EIP-3009 authorization.
//!
//! Decoding is all-or-nothing: a payload either parses into the full schema
//! with every field structurally valid, or it is rejected.

use ethers::types::{Address, H256, U256};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

/// x402 protocol version
pub const X402_VERSION: u8 = 1;

/// The only payment scheme this server speaks
pub const EXACT_SCHEME: &str = "exact";

/// Payment requirements returned by the server in a 402 response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: u8,
    pub accepts: Vec<PaymentRequirements>,
    /// Reason a previously presented envelope was rejected, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// Exact price in asset minor units, as a decimal string
    pub max_amount_required: String,
    pub resource: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub pay_to: String,
    #[serde(default)]
    pub max_timeout_seconds: u64,
    pub asset: String,
    #[serde(default)]
    pub extra: Option<AssetDomain>,
}

/// EIP-712 domain parameters of the asset contract, advertised in the
/// challenge so a caller can sign without prior knowledge of the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDomain {
    pub name: String,
    pub version: String,
}

/// Signed payment envelope sent by the client in the X-PAYMENT header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u8,
    pub scheme: String,
    pub network: String,
    /// 65-byte secp256k1 signature, 0x-prefixed hex
    pub signature: String,
    pub authorization: Eip3009Authorization,
}

/// EIP-3009 TransferWithAuthorization fields as transported on the wire.
/// Numeric fields are decimal strings, the nonce is 0x-prefixed hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: String,
}

impl PaymentRequired {
    /// Encode for the X-PAYMENT-REQUIRED header
    pub fn to_base64(&self) -> Result<String, String> {
        let json = serde_json::to_string(self)
            .map_err(|e| format!("Failed to serialize payment requirements: {}", e))?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            json,
        ))
    }

    /// Decode from the X-PAYMENT-REQUIRED header
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let json = decode_base64_json(encoded)?;
        serde_json::from_str(&json)
            .map_err(|e| format!("Failed to parse payment requirements: {}", e))
    }
}

impl PaymentPayload {
    /// Encode for the X-PAYMENT header
    pub fn to_base64(&self) -> Result<String, String> {
        let json = serde_json::to_string(self)
            .map_err(|e| format!("Failed to serialize payment payload: {}", e))?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            json,
        ))
    }

    /// Decode from the X-PAYMENT header. Missing fields are rejected here;
    /// field-level structural validation happens in `SignedAuthorization`.
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let json = decode_base64_json(encoded)?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse payment payload: {}", e))
    }
}

fn decode_base64_json(encoded: &str) -> Result<String, String> {
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|e| format!("Invalid base64: {}", e))?;
    String::from_utf8(decoded).map_err(|e| format!("Invalid UTF-8: {}", e))
}

/// A fully validated payment authorization plus its signature.
/// This is the form the verifier and settlement path operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub valid_after: U256,
    pub valid_before: U256,
    pub nonce: H256,
    /// r || s || v, always 65 bytes
    pub signature: Vec<u8>,
}

impl TryFrom<&PaymentPayload> for SignedAuthorization {
    type Error = String;

    fn try_from(payload: &PaymentPayload) -> Result<Self, Self::Error> {
        if payload.x402_version != X402_VERSION {
            return Err(format!(
                "Unsupported x402 version: {}",
                payload.x402_version
            ));
        }
        if payload.scheme != EXACT_SCHEME {
            return Err(format!("Unsupported payment scheme: {}", payload.scheme));
        }

        let auth = &payload.authorization;
        Ok(SignedAuthorization {
            from: parse_address("from", &auth.from)?,
            to: parse_address("to", &auth.to)?,
            value: parse_u256("value", &auth.value)?,
            valid_after: parse_u256("validAfter", &auth.valid_after)?,
            valid_before: parse_u256("validBefore", &auth.valid_before)?,
            nonce: parse_nonce(&auth.nonce)?,
            signature: parse_signature(&payload.signature)?,
        })
    }
}

impl SignedAuthorization {
    /// Wrap back into a wire payload for the given network
    pub fn to_payload(&self, network: &str) -> PaymentPayload {
        PaymentPayload {
            x402_version: X402_VERSION,
            scheme: EXACT_SCHEME.to_string(),
            network: network.to_string(),
            signature: format!("0x{}", hex::encode(&self.signature)),
            authorization: Eip3009Authorization {
                from: format!("{:?}", self.from),
                to: format!("{:?}", self.to),
                value: self.value.to_string(),
                valid_after: self.valid_after.to_string(),
                valid_before: self.valid_before.to_string(),
                nonce: format!("{:?}", self.nonce),
            },
        }
    }
}

/// Parse an 0x-prefixed address. Mixed-case input must carry a valid
/// EIP-55 checksum; all-lowercase and all-uppercase hex are accepted as-is.
pub fn parse_address(field: &str, s: &str) -> Result<Address, String> {
    let addr: Address = s
        .parse()
        .map_err(|_| format!("Invalid address in '{}': {}", field, s))?;

    let body = s.strip_prefix("0x").unwrap_or(s);
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&addr, None) != s {
        return Err(format!("Bad address checksum in '{}': {}", field, s));
    }

    Ok(addr)
}

fn parse_u256(field: &str, s: &str) -> Result<U256, String> {
    U256::from_dec_str(s).map_err(|_| format!("Invalid decimal value in '{}': {}", field, s))
}

fn parse_nonce(s: &str) -> Result<H256, String> {
    let body = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("Nonce must be 0x-prefixed hex: {}", s))?;
    let bytes = hex::decode(body).map_err(|_| format!("Invalid nonce hex: {}", s))?;
    if bytes.len() != 32 {
        return Err(format!("Nonce must be 32 bytes, got {}", bytes.len()));
    }
    Ok(H256::from_slice(&bytes))
}

fn parse_signature(s: &str) -> Result<Vec<u8>, String> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(body).map_err(|_| "Invalid signature hex".to_string())?;
    if bytes.len() != 65 {
        return Err(format!("Signature must be 65 bytes, got {}", bytes.len()));
    }
    Ok(bytes)
}
