//! EIP-3009 token ABI encoding helpers
//!
//! Manual ABI encoding for the three token entry points the payment engine
//! touches, without the abigen! macro: `balanceOf`, `authorizationState`
//! and `transferWithAuthorization`.

use ethers::abi::{AbiDecode, Token};
use ethers::types::{Address, H256, U256};
use ethers::utils::id;

use super::types::SignedAuthorization;

/// Encode a balanceOf(address) call
pub fn encode_balance_of(address: Address) -> Vec<u8> {
    let mut data = id("balanceOf(address)").to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[Token::Address(address)]));
    data
}

/// Decode a balance response (uint256)
pub fn decode_balance(data: &[u8]) -> Result<U256, String> {
    if data.len() < 32 {
        return Err(format!("Balance response too short: {} bytes", data.len()));
    }
    U256::decode(data).map_err(|e| format!("Failed to decode balance: {}", e))
}

/// Encode an authorizationState(address,bytes32) call (EIP-3009 nonce state)
pub fn encode_authorization_state(authorizer: Address, nonce: H256) -> Vec<u8> {
    let mut data = id("authorizationState(address,bytes32)").to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[
        Token::Address(authorizer),
        Token::FixedBytes(nonce.as_bytes().to_vec()),
    ]));
    data
}

/// Decode a bool response (returned as a full 32-byte word)
pub fn decode_bool(data: &[u8]) -> Result<bool, String> {
    if data.len() < 32 {
        return Err(format!("Bool response too short: {} bytes", data.len()));
    }
    let value = U256::decode(data).map_err(|e| format!("Failed to decode bool: {}", e))?;
    Ok(!value.is_zero())
}

/// Encode a transferWithAuthorization call with split (v, r, s) signature
/// components, the standard EIP-3009 EOA entry point.
pub fn encode_transfer_with_authorization(auth: &SignedAuthorization) -> Result<Vec<u8>, String> {
    if auth.signature.len() != 65 {
        return Err(format!(
            "Signature must be 65 bytes, got {}",
            auth.signature.len()
        ));
    }

    let r = auth.signature[0..32].to_vec();
    let s = auth.signature[32..64].to_vec();
    // Some signers emit the recovery id as 0/1 instead of 27/28
    let v = match auth.signature[64] {
        raw @ 0..=1 => raw + 27,
        raw => raw,
    };

    let mut data = id(
        "transferWithAuthorization(address,address,uint256,uint256,uint256,bytes32,uint8,bytes32,bytes32)",
    )
    .to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[
        Token::Address(auth.from),
        Token::Address(auth.to),
        Token::Uint(auth.value),
        Token::Uint(auth.valid_after),
        Token::Uint(auth.valid_before),
        Token::FixedBytes(auth.nonce.as_bytes().to_vec()),
        Token::Uint(U256::from(v)),
        Token::FixedBytes(r),
        Token::FixedBytes(s),
    ]));
    Ok(data)
}
