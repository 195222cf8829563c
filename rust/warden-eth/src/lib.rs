#![warn(missing_docs)]

//! Ethereum wallet signature verification.
//!
//! Wallets prove control of an address by signing plaintext with the
//! personal-sign scheme (EIP-191): the message is prefixed with
//! `"\x19Ethereum Signed Message:\n" + length` before hashing, and the
//! 65-byte signature carries a recovery id that lets the verifier derive
//! the signing key without knowing it in advance. This crate recovers that
//! key and reduces it to the familiar lowercase `0x…` address form.

mod error;
pub use error::*;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Personal-sign signatures are `r || s || v`, 65 bytes, no more, no less.
const SIGNATURE_LEN: usize = 65;

/// Returns whether `address` is syntactically a valid Ethereum address:
/// `0x` followed by exactly 40 hex characters, case-insensitive.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize an address to the canonical lowercase form used for
/// comparison and storage throughout Warden.
pub fn normalize_address(address: &str) -> String {
    address.to_lowercase()
}

/// Recover the lowercase `0x…` address that signed `message` with the
/// personal-sign scheme.
///
/// `signature_hex` may carry a `0x` prefix. Legacy recovery ids (27/28)
/// are normalized to 0/1 before recovery.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, EthError> {
    let raw = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(raw)
        .map_err(|e| EthError::InvalidSignature(format!("signature is not hex: {e}")))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(EthError::InvalidSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| EthError::InvalidSignature(format!("malformed r||s: {e}")))?;

    let mut v = bytes[64];
    if v >= 27 {
        v -= 27;
    }
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| EthError::InvalidSignature(format!("recovery id {} out of range", bytes[64])))?;

    let key = VerifyingKey::recover_from_digest(
        personal_sign_digest(message),
        &signature,
        recovery_id,
    )
    .map_err(|e| EthError::InvalidSignature(format!("key recovery failed: {e}")))?;

    Ok(address_of_key(&key))
}

/// Verify that `message` was signed by the wallet holding
/// `expected_address`.
pub fn verify_signature(
    message: &str,
    signature_hex: &str,
    expected_address: &str,
) -> Result<(), EthError> {
    if !is_valid_address(expected_address) {
        return Err(EthError::InvalidAddress(expected_address.to_string()));
    }
    let recovered = recover_address(message, signature_hex)?;
    let expected = normalize_address(expected_address);
    if recovered != expected {
        return Err(EthError::SignatureMismatch {
            recovered,
            expected,
        });
    }
    Ok(())
}

/// The Keccak-256 digest of the EIP-191 prefixed message.
fn personal_sign_digest(message: &str) -> Keccak256 {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    hasher
}

/// Derive the lowercase `0x…` address from a recovered public key: the last
/// 20 bytes of the Keccak-256 hash of the uncompressed point (sans the
/// 0x04 tag byte).
fn address_of_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}
