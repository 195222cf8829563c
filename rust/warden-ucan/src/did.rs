//! DID parsing.
//!
//! Two DID methods appear in proof chains: `did:key` identifiers embedding
//! an ed25519 public key (delegation links), and `did:pkh:eth` identifiers
//! embedding an Ethereum address (the root). Parsing lives here, apart from
//! the signature checks that consume the parsed keys, so the codec and the
//! cryptography can be tested independently.

use base58::{FromBase58, ToBase58};
use ed25519_dalek::VerifyingKey;

/// `did:key` with the base58btc multibase prefix.
pub const DID_KEY_PREFIX: &str = "did:key:z";

/// `did:pkh` for an Ethereum address.
pub const DID_PKH_ETH_PREFIX: &str = "did:pkh:eth:";

/// Multicodec tag for an ed25519 public key.
const ED25519_PUB: [u8; 2] = [0xED, 0x01];

/// Errors produced while parsing a DID.
#[derive(Debug, thiserror::Error)]
pub enum DidError {
    /// The string is not a DID of the expected method.
    #[error("malformed DID: {0}")]
    Malformed(String),

    /// The multibase payload is not valid base58btc.
    #[error("base58 decoding failed")]
    InvalidBase58,

    /// The decoded key does not carry the ed25519-pub multicodec tag.
    #[error("not an ed25519-pub multicodec key")]
    UnsupportedCodec,

    /// The key bytes do not form a valid ed25519 public key.
    #[error("invalid ed25519 public key")]
    InvalidKey,

    /// The DID does not use the `did:pkh:eth` method.
    #[error("{0} is not an ethereum DID")]
    NotEthereum(String),
}

/// Decode the ed25519 public key embedded in a `did:key:z…` identifier.
///
/// The base58btc payload must be 34 bytes: the `0xED 0x01` multicodec tag
/// followed by the 32-byte key.
pub fn ed25519_key(did: &str) -> Result<VerifyingKey, DidError> {
    let payload = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| DidError::Malformed(did.to_string()))?;
    let decoded = FromBase58::from_base58(payload).map_err(|_| DidError::InvalidBase58)?;
    let raw: [u8; 34] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| DidError::InvalidKey)?;
    if raw[..2] != ED25519_PUB {
        return Err(DidError::UnsupportedCodec);
    }
    let key_bytes: [u8; 32] = raw[2..].try_into().map_err(|_| DidError::InvalidKey)?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|_| DidError::InvalidKey)
}

/// Render a verifying key as its `did:key:z…` identifier.
pub fn ed25519_did(key: &VerifyingKey) -> String {
    let mut raw = Vec::with_capacity(34);
    raw.extend_from_slice(&ED25519_PUB);
    raw.extend_from_slice(key.as_bytes());
    format!("{DID_KEY_PREFIX}{}", ToBase58::to_base58(raw.as_slice()))
}

/// Extract the lowercase Ethereum address from a `did:pkh:eth:…`
/// identifier.
pub fn eth_address(did: &str) -> Result<String, DidError> {
    let address = did
        .strip_prefix(DID_PKH_ETH_PREFIX)
        .ok_or_else(|| DidError::NotEthereum(did.to_string()))?;
    if !warden_eth::is_valid_address(address) {
        return Err(DidError::Malformed(did.to_string()));
    }
    Ok(warden_eth::normalize_address(address))
}

/// Render an address as its `did:pkh:eth:…` identifier.
pub fn eth_did(address: &str) -> String {
    format!("{DID_PKH_ETH_PREFIX}{}", warden_eth::normalize_address(address))
}
