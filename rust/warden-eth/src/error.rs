//! Error types for signature recovery.

/// Errors produced while validating addresses or recovering signatures.
#[derive(Debug, thiserror::Error)]
pub enum EthError {
    /// The address is not `0x` followed by 40 hex characters.
    #[error("invalid ethereum address: {0}")]
    InvalidAddress(String),

    /// The signature is malformed or the public key cannot be recovered
    /// from it.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The signature is well-formed but was produced by a different key.
    #[error("recovered address {recovered} does not match {expected}")]
    SignatureMismatch {
        /// Address recovered from the signature.
        recovered: String,
        /// Address the caller expected.
        expected: String,
    },
}
