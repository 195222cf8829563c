//! Error types for capability-token verification.

/// Errors that can occur while verifying a capability token.
#[derive(Debug, thiserror::Error)]
pub enum UcanError {
    /// Capability tokens are disabled by configuration.
    #[error("capability tokens are disabled")]
    Disabled,

    /// The token cannot be decoded: wrong segment count, bad base64url,
    /// invalid JSON, an unresolvable issuer key, or a missing expiry.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The header declares a signature algorithm this verifier does not
    /// accept.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// Signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The token (or a chain link) has expired.
    #[error("token expired")]
    Expired,

    /// The token's not-before bound is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// The audience does not match what this link must be addressed to.
    #[error("audience mismatch: expected {expected}, got {got}")]
    AudienceMismatch {
        /// The audience this link had to name.
        expected: String,
        /// The audience it actually carries.
        got: String,
    },

    /// The token is structurally valid but its capabilities do not cover
    /// what is required.
    #[error("insufficient capabilities: {0}")]
    CapabilityDenied(String),

    /// The proof chain is missing, malformed, too deep, or has a broken
    /// link.
    #[error("invalid proof chain: {0}")]
    ProofChainInvalid(String),

    /// The chain terminates in an issuer that is not a `did:pkh:eth` DID.
    #[error("issuer {0} is not an ethereum DID")]
    NotEthereumDid(String),
}
