//! Error types for the challenge store.

/// Errors produced while issuing or consuming challenges.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// A challenge was requested for a syntactically invalid address.
    #[error("invalid ethereum address: {0}")]
    InvalidAddress(String),

    /// No live challenge exists for the address; it was never issued,
    /// already consumed, or expired.
    #[error("challenge expired or missing for {0}")]
    ExpiredOrMissing(String),
}
