//! Error types for bearer-claims verification.

/// Errors produced while verifying a bearer token.
///
/// Expiry is deliberately its own variant: it is the one failure a client
/// is allowed to distinguish, so it can attempt a refresh instead of a full
/// re-authentication.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    /// The token was valid once but its expiry has passed.
    #[error("token expired")]
    Expired,

    /// The token is malformed, declares the wrong algorithm or type, or
    /// fails MAC verification.
    #[error("invalid token: {0}")]
    Invalid(String),
}
