//! Error types and their HTTP status mapping.
//!
//! Every failure in this crate is surfaced to the HTTP layer as a coarse
//! 401 (authentication) or 403 (authorization); the finer-grained variants
//! exist for logging and observability, with one exception: a client is
//! allowed to distinguish "token expired" so it can attempt a refresh
//! instead of a full re-authentication.

use serde::Serialize;

use crate::Operation;
use crate::repository::RepositoryError;
use warden_challenge::ChallengeError;
use warden_claims::ClaimsError;
use warden_eth::EthError;
use warden_ucan::UcanError;

/// Errors produced by authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Credential extraction found nothing usable in the request.
    #[error("no usable credentials in request")]
    MissingCredentials,

    /// The presented credentials do not authenticate anyone.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authentication succeeded but no identity record matches the
    /// principal.
    #[error("no identity for authenticated principal")]
    UnknownIdentity,

    /// Wallet signature verification failed.
    #[error(transparent)]
    Signature(#[from] EthError),

    /// Challenge issuance or consumption failed.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    /// Bearer-claims verification failed.
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    /// Capability-token verification failed.
    #[error(transparent)]
    Ucan(#[from] UcanError),

    /// The identity's permissions do not allow the operation on the path.
    #[error("permission denied for {operation} on {path}")]
    PermissionDenied {
        /// The operation that was attempted.
        operation: Operation,
        /// The normalized request path.
        path: String,
    },

    /// A mutating operation targets a path whose parent does not exist as
    /// a directory.
    #[error("parent directory {0} does not exist")]
    ParentDirectoryMissing(String),

    /// The identity carries a regex rule, which this engine refuses to
    /// evaluate rather than silently downgrade to prefix semantics.
    #[error("regex rules are not supported (pattern {0})")]
    RegexRuleUnsupported(String),

    /// The identity repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Error codes returned to the HTTP layer.
///
/// Each code maps to an HTTP status via [`ErrorCode::status_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 400 Bad Request - input validation
    /// A request value (e.g. an address) is syntactically invalid.
    InvalidArgument,

    // 401 Unauthorized - authentication failures
    /// No usable or valid credentials.
    InvalidCredentials,
    /// A wallet or token signature did not verify.
    SignatureInvalid,
    /// The challenge is missing, consumed, or expired.
    ChallengeExpired,
    /// The token was valid once but has expired - refreshable.
    TokenExpired,
    /// The token is malformed, mistyped, or otherwise unacceptable.
    TokenInvalid,
    /// A token named an audience other than this service.
    AudienceMismatch,
    /// A delegation chain is missing, too deep, or broken.
    ProofChainInvalid,
    /// The chain root is not an Ethereum DID.
    IssuerNotEthereum,

    // 403 Forbidden - authorization failures
    /// The token's capabilities do not cover the requirement.
    CapabilityDenied,
    /// Path rules or default permissions deny the operation.
    PermissionDenied,
    /// The parent of the target path does not exist as a directory.
    ParentDirectoryMissing,

    // 500 Internal Server Error
    /// Repository failure or server-side misconfiguration.
    InternalError,
}

impl ErrorCode {
    /// The HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidArgument => 400,

            ErrorCode::InvalidCredentials
            | ErrorCode::SignatureInvalid
            | ErrorCode::ChallengeExpired
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::AudienceMismatch
            | ErrorCode::ProofChainInvalid
            | ErrorCode::IssuerNotEthereum => 401,

            ErrorCode::CapabilityDenied
            | ErrorCode::PermissionDenied
            | ErrorCode::ParentDirectoryMissing => 403,

            ErrorCode::InternalError => 500,
        }
    }
}

/// Service error with code and message, ready for an HTTP response body.
#[derive(Debug)]
pub struct ServiceError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServiceError {
    /// Create a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

impl From<AccessError> for ServiceError {
    fn from(err: AccessError) -> Self {
        let message = err.to_string();
        let code = match &err {
            AccessError::MissingCredentials | AccessError::InvalidCredentials => {
                ErrorCode::InvalidCredentials
            }
            AccessError::UnknownIdentity => ErrorCode::InvalidCredentials,

            AccessError::Signature(_) => ErrorCode::SignatureInvalid,

            AccessError::Challenge(ChallengeError::InvalidAddress(_)) => ErrorCode::InvalidArgument,
            AccessError::Challenge(ChallengeError::ExpiredOrMissing(_)) => {
                ErrorCode::ChallengeExpired
            }

            AccessError::Claims(ClaimsError::Expired) => ErrorCode::TokenExpired,
            AccessError::Claims(ClaimsError::Invalid(_)) => ErrorCode::TokenInvalid,

            AccessError::Ucan(ucan) => match ucan {
                UcanError::Expired => ErrorCode::TokenExpired,
                UcanError::InvalidSignature(_) => ErrorCode::SignatureInvalid,
                UcanError::AudienceMismatch { .. } => ErrorCode::AudienceMismatch,
                UcanError::CapabilityDenied(_) => ErrorCode::CapabilityDenied,
                UcanError::ProofChainInvalid(_) => ErrorCode::ProofChainInvalid,
                UcanError::NotEthereumDid(_) => ErrorCode::IssuerNotEthereum,
                UcanError::Disabled
                | UcanError::Malformed(_)
                | UcanError::UnsupportedAlgorithm(_)
                | UcanError::NotYetValid => ErrorCode::TokenInvalid,
            },

            AccessError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            AccessError::ParentDirectoryMissing(_) => ErrorCode::ParentDirectoryMissing,

            AccessError::RegexRuleUnsupported(_) => ErrorCode::InternalError,
            AccessError::Repository(RepositoryError::NotFound) => ErrorCode::InvalidCredentials,
            AccessError::Repository(_) => ErrorCode::InternalError,
        };
        ServiceError::new(code, message)
    }
}
