#![warn(missing_docs)]

//! Stateless bearer tokens.
//!
//! The [`TokenAuthority`] mints and verifies compact signed claims: three
//! base64url segments (header, claims, MAC) authenticated with HMAC-SHA-256
//! under a shared secret. A token declares its *type* (access or refresh)
//! and its *subject kind* (wallet address or email); verification rejects
//! any cross-type use, and the declared algorithm is pinned so a token
//! cannot talk the verifier into a weaker scheme. Tokens are never
//! persisted — their existence is entirely encoded in the string itself.

mod authority;
pub use authority::*;

mod error;
pub use error::*;

mod subject;
pub use subject::*;
