#![warn(missing_docs)]

//! Short-lived, single-use secrets for login flows.
//!
//! Two stores live here: the [`ChallengeStore`], which issues nonce-bearing
//! messages a wallet signs to prove control of an address, and the
//! [`CodeStore`], which issues six-digit one-time codes for email login.
//! Both hold their entries in memory behind a mutex, expire entries lazily
//! on read, and can run a periodic background sweep so abandoned entries do
//! not accumulate. Mail transport is the caller's concern; only the
//! generation and expiry contract lives here.

mod challenge;
pub use challenge::*;

mod code;
pub use code::*;

mod error;
pub use error::*;

mod sweep;
pub use sweep::*;
