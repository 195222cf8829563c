#![warn(missing_docs)]

//! Capability-token verification.
//!
//! A capability token is a signed, self-contained credential: an issuer
//! DID, an audience, a list of `(resource, action)` capabilities, a
//! validity window, and a *proof chain* tracing the issuer's authority back
//! to a wallet-signed root statement. This crate is the server-side
//! verifier for such tokens — it never issues them.
//!
//! # Overview
//!
//! The verification flow:
//!
//! 1. Client presents a three-segment signed token as a bearer credential
//! 2. The verifier decodes it and checks the embedded-key signature
//! 3. Time bounds and the configured audience are enforced
//! 4. The token's capabilities must satisfy the configured requirement
//! 5. The proof chain is walked link by link — each delegation's audience
//!    must equal the previous issuer — down to a wallet-signed root
//! 6. On success, the root wallet's address is returned for identity lookup
//!
//! # Example
//!
//! ```ignore
//! use warden_ucan::{UcanConfig, UcanVerifier};
//!
//! let verifier = UcanVerifier::new(UcanConfig {
//!     enabled: true,
//!     audience: "did:web:files.example.com".into(),
//!     resource: "webdav".into(),
//!     action: "*".into(),
//!     ..UcanConfig::default()
//! });
//!
//! match verifier.verify_invocation(token) {
//!     Ok(address) => println!("authorized wallet: {address}"),
//!     Err(e) => eprintln!("verification failed: {e}"),
//! }
//! ```

mod capability;
pub use capability::*;

pub mod did;

mod error;
pub use error::*;

mod scope;
pub use scope::*;

mod siwe;

mod token;
pub use token::is_capability_token;

mod verify;
pub use verify::*;
