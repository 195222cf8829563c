#![warn(missing_docs)]

//! Identity and authorization for a multi-tenant file-access server.
//!
//! This crate decides, for every inbound request, *who* is making it and
//! *what* they are allowed to do. Three credential schemes — password
//! identity, wallet signature challenge/response, and delegated capability
//! tokens — are unified behind one authenticator-dispatch contract, and a
//! path/operation permission engine turns the authenticated identity plus
//! the request into an allow/deny decision.
//!
//! The flow is one-way: request → [`extract_credential`] →
//! [`dispatch`] (which invokes the signature, claims, and capability
//! verifiers as needed, consulting the [`IdentityRepository`]) →
//! [`Identity`] → [`check`] → allow/deny.

mod authenticator;
pub use authenticator::*;

mod credentials;
pub use credentials::*;

mod error;
pub use error::*;

mod identity;
pub use identity::*;

mod login;
pub use login::*;

mod permission;
pub use permission::*;

mod repository;
pub use repository::*;
