//! Identity records and path rules.

use serde::{Deserialize, Serialize};

/// Per-operation grants, evaluated by the permission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    /// May create new resources.
    pub create: bool,
    /// May read existing resources.
    pub read: bool,
    /// May modify existing resources.
    pub update: bool,
    /// May delete resources.
    pub delete: bool,
}

impl PermissionSet {
    /// Full create/read/update/delete access.
    pub const ALL: PermissionSet = PermissionSet {
        create: true,
        read: true,
        update: true,
        delete: true,
    };

    /// No access at all.
    pub const NONE: PermissionSet = PermissionSet {
        create: false,
        read: false,
        update: false,
        delete: false,
    };

    /// Read access only.
    pub const READ_ONLY: PermissionSet = PermissionSet {
        create: false,
        read: true,
        update: false,
        delete: false,
    };
}

/// A per-identity path rule, evaluated in declared order before the
/// identity's default permissions.
///
/// Regex rules exist in stored data but are refused at evaluation — see
/// [`crate::AccessError::RegexRuleUnsupported`]. A silent downgrade to
/// prefix semantics would widen or narrow access unpredictably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Rule {
    /// Applies to every path the rule path is a literal prefix of.
    Prefix {
        /// The path prefix, e.g. `/private`.
        path: String,
        /// Grants for matching paths.
        permissions: PermissionSet,
    },
    /// Accepted from storage, never evaluated.
    Regex {
        /// The stored pattern.
        pattern: String,
        /// Grants for matching paths.
        permissions: PermissionSet,
    },
}

/// A tenant identity.
///
/// Created and persisted by the external repository; the components in
/// this crate only ever read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier.
    pub id: String,
    /// Login name, also the display name.
    pub username: String,
    /// Argon2 PHC-format hash, when password login is enabled.
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Lowercase Ethereum address, when wallet login is enabled.
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// Lowercase email, when email login is enabled.
    #[serde(default)]
    pub email: Option<String>,
    /// Fallback grants when no rule matches.
    pub default_permissions: PermissionSet,
    /// Ordered path rules; first match wins.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Storage quota in bytes; carried opaquely for the file layer.
    #[serde(default)]
    pub quota_bytes: u64,
    /// Bytes in use; carried opaquely for the file layer.
    #[serde(default)]
    pub used_bytes: u64,
}

impl Identity {
    /// A fresh identity provisioned from a wallet address, as created on
    /// first successful challenge when auto-provisioning is enabled.
    pub fn for_wallet(address: &str) -> Self {
        let address = warden_eth::normalize_address(address);
        Self {
            id: address.clone(),
            username: address.clone(),
            password_hash: None,
            wallet_address: Some(address),
            email: None,
            default_permissions: PermissionSet::ALL,
            rules: Vec::new(),
            quota_bytes: 0,
            used_bytes: 0,
        }
    }

    /// A fresh identity provisioned from an email address.
    pub fn for_email(email: &str) -> Self {
        let email = email.to_lowercase();
        Self {
            id: email.clone(),
            username: email.clone(),
            password_hash: None,
            wallet_address: None,
            email: Some(email),
            default_permissions: PermissionSet::ALL,
            rules: Vec::new(),
            quota_bytes: 0,
            used_bytes: 0,
        }
    }
}
