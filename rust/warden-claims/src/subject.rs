//! Token subjects.

use serde::{Deserialize, Serialize};

/// What kind of principal a token's subject names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    /// The subject is a lowercase Ethereum address.
    Wallet,
    /// The subject is a lowercase email address.
    Email,
}

/// A verified token subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// The lowercase address or email.
    pub value: String,
    /// Which namespace `value` belongs to.
    pub kind: SubjectKind,
}

impl Subject {
    /// A wallet-address subject.
    pub fn wallet(address: impl Into<String>) -> Self {
        Self {
            value: address.into(),
            kind: SubjectKind::Wallet,
        }
    }

    /// An email subject.
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            value: email.into(),
            kind: SubjectKind::Email,
        }
    }
}
