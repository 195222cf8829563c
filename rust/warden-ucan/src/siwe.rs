//! Wallet-signed root proofs.
//!
//! The last link of every proof chain is a plaintext statement signed by a
//! wallet. The statement embeds a machine-parseable block — audience,
//! capabilities, expiry, optional not-before — so the granted authority is
//! visible in the very text the wallet displayed at signing time. Fields
//! parsed out of the message override the proof envelope's copies; the
//! envelope alone still verifies for issuers that never learned to embed
//! the block.

use chrono::DateTime;
use serde::Deserialize;
use warden_common::to_millis;

use crate::Capability;

/// The only root-proof type this verifier accepts.
pub(crate) const ROOT_PROOF_TYPE: &str = "siwe";

/// A root proof as carried in a token's `prf` list.
#[derive(Debug, Deserialize)]
pub(crate) struct RootProof {
    pub typ: String,
    /// `did:pkh:eth:…` naming the wallet that signed `msg`.
    pub iss: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub att: Option<Vec<Capability>>,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,
    /// The plaintext the wallet signed.
    pub msg: String,
    /// Personal-sign signature over `msg`, hex.
    pub sig: String,
}

/// Fields recovered from the statement block inside a signed message.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Statement {
    pub audience: Option<String>,
    pub capabilities: Option<Vec<Capability>>,
    /// Milliseconds since the UNIX epoch.
    pub expires_at: Option<u64>,
    pub not_before: Option<u64>,
}

impl Statement {
    /// Merge the statement over a proof envelope, statement fields winning.
    pub fn resolve_over(self, proof: &RootProof) -> Statement {
        Statement {
            audience: self.audience.or_else(|| proof.aud.clone()),
            capabilities: self.capabilities.or_else(|| proof.att.clone()),
            expires_at: self.expires_at.or(proof.exp.map(to_millis)),
            not_before: self.not_before.or(proof.nbf.map(to_millis)),
        }
    }
}

/// Parse the labeled lines of the statement block out of a signed message.
///
/// Recognized labels: `Audience:`, `Capabilities:` (comma-separated
/// `resource#action` items), `Expiration Time:` and `Not Before:`
/// (RFC 3339). Unrecognized lines are free text and ignored.
pub(crate) fn parse_statement(message: &str) -> Statement {
    let mut statement = Statement::default();
    for line in message.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Audience:") {
            statement.audience = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Capabilities:") {
            statement.capabilities = Some(parse_capability_list(value));
        } else if let Some(value) = line.strip_prefix("Expiration Time:") {
            statement.expires_at = parse_rfc3339_millis(value);
        } else if let Some(value) = line.strip_prefix("Not Before:") {
            statement.not_before = parse_rfc3339_millis(value);
        }
    }
    statement
}

fn parse_capability_list(value: &str) -> Vec<Capability> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('#') {
            Some((resource, action)) => Capability::new(resource, action),
            None => Capability::new(item, "*"),
        })
        .collect()
}

fn parse_rfc3339_millis(value: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|at| at.timestamp_millis().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_a_full_statement_block() {
        let message = "\
            I am granting access to my files.\n\
            \n\
            Audience: did:key:zAgent\n\
            Capabilities: app:dapp.example.com#write, webdav#read\n\
            Expiration Time: 2026-01-01T00:00:00Z\n\
            Not Before: 2025-01-01T00:00:00Z\n";

        let statement = parse_statement(message);
        assert_eq!(statement.audience.as_deref(), Some("did:key:zAgent"));
        assert_eq!(
            statement.capabilities,
            Some(vec![
                Capability::new("app:dapp.example.com", "write"),
                Capability::new("webdav", "read"),
            ])
        );
        assert_eq!(statement.expires_at, Some(1_767_225_600_000));
        assert_eq!(statement.not_before, Some(1_735_689_600_000));
    }

    #[test]
    fn it_defaults_actionless_items_to_wildcard() {
        let statement = parse_statement("Capabilities: webdav\n");
        assert_eq!(
            statement.capabilities,
            Some(vec![Capability::new("webdav", "*")])
        );
    }

    #[test]
    fn it_ignores_free_text() {
        let statement = parse_statement("Hello there.\nNothing else.\n");
        assert_eq!(statement, Statement::default());
    }

    #[test]
    fn it_prefers_statement_fields_over_the_envelope() {
        let proof = RootProof {
            typ: ROOT_PROOF_TYPE.into(),
            iss: "did:pkh:eth:0x52908400098527886e0f7030069857d2e4169ee7".into(),
            aud: Some("did:key:zEnvelope".into()),
            att: Some(vec![Capability::new("webdav", "read")]),
            exp: Some(1_700_000_000),
            nbf: None,
            msg: String::new(),
            sig: String::new(),
        };

        let resolved = parse_statement("Audience: did:key:zStatement\n").resolve_over(&proof);
        assert_eq!(resolved.audience.as_deref(), Some("did:key:zStatement"));
        // Envelope fills what the statement leaves out, seconds normalized
        // to milliseconds.
        assert_eq!(resolved.expires_at, Some(1_700_000_000_000));
        assert_eq!(
            resolved.capabilities,
            Some(vec![Capability::new("webdav", "read")])
        );
    }
}
