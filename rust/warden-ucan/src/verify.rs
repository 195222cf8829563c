//! Capability-token verification.
//!
//! This module handles:
//! 1. Signature verification against the issuer's `did:key`
//! 2. Time-bound and audience checks
//! 3. Capability matching against the configured requirement
//! 4. Proof-chain validation down to the wallet-signed root

use std::sync::Arc;

use ed25519_dalek::{Signature, Verifier as _};
use warden_common::{Clock, SystemClock, to_millis};

use crate::did;
use crate::siwe::{ROOT_PROOF_TYPE, RootProof, parse_statement};
use crate::token::{DecodedToken, EDDSA, decode};
use crate::{Capability, CapabilityScope, DEFAULT_APP_PREFIX, UcanError, extract_scope, satisfies_all};

/// Delegation chains longer than this are rejected outright. The bound
/// turns attacker-controlled recursion into a bounded walk.
const MAX_PROOF_DEPTH: usize = 8;

/// Construction-time configuration for the verifier.
#[derive(Debug, Clone)]
pub struct UcanConfig {
    /// Whether capability tokens are accepted at all.
    pub enabled: bool,
    /// The audience every presented token must name — this service.
    pub audience: String,
    /// Required resource pattern; empty widens to `"*"`.
    pub resource: String,
    /// Required action pattern; empty widens to `"*"`.
    pub action: String,
    /// Resource prefix marking app-scoped capabilities.
    pub app_prefix: String,
}

impl Default for UcanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            audience: String::new(),
            resource: String::new(),
            action: String::new(),
            app_prefix: DEFAULT_APP_PREFIX.to_string(),
        }
    }
}

/// State-free verifier for capability tokens.
///
/// Pure function of the token, the configuration, and the clock; safe to
/// share across request handlers without locking.
#[derive(Clone)]
pub struct UcanVerifier {
    enabled: bool,
    audience: String,
    required: Vec<Capability>,
    app_prefix: String,
    clock: Arc<dyn Clock>,
}

impl UcanVerifier {
    /// Create a verifier from configuration.
    pub fn new(config: UcanConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a verifier reading time from the given clock.
    pub fn with_clock(config: UcanConfig, clock: Arc<dyn Clock>) -> Self {
        // Both halves empty means no capability requirement at all — only
        // structural and signature verification.
        let required = if config.resource.is_empty() && config.action.is_empty() {
            Vec::new()
        } else {
            vec![Capability::new(config.resource, config.action)]
        };
        Self {
            enabled: config.enabled,
            audience: config.audience,
            required,
            app_prefix: config.app_prefix,
            clock,
        }
    }

    /// The audience presented tokens must be addressed to.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Verify a presented token end to end and return the lowercase
    /// Ethereum address of the wallet at the root of its proof chain.
    pub fn verify_invocation(&self, token: &str) -> Result<String, UcanError> {
        if !self.enabled {
            return Err(UcanError::Disabled);
        }
        let now_ms = self.clock.now_millis();
        let decoded = decode(token)?;
        self.check_token(&decoded, &self.audience, &self.required, now_ms)?;
        self.verify_chain(&decoded, &decoded.payload.prf, now_ms, 0)
    }

    /// Extract the app scope declared by an already-verified token.
    pub fn extract_app_scope(&self, token: &str) -> Result<CapabilityScope, UcanError> {
        let decoded = decode(token)?;
        Ok(extract_scope(&decoded.payload.att, &self.app_prefix))
    }

    /// Per-token checks shared by the invocation and every chain link:
    /// algorithm, signature, time bounds, audience, capabilities.
    fn check_token(
        &self,
        token: &DecodedToken,
        expected_audience: &str,
        required: &[Capability],
        now_ms: u64,
    ) -> Result<(), UcanError> {
        if token.header.alg != EDDSA {
            return Err(UcanError::UnsupportedAlgorithm(token.header.alg.clone()));
        }

        let key = did::ed25519_key(&token.payload.iss).map_err(|e| {
            UcanError::Malformed(format!(
                "cannot resolve issuer key from {}: {e}",
                token.payload.iss
            ))
        })?;
        let signature = Signature::from_slice(&token.signature)
            .map_err(|e| UcanError::InvalidSignature(format!("malformed signature: {e}")))?;
        key.verify(token.signing_input.as_bytes(), &signature)
            .map_err(|e| UcanError::InvalidSignature(e.to_string()))?;

        if let Some(nbf) = token.payload.nbf {
            if to_millis(nbf) > now_ms {
                return Err(UcanError::NotYetValid);
            }
        }
        if expiry_of(token)? <= now_ms {
            return Err(UcanError::Expired);
        }

        if token.payload.aud != expected_audience {
            return Err(UcanError::AudienceMismatch {
                expected: expected_audience.to_string(),
                got: token.payload.aud.clone(),
            });
        }

        satisfies_all(required, &token.payload.att).map_err(|unmet| {
            tracing::debug!(%unmet, issuer = %token.payload.iss, "capability requirement unmet");
            UcanError::CapabilityDenied(unmet.to_string())
        })?;

        Ok(())
    }

    /// Walk the proof chain of `current`.
    ///
    /// Each link is either another token — whose audience must equal the
    /// current issuer, whose capabilities must cover the current ones, and
    /// whose expiry must not precede the current one — or the wallet-signed
    /// root. A token with no traceable root never verifies.
    fn verify_chain(
        &self,
        current: &DecodedToken,
        proofs: &[serde_json::Value],
        now_ms: u64,
        depth: usize,
    ) -> Result<String, UcanError> {
        if depth >= MAX_PROOF_DEPTH {
            return Err(UcanError::ProofChainInvalid(
                "proof chain exceeds the maximum delegation depth".into(),
            ));
        }
        let (first, siblings) = proofs.split_first().ok_or_else(|| {
            UcanError::ProofChainInvalid("capability token carries no proof".into())
        })?;

        match first {
            serde_json::Value::String(inner_token) => {
                let inner = decode(inner_token)
                    .map_err(|e| UcanError::ProofChainInvalid(format!("proof link: {e}")))?;
                self.check_token(&inner, &current.payload.iss, &current.payload.att, now_ms)?;
                if expiry_of(&inner)? < expiry_of(current)? {
                    return Err(UcanError::ProofChainInvalid(
                        "proof expires before the token it vouches for".into(),
                    ));
                }
                if inner.payload.prf.is_empty() {
                    // An inner token without proofs of its own leans on the
                    // remaining siblings to reach the root.
                    self.verify_chain(&inner, siblings, now_ms, depth + 1)
                } else {
                    self.verify_chain(&inner, &inner.payload.prf, now_ms, depth + 1)
                }
            }
            serde_json::Value::Object(_) => self.check_root(first, current, now_ms),
            _ => Err(UcanError::ProofChainInvalid(
                "proof entry is neither a token nor a root proof".into(),
            )),
        }
    }

    /// Verify the wallet-signed root and return the wallet's address.
    fn check_root(
        &self,
        value: &serde_json::Value,
        current: &DecodedToken,
        now_ms: u64,
    ) -> Result<String, UcanError> {
        let proof: RootProof = serde_json::from_value(value.clone())
            .map_err(|e| UcanError::ProofChainInvalid(format!("malformed root proof: {e}")))?;
        if proof.typ != ROOT_PROOF_TYPE {
            return Err(UcanError::ProofChainInvalid(format!(
                "unsupported root proof type {}",
                proof.typ
            )));
        }

        let address =
            did::eth_address(&proof.iss).map_err(|_| UcanError::NotEthereumDid(proof.iss.clone()))?;
        warden_eth::verify_signature(&proof.msg, &proof.sig, &address)
            .map_err(|e| UcanError::InvalidSignature(format!("root proof: {e}")))?;

        let statement = parse_statement(&proof.msg).resolve_over(&proof);
        let audience = statement.audience.ok_or_else(|| {
            UcanError::ProofChainInvalid("root proof declares no audience".into())
        })?;
        let capabilities = statement.capabilities.ok_or_else(|| {
            UcanError::ProofChainInvalid("root proof declares no capabilities".into())
        })?;
        let expires_at = statement.expires_at.ok_or_else(|| {
            UcanError::ProofChainInvalid("root proof declares no expiry".into())
        })?;

        if let Some(nbf) = statement.not_before {
            if nbf > now_ms {
                return Err(UcanError::NotYetValid);
            }
        }
        if expires_at <= now_ms {
            return Err(UcanError::Expired);
        }
        if audience != current.payload.iss {
            return Err(UcanError::AudienceMismatch {
                expected: current.payload.iss.clone(),
                got: audience,
            });
        }
        satisfies_all(&current.payload.att, &capabilities)
            .map_err(|unmet| UcanError::CapabilityDenied(unmet.to_string()))?;
        if expires_at < expiry_of(current)? {
            return Err(UcanError::ProofChainInvalid(
                "root proof expires before the token it vouches for".into(),
            ));
        }

        Ok(address)
    }
}

/// A token's expiry in milliseconds; a token without one never verifies.
fn expiry_of(token: &DecodedToken) -> Result<u64, UcanError> {
    token
        .payload
        .exp
        .map(to_millis)
        .ok_or_else(|| UcanError::Malformed("token declares no expiry".into()))
}
