//! Token minting and verification.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use warden_common::{Clock, SystemClock};

use crate::{ClaimsError, Subject, SubjectKind};

type HmacSha256 = Hmac<Sha256>;

/// Fixed issuer claim stamped into every token this authority mints.
pub const ISSUER: &str = "warden";

/// The only MAC family this authority will ever sign with or accept.
const ALGORITHM: &str = "HS256";

/// Declared purpose of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived token exchanged for fresh access tokens.
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: u64,
    nbf: u64,
    exp: u64,
    /// Absent on tokens minted before types were introduced; see
    /// [`TokenAuthority::verify_access`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<TokenType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    knd: Option<SubjectKind>,
}

/// Mints and verifies bearer tokens under one shared secret.
///
/// Verification is a pure function of the token string, the secret, and the
/// clock; the authority holds no per-token state and is safe to share
/// across request handlers.
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Create an authority. The caller is responsible for supplying a
    /// secret of adequate length (≥ 32 bytes).
    pub fn new(secret: impl Into<Vec<u8>>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self::with_clock(secret, access_ttl, refresh_ttl, Arc::new(SystemClock))
    }

    /// Create an authority reading time from the given clock.
    pub fn with_clock(
        secret: impl Into<Vec<u8>>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
            clock,
        }
    }

    /// Mint an access token for a wallet address.
    pub fn generate_access(&self, address: &str) -> Result<String, ClaimsError> {
        self.mint(address, TokenType::Access, SubjectKind::Wallet, self.access_ttl)
    }

    /// Mint a refresh token for a wallet address.
    pub fn generate_refresh(&self, address: &str) -> Result<String, ClaimsError> {
        self.mint(address, TokenType::Refresh, SubjectKind::Wallet, self.refresh_ttl)
    }

    /// Mint an access token for an email subject.
    pub fn generate_access_for_email(&self, email: &str) -> Result<String, ClaimsError> {
        self.mint(email, TokenType::Access, SubjectKind::Email, self.access_ttl)
    }

    /// Mint a refresh token for an email subject.
    pub fn generate_refresh_for_email(&self, email: &str) -> Result<String, ClaimsError> {
        self.mint(email, TokenType::Refresh, SubjectKind::Email, self.refresh_ttl)
    }

    /// Verify `token` as an access token and return its subject.
    ///
    /// Tokens that declare no type at all predate token typing and are
    /// accepted here — and only here. The refresh path never honors them.
    pub fn verify_access(&self, token: &str) -> Result<Subject, ClaimsError> {
        let claims = self.verify(token)?;
        match claims.typ {
            Some(TokenType::Access) | None => Ok(subject_of(claims)),
            Some(TokenType::Refresh) => {
                Err(ClaimsError::Invalid("refresh token used as access".into()))
            }
        }
    }

    /// Verify `token` as a refresh token and return its subject.
    pub fn verify_refresh(&self, token: &str) -> Result<Subject, ClaimsError> {
        let claims = self.verify(token)?;
        match claims.typ {
            Some(TokenType::Refresh) => Ok(subject_of(claims)),
            _ => Err(ClaimsError::Invalid(
                "token is not a refresh token".into(),
            )),
        }
    }

    fn mint(
        &self,
        subject: &str,
        typ: TokenType,
        knd: SubjectKind,
        ttl: Duration,
    ) -> Result<String, ClaimsError> {
        let now = self.clock.now_secs();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: subject.to_lowercase(),
            iat: now,
            nbf: now,
            exp: now + ttl.as_secs(),
            typ: Some(typ),
            knd: Some(knd),
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let header = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header)
                .map_err(|e| ClaimsError::Invalid(format!("header encoding failed: {e}")))?,
        );
        let body = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| ClaimsError::Invalid(format!("claims encoding failed: {e}")))?,
        );

        let signature = self.sign(&header, &body)?;
        Ok(format!("{header}.{body}.{signature}"))
    }

    fn sign(&self, header: &str, body: &str) -> Result<String, ClaimsError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ClaimsError::Invalid(format!("unusable secret: {e}")))?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Structural, signature, and time checks shared by both verify paths.
    fn verify(&self, token: &str) -> Result<Claims, ClaimsError> {
        let mut segments = token.split('.');
        let (Some(header), Some(body), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimsError::Invalid("expected three segments".into()));
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|e| ClaimsError::Invalid(format!("header is not base64url: {e}")))?;
        let parsed: Header = serde_json::from_slice(&header_bytes)
            .map_err(|e| ClaimsError::Invalid(format!("header is not valid JSON: {e}")))?;
        if parsed.alg != ALGORITHM {
            return Err(ClaimsError::Invalid(format!(
                "unsupported algorithm {}",
                parsed.alg
            )));
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ClaimsError::Invalid(format!("unusable secret: {e}")))?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| ClaimsError::Invalid(format!("signature is not base64url: {e}")))?;
        mac.verify_slice(&signature_bytes)
            .map_err(|_| ClaimsError::Invalid("signature mismatch".into()))?;

        let body_bytes = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| ClaimsError::Invalid(format!("claims are not base64url: {e}")))?;
        let claims: Claims = serde_json::from_slice(&body_bytes)
            .map_err(|e| ClaimsError::Invalid(format!("claims are not valid JSON: {e}")))?;

        if claims.iss != ISSUER {
            return Err(ClaimsError::Invalid(format!(
                "unknown issuer {}",
                claims.iss
            )));
        }

        let now = self.clock.now_secs();
        if claims.nbf > now {
            return Err(ClaimsError::Invalid("token not yet valid".into()));
        }
        if claims.exp <= now {
            return Err(ClaimsError::Expired);
        }

        Ok(claims)
    }
}

fn subject_of(claims: Claims) -> Subject {
    Subject {
        value: claims.sub,
        // Tokens minted before subject kinds were introduced are all
        // wallet tokens.
        kind: claims.knd.unwrap_or(SubjectKind::Wallet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;
    use warden_common::ManualClock;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn test_authority() -> (TokenAuthority, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::from_system_now());
        let authority = TokenAuthority::with_clock(
            SECRET,
            Duration::from_secs(900),
            Duration::from_secs(86_400),
            clock.clone(),
        );
        (authority, clock)
    }

    #[test]
    fn it_round_trips_an_access_token() -> TestResult {
        let (authority, _) = test_authority();
        let token = authority.generate_access(ADDRESS)?;
        let subject = authority.verify_access(&token)?;
        assert_eq!(subject, Subject::wallet(ADDRESS.to_lowercase()));
        Ok(())
    }

    #[test]
    fn it_round_trips_a_refresh_token() -> TestResult {
        let (authority, _) = test_authority();
        let token = authority.generate_refresh(ADDRESS)?;
        let subject = authority.verify_refresh(&token)?;
        assert_eq!(subject.kind, SubjectKind::Wallet);
        Ok(())
    }

    #[test]
    fn it_preserves_email_subject_kind() -> TestResult {
        let (authority, _) = test_authority();
        let token = authority.generate_access_for_email("User@Example.com")?;
        let subject = authority.verify_access(&token)?;
        assert_eq!(subject, Subject::email("user@example.com"));
        Ok(())
    }

    #[test]
    fn it_rejects_cross_type_use() -> TestResult {
        let (authority, _) = test_authority();
        let access = authority.generate_access(ADDRESS)?;
        let refresh = authority.generate_refresh(ADDRESS)?;

        assert!(matches!(
            authority.verify_access(&refresh),
            Err(ClaimsError::Invalid(_))
        ));
        assert!(matches!(
            authority.verify_refresh(&access),
            Err(ClaimsError::Invalid(_))
        ));
        Ok(())
    }

    #[test]
    fn it_reports_expiry_distinctly() -> TestResult {
        let (authority, clock) = test_authority();
        let token = authority.generate_access(ADDRESS)?;
        clock.advance(Duration::from_secs(901));
        assert!(matches!(
            authority.verify_access(&token),
            Err(ClaimsError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn it_rejects_a_foreign_secret() -> TestResult {
        let (authority, _) = test_authority();
        let other = TokenAuthority::new(
            b"another-secret-another-secret-32".to_vec(),
            Duration::from_secs(900),
            Duration::from_secs(86_400),
        );
        let token = authority.generate_access(ADDRESS)?;
        assert!(matches!(
            other.verify_access(&token),
            Err(ClaimsError::Invalid(_))
        ));
        Ok(())
    }

    #[test]
    fn it_rejects_tampered_tokens() -> TestResult {
        let (authority, _) = test_authority();
        let token = authority.generate_access(ADDRESS)?;
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            authority.verify_access(&tampered),
            Err(ClaimsError::Invalid(_))
        ));
        Ok(())
    }

    /// Mint a token with an arbitrary header and claims body under the
    /// test secret, bypassing the public constructors.
    fn forge(authority: &TokenAuthority, header: &str, claims: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(header);
        let body = URL_SAFE_NO_PAD.encode(claims);
        let signature = authority.sign(&header, &body).unwrap();
        format!("{header}.{body}.{signature}")
    }

    #[test]
    fn it_accepts_legacy_untyped_tokens_as_access_only() {
        let (authority, clock) = test_authority();
        let now = clock.now_secs();
        let claims = format!(
            r#"{{"iss":"warden","sub":"{}","iat":{now},"nbf":{now},"exp":{}}}"#,
            ADDRESS.to_lowercase(),
            now + 600,
        );
        let token = forge(&authority, r#"{"alg":"HS256","typ":"JWT"}"#, &claims);

        let subject = authority.verify_access(&token).unwrap();
        assert_eq!(subject.kind, SubjectKind::Wallet);
        assert!(matches!(
            authority.verify_refresh(&token),
            Err(ClaimsError::Invalid(_))
        ));
    }

    #[test]
    fn it_rejects_foreign_algorithms() {
        let (authority, clock) = test_authority();
        let now = clock.now_secs();
        let claims = format!(
            r#"{{"iss":"warden","sub":"x","iat":{now},"nbf":{now},"exp":{}}}"#,
            now + 600,
        );
        for alg in ["none", "HS384", "RS256", "EdDSA"] {
            let header = format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#);
            let token = forge(&authority, &header, &claims);
            assert!(
                matches!(authority.verify_access(&token), Err(ClaimsError::Invalid(_))),
                "alg {alg} must be rejected",
            );
        }
    }

    #[test]
    fn it_rejects_not_yet_valid_tokens() {
        let (authority, clock) = test_authority();
        let now = clock.now_secs();
        let claims = format!(
            r#"{{"iss":"warden","sub":"x","iat":{now},"nbf":{},"exp":{},"typ":"access"}}"#,
            now + 300,
            now + 600,
        );
        let token = forge(&authority, r#"{"alg":"HS256","typ":"JWT"}"#, &claims);
        assert!(matches!(
            authority.verify_access(&token),
            Err(ClaimsError::Invalid(_))
        ));
    }
}
