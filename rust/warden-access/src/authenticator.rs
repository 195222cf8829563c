//! Authenticator dispatch.
//!
//! A closed set of authenticators, each declaring which credential shape
//! it handles. Dispatch invokes the first capable one and propagates its
//! error verbatim — capability, not success, determines the single
//! attempt; there is no fallthrough to a second authenticator after a
//! capable one has failed.

use std::sync::Arc;

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier as _};

use warden_claims::{SubjectKind, TokenAuthority};
use warden_ucan::{CapabilityScope, UcanVerifier, is_capability_token};

use crate::{AccessError, Credential, Identity, IdentityRepository, RepositoryError};

/// The result of a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// The authenticated identity.
    pub identity: Identity,
    /// App-capability scope, attached only when the credential was a
    /// capability token. Plain bearer tokens never carry one.
    pub scope: Option<CapabilityScope>,
}

/// Verifies HTTP Basic credentials against stored password hashes.
pub struct PasswordAuthenticator {
    repository: Arc<dyn IdentityRepository>,
}

impl PasswordAuthenticator {
    /// Create an authenticator backed by the given repository.
    pub fn new(repository: Arc<dyn IdentityRepository>) -> Self {
        Self { repository }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthOutcome, AccessError> {
        let identity = match self.repository.find_by_username(username).await {
            Ok(identity) => identity,
            // An unknown user and a wrong password are indistinguishable
            // to the caller.
            Err(RepositoryError::NotFound) => return Err(AccessError::InvalidCredentials),
            Err(e) => return Err(AccessError::Repository(e)),
        };
        let Some(stored) = identity.password_hash.as_deref() else {
            return Err(AccessError::InvalidCredentials);
        };
        let parsed = PasswordHash::new(stored).map_err(|_| AccessError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AccessError::InvalidCredentials)?;

        Ok(AuthOutcome {
            identity,
            scope: None,
        })
    }
}

/// Verifies bearer credentials: capability tokens first, plain
/// access-claims tokens otherwise.
pub struct BearerAuthenticator {
    repository: Arc<dyn IdentityRepository>,
    authority: TokenAuthority,
    ucan: UcanVerifier,
    auto_provision: bool,
}

impl BearerAuthenticator {
    /// Create an authenticator.
    ///
    /// `auto_provision` is a caller policy, not a verifier decision: when
    /// set, a verified wallet principal with no identity record gets one
    /// created on the fly.
    pub fn new(
        repository: Arc<dyn IdentityRepository>,
        authority: TokenAuthority,
        ucan: UcanVerifier,
        auto_provision: bool,
    ) -> Self {
        Self {
            repository,
            authority,
            ucan,
            auto_provision,
        }
    }

    async fn authenticate(&self, token: &str) -> Result<AuthOutcome, AccessError> {
        if is_capability_token(token) {
            let address = self.ucan.verify_invocation(token)?;
            let identity = self.lookup_wallet(&address).await?;
            let scope = self.ucan.extract_app_scope(token)?;
            tracing::debug!(user = %identity.username, "authenticated via capability token");
            return Ok(AuthOutcome {
                identity,
                scope: Some(scope),
            });
        }

        let subject = self.authority.verify_access(token)?;
        let identity = match subject.kind {
            SubjectKind::Wallet => self.lookup_wallet(&subject.value).await?,
            SubjectKind::Email => match self.repository.find_by_email(&subject.value).await {
                Ok(identity) => identity,
                Err(RepositoryError::NotFound) => return Err(AccessError::UnknownIdentity),
                Err(e) => return Err(AccessError::Repository(e)),
            },
        };
        Ok(AuthOutcome {
            identity,
            scope: None,
        })
    }

    async fn lookup_wallet(&self, address: &str) -> Result<Identity, AccessError> {
        match self.repository.find_by_wallet_address(address).await {
            Ok(identity) => Ok(identity),
            Err(RepositoryError::NotFound) if self.auto_provision => {
                let identity = Identity::for_wallet(address);
                self.repository.save(&identity).await?;
                tracing::debug!(address, "provisioned identity on first sight");
                Ok(identity)
            }
            Err(RepositoryError::NotFound) => Err(AccessError::UnknownIdentity),
            Err(e) => Err(AccessError::Repository(e)),
        }
    }
}

/// The closed set of authenticators dispatch can route to.
pub enum Authenticator {
    /// Handles `Credential::Basic`.
    Password(PasswordAuthenticator),
    /// Handles `Credential::Bearer`.
    Bearer(BearerAuthenticator),
}

impl Authenticator {
    /// Whether this authenticator can handle the credential's shape.
    pub fn handles(&self, credential: &Credential) -> bool {
        matches!(
            (self, credential),
            (Authenticator::Password(_), Credential::Basic { .. })
                | (Authenticator::Bearer(_), Credential::Bearer(_))
        )
    }

    /// Authenticate the credential. Callers must have checked
    /// [`Authenticator::handles`]; a shape mismatch is invalid
    /// credentials.
    pub async fn authenticate(&self, credential: &Credential) -> Result<AuthOutcome, AccessError> {
        match (self, credential) {
            (Authenticator::Password(inner), Credential::Basic { username, password }) => {
                inner.authenticate(username, password).await
            }
            (Authenticator::Bearer(inner), Credential::Bearer(token)) => {
                inner.authenticate(token).await
            }
            _ => Err(AccessError::InvalidCredentials),
        }
    }
}

/// Route a credential to the first authenticator that declares itself
/// capable, propagating that authenticator's result verbatim.
pub async fn dispatch(
    authenticators: &[Authenticator],
    credential: &Credential,
) -> Result<AuthOutcome, AccessError> {
    for authenticator in authenticators {
        if authenticator.handles(credential) {
            return authenticator.authenticate(credential).await;
        }
    }
    Err(AccessError::InvalidCredentials)
}
