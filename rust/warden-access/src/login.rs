//! Wallet and email login flows.
//!
//! These compose the challenge store, the signature verifier, the one-time
//! code store, and the token authority into the flows a login handler
//! exposes: issue a challenge, verify its signature, exchange refresh
//! tokens, and run the email-code dance.

use std::sync::Arc;

use serde::Serialize;

use warden_challenge::{Challenge, ChallengeError, ChallengeStore, CodeStore, OneTimeCode};
use warden_claims::{SubjectKind, TokenAuthority};

use crate::{AccessError, Identity, IdentityRepository, RepositoryError};

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: String,
    /// Long-lived refresh token.
    pub refresh: String,
}

/// Login orchestration over the stores, the verifiers, and the repository.
pub struct LoginService {
    repository: Arc<dyn IdentityRepository>,
    challenges: ChallengeStore,
    codes: CodeStore,
    authority: TokenAuthority,
    auto_provision: bool,
}

impl LoginService {
    /// Create a login service.
    ///
    /// `auto_provision` governs whether a verified principal with no
    /// identity record gets one created on first login.
    pub fn new(
        repository: Arc<dyn IdentityRepository>,
        challenges: ChallengeStore,
        codes: CodeStore,
        authority: TokenAuthority,
        auto_provision: bool,
    ) -> Self {
        Self {
            repository,
            challenges,
            codes,
            authority,
            auto_provision,
        }
    }

    /// Issue a signing challenge for a wallet address.
    pub fn issue_challenge(&self, address: &str) -> Result<Challenge, AccessError> {
        Ok(self.challenges.create(address)?)
    }

    /// Verify a signed challenge and mint a token pair.
    ///
    /// The challenge is consumed exactly once, and only on success — a
    /// failed signature leaves it in place for a retry within its TTL.
    pub async fn verify_challenge(
        &self,
        address: &str,
        signature: &str,
    ) -> Result<TokenPair, AccessError> {
        let address = warden_eth::normalize_address(address);
        let challenge = self
            .challenges
            .get(&address)
            .ok_or_else(|| ChallengeError::ExpiredOrMissing(address.clone()))?;

        warden_eth::verify_signature(&challenge.message, signature, &address)?;
        self.challenges.delete(&address);

        self.ensure_wallet_identity(&address).await?;
        Ok(TokenPair {
            access: self.authority.generate_access(&address)?,
            refresh: self.authority.generate_refresh(&address)?,
        })
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// The identity must still exist; refresh never provisions.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AccessError> {
        let subject = self.authority.verify_refresh(refresh_token)?;
        match subject.kind {
            SubjectKind::Wallet => {
                self.lookup(&subject.value, SubjectKind::Wallet).await?;
                Ok(TokenPair {
                    access: self.authority.generate_access(&subject.value)?,
                    refresh: self.authority.generate_refresh(&subject.value)?,
                })
            }
            SubjectKind::Email => {
                self.lookup(&subject.value, SubjectKind::Email).await?;
                Ok(TokenPair {
                    access: self.authority.generate_access_for_email(&subject.value)?,
                    refresh: self.authority.generate_refresh_for_email(&subject.value)?,
                })
            }
        }
    }

    /// Issue a one-time code for an email login. Handing the code to a
    /// mail transport is the caller's job.
    pub fn begin_email_login(&self, email: &str) -> OneTimeCode {
        self.codes.issue(email)
    }

    /// Verify a one-time code and mint an email-subject token pair.
    pub async fn complete_email_login(
        &self,
        email: &str,
        code: &str,
    ) -> Result<TokenPair, AccessError> {
        let email = email.to_lowercase();
        if !self.codes.verify(&email, code) {
            return Err(AccessError::InvalidCredentials);
        }

        match self.repository.find_by_email(&email).await {
            Ok(_) => {}
            Err(RepositoryError::NotFound) if self.auto_provision => {
                self.repository.save(&Identity::for_email(&email)).await?;
            }
            Err(RepositoryError::NotFound) => return Err(AccessError::UnknownIdentity),
            Err(e) => return Err(AccessError::Repository(e)),
        }

        Ok(TokenPair {
            access: self.authority.generate_access_for_email(&email)?,
            refresh: self.authority.generate_refresh_for_email(&email)?,
        })
    }

    async fn ensure_wallet_identity(&self, address: &str) -> Result<(), AccessError> {
        match self.repository.find_by_wallet_address(address).await {
            Ok(_) => Ok(()),
            Err(RepositoryError::NotFound) if self.auto_provision => {
                self.repository.save(&Identity::for_wallet(address)).await?;
                tracing::debug!(address, "provisioned identity on first login");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(AccessError::UnknownIdentity),
            Err(e) => Err(AccessError::Repository(e)),
        }
    }

    async fn lookup(&self, value: &str, kind: SubjectKind) -> Result<Identity, AccessError> {
        let found = match kind {
            SubjectKind::Wallet => self.repository.find_by_wallet_address(value).await,
            SubjectKind::Email => self.repository.find_by_email(value).await,
        };
        match found {
            Ok(identity) => Ok(identity),
            Err(RepositoryError::NotFound) => Err(AccessError::UnknownIdentity),
            Err(e) => Err(AccessError::Repository(e)),
        }
    }
}
