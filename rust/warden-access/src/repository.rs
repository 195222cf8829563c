//! The identity-persistence contract.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::Identity;

/// Errors an identity repository can return.
///
/// `NotFound` is a sentinel the callers branch on; everything else is a
/// transport failure surfaced as a server error.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No record matches the lookup.
    #[error("identity not found")]
    NotFound,

    /// The backing store failed.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for identity records, implemented by the surrounding
/// application. Lookups happen on the request path and must honor
/// cancellation like any other future.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Look up by login name.
    async fn find_by_username(&self, username: &str) -> Result<Identity, RepositoryError>;
    /// Look up by lowercase wallet address.
    async fn find_by_wallet_address(&self, address: &str) -> Result<Identity, RepositoryError>;
    /// Look up by lowercase email.
    async fn find_by_email(&self, email: &str) -> Result<Identity, RepositoryError>;
    /// Look up by stable id.
    async fn find_by_id(&self, id: &str) -> Result<Identity, RepositoryError>;
    /// Insert or update a record.
    async fn save(&self, identity: &Identity) -> Result<(), RepositoryError>;
}

/// An in-memory repository for tests and embedded deployments.
#[derive(Default)]
pub struct MemoryIdentityRepository {
    records: Mutex<HashMap<String, Identity>>,
}

impl MemoryIdentityRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn find<F>(&self, predicate: F) -> Result<Identity, RepositoryError>
    where
        F: Fn(&Identity) -> bool,
    {
        self.records
            .lock()
            .values()
            .find(|identity| predicate(identity))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_username(&self, username: &str) -> Result<Identity, RepositoryError> {
        self.find(|identity| identity.username == username)
    }

    async fn find_by_wallet_address(&self, address: &str) -> Result<Identity, RepositoryError> {
        let address = warden_eth::normalize_address(address);
        self.find(|identity| identity.wallet_address.as_deref() == Some(address.as_str()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Identity, RepositoryError> {
        let email = email.to_lowercase();
        self.find(|identity| identity.email.as_deref() == Some(email.as_str()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Identity, RepositoryError> {
        self.records
            .lock()
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save(&self, identity: &Identity) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .insert(identity.id.clone(), identity.clone());
        Ok(())
    }
}
