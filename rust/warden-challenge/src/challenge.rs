//! Wallet sign-in challenges.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::Serialize;
use warden_common::{Clock, SystemClock};

use crate::{ChallengeError, Sweeper};

/// Default lifetime of an unanswered challenge.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default cadence of the background expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A nonce-bearing message a wallet must sign to prove control of an
/// address.
///
/// The `message` is what the wallet signs; it must be reproduced
/// byte-for-byte at verification time, so it is stored here verbatim
/// rather than re-rendered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// The lowercase address this challenge is bound to. Not part of the
    /// client-facing shape — the client told us the address.
    #[serde(skip)]
    pub address: String,
    /// 256 bits of entropy, hex encoded.
    pub nonce: String,
    /// The plaintext the wallet signs.
    pub message: String,
    /// RFC 3339 issuance time, also embedded in `message`.
    pub issued_at: String,
    /// Absolute expiry, milliseconds since the UNIX epoch.
    pub expires_at: u64,
}

/// In-memory store of live challenges, one per address.
///
/// Reads expire lazily; the optional [`Sweeper`] bounds memory growth under
/// abandoned challenges. All operations take the internal lock briefly and
/// never block on I/O.
#[derive(Clone)]
pub struct ChallengeStore {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<String, Challenge>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ChallengeStore {
    /// Create a store with the given challenge lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a store reading time from the given clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                clock,
                ttl,
            }),
        }
    }

    /// Issue a fresh challenge for `address`, replacing any existing one.
    pub fn create(&self, address: &str) -> Result<Challenge, ChallengeError> {
        if !warden_eth::is_valid_address(address) {
            return Err(ChallengeError::InvalidAddress(address.to_string()));
        }
        let address = warden_eth::normalize_address(address);

        let mut nonce_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        let now = self.inner.clock.now();
        let issued_at =
            DateTime::<Utc>::from(now).to_rfc3339_opts(SecondsFormat::Millis, true);
        let expires_at = self.inner.clock.now_millis() + self.inner.ttl.as_millis() as u64;

        let challenge = Challenge {
            message: render_message(&address, &nonce, &issued_at),
            address: address.clone(),
            nonce,
            issued_at,
            expires_at,
        };

        self.inner
            .entries
            .lock()
            .insert(address, challenge.clone());
        Ok(challenge)
    }

    /// Look up the live challenge for `address`.
    ///
    /// Expired challenges are treated as absent without mutating the map;
    /// the sweep reclaims them.
    pub fn get(&self, address: &str) -> Option<Challenge> {
        let address = warden_eth::normalize_address(address);
        let now = self.inner.clock.now_millis();
        let entries = self.inner.entries.lock();
        entries
            .get(&address)
            .filter(|challenge| challenge.expires_at > now)
            .cloned()
    }

    /// Consume the challenge for `address`. Returns whether one existed.
    pub fn delete(&self, address: &str) -> bool {
        let address = warden_eth::normalize_address(address);
        self.inner.entries.lock().remove(&address).is_some()
    }

    /// Remove every expired entry, returning how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.inner.clock.now_millis();
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|_, challenge| challenge.expires_at > now);
        before - entries.len()
    }

    /// Spawn a background task sweeping every `every`.
    pub fn start_sweeper(&self, every: Duration) -> Sweeper {
        let store = self.clone();
        Sweeper::spawn(every, move || store.sweep())
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }
}

/// The plaintext presented to the wallet. Embeds the address, the nonce,
/// and the issuance timestamp; verification later recomputes nothing — the
/// stored copy is the source of truth.
fn render_message(address: &str, nonce: &str, issued_at: &str) -> String {
    format!(
        "{address} wants to sign in.\n\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\n\
         Signing this message proves you control this wallet. It will not \
         trigger a blockchain transaction or cost any gas fee."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use warden_common::ManualClock;

    const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn test_store(ttl: Duration) -> (ChallengeStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::from_system_now());
        let store = ChallengeStore::with_clock(ttl, clock.clone());
        (store, clock)
    }

    #[test]
    fn it_issues_and_returns_a_challenge() {
        let (store, _) = test_store(Duration::from_secs(60));
        let challenge = store.create(ADDRESS).unwrap();

        assert_eq!(challenge.address, ADDRESS.to_lowercase());
        assert_eq!(challenge.nonce.len(), 64);
        assert!(challenge.message.contains(&challenge.nonce));
        assert!(challenge.message.contains(&challenge.issued_at));
        assert!(challenge.message.contains("gas fee"));

        let fetched = store.get(ADDRESS).unwrap();
        assert_eq!(fetched.nonce, challenge.nonce);
    }

    #[test]
    fn it_rejects_invalid_addresses() {
        let (store, _) = test_store(Duration::from_secs(60));
        assert!(matches!(
            store.create("0x123"),
            Err(ChallengeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn it_overwrites_on_reissue() {
        let (store, _) = test_store(Duration::from_secs(60));
        let first = store.create(ADDRESS).unwrap();
        let second = store.create(ADDRESS).unwrap();
        assert_ne!(first.nonce, second.nonce);
        assert_eq!(store.get(ADDRESS).unwrap().nonce, second.nonce);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn it_is_absent_after_delete() {
        let (store, _) = test_store(Duration::from_secs(60));
        store.create(ADDRESS).unwrap();
        assert!(store.delete(ADDRESS));
        assert!(store.get(ADDRESS).is_none());
        assert!(!store.delete(ADDRESS));
    }

    #[test]
    fn it_never_returns_an_expired_challenge() {
        let (store, clock) = test_store(Duration::from_secs(60));
        store.create(ADDRESS).unwrap();
        clock.advance(Duration::from_secs(61));

        // Lazy expiry: no sweep has run, the entry is still in the map.
        assert_eq!(store.len(), 1);
        assert!(store.get(ADDRESS).is_none());
    }

    #[test]
    fn it_sweeps_expired_entries() {
        let (store, clock) = test_store(Duration::from_secs(60));
        store.create(ADDRESS).unwrap();
        store
            .create("0xde709f2102306220921060314715629080e2fb77")
            .unwrap();

        clock.advance(Duration::from_secs(61));
        assert_eq!(store.sweep(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn it_stops_the_sweeper_on_drop() {
        let (store, _) = test_store(Duration::from_secs(60));
        let sweeper = store.start_sweeper(Duration::from_secs(300));
        sweeper.stop();
        drop(sweeper);
    }
}
