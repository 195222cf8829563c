//! One-time email login codes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use warden_common::{Clock, SystemClock};

use crate::Sweeper;

/// Default lifetime of an unused code.
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(15 * 60);

/// A pending login code bound to an email address.
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    /// Lowercase email the code was issued for.
    pub email: String,
    /// Exactly six ASCII digits.
    pub code: String,
    /// Absolute expiry, milliseconds since the UNIX epoch.
    pub expires_at: u64,
}

/// In-memory store of pending login codes, one per email.
///
/// Same shape as the challenge store: lazy expiry on read, one-time
/// consumption on successful verification, periodic sweep for the rest.
#[derive(Clone)]
pub struct CodeStore {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<String, OneTimeCode>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CodeStore {
    /// Create a store with the given code lifetime.
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

    /// Issue a fresh code for `email`, replacing any existing one.
    pub fn issue(&self, email: &str) -> OneTimeCode {
        let email = email.to_lowercase();
        let code = OneTimeCode {
            email: email.clone(),
            code: generate_code(),
            expires_at: self.inner.clock.now_millis() + self.inner.ttl.as_millis() as u64,
        };
        self.inner.entries.lock().insert(email, code.clone());
        code
    }

    /// Check `code` against the pending entry for `email`, consuming it on
    /// success. Expired or absent entries and mismatched codes all return
    /// `false`.
    pub fn verify(&self, email: &str, code: &str) -> bool {
        let email = email.to_lowercase();
        let now = self.inner.clock.now_millis();
        let mut entries = self.inner.entries.lock();
        match entries.get(&email) {
            Some(pending) if pending.expires_at > now && pending.code == code => {
                entries.remove(&email);
                true
            }
            _ => false,
        }
    }

    /// Remove every expired entry, returning how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.inner.clock.now_millis();
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|_, code| code.expires_at > now);
        before - entries.len()
    }

    /// Spawn a background task sweeping every `every`.
    pub fn start_sweeper(&self, every: Duration) -> Sweeper {
        let store = self.clone();
        Sweeper::spawn(every, move || store.sweep())
    }
}

/// Generate a six-digit code (000000-999999).
fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}
