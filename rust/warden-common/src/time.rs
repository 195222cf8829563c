//! Time utilities.
//!
//! Every stateful component takes a [`Clock`] instead of calling wall-clock
//! time directly, so tests can drive expiry without sleeping.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamps below this value are interpreted as seconds and scaled up;
/// anything at or above it is already in milliseconds.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current system time.
    fn now(&self) -> SystemTime;

    /// Returns the current time as milliseconds since the UNIX epoch.
    fn now_millis(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    /// Returns the current time as seconds since the UNIX epoch.
    fn now_secs(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// The default [`Clock`], backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Normalize a timestamp that may be expressed in seconds or milliseconds
/// to milliseconds since the UNIX epoch.
///
/// Tokens in the wild carry both precisions; a second-precision value will
/// not exceed [`MILLIS_THRESHOLD`] for several millennia.
pub fn to_millis(value: u64) -> u64 {
    if value < MILLIS_THRESHOLD {
        value * 1000
    } else {
        value
    }
}

#[cfg(feature = "helpers")]
mod manual {
    use super::{Clock, Duration, SystemTime};
    use parking_lot::Mutex;

    /// A hand-advanced [`Clock`] for tests.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<SystemTime>,
    }

    impl ManualClock {
        /// Create a clock frozen at the given instant.
        pub fn new(now: SystemTime) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        /// Create a clock frozen at the current wall-clock time.
        pub fn from_system_now() -> Self {
            Self::new(SystemTime::now())
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.now.lock()
        }
    }
}

#[cfg(feature = "helpers")]
pub use manual::ManualClock;
