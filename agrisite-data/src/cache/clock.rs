//! Time source used to judge cache freshness.

use std::fmt;
use std::time::SystemTime;

/// Supplies the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-support"))]
mod manual {
    use std::sync::{Mutex, PoisonError};
    use std::time::{Duration, SystemTime};

    use super::Clock;

    /// Hand-driven [`Clock`] for exercising TTL expiry deterministically.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<SystemTime>,
    }

    impl ManualClock {
        /// Start the clock at `start`.
        #[must_use]
        pub const fn new(start: SystemTime) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        /// Start the clock `secs` seconds after the Unix epoch.
        #[must_use]
        pub fn at_epoch_secs(secs: u64) -> Self {
            Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += by;
        }

        /// Move the clock back by `by`, saturating at the epoch.
        pub fn rewind(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = now.checked_sub(by).unwrap_or(SystemTime::UNIX_EPOCH);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
