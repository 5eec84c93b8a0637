//! Per-user usage windows for a command.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use moka::sync::Cache;

use super::errors::RegistrationError;
use crate::transport::UserId;

/// At most `usages` uses per `duration`, per user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Throttling {
    pub usages: u32,
    pub duration: Duration,
}
impl Throttling {
    pub fn new(usages: u32, duration: Duration) -> Result<Self, RegistrationError> {
        if usages < 1 {
            return Err(RegistrationError::InvalidThrottling(
                "usages must be at least 1".to_owned(),
            ));
        }
        if duration < Duration::from_secs(1) {
            return Err(RegistrationError::InvalidThrottling(
                "duration must be at least 1 second".to_owned(),
            ));
        }
        Ok(Self { usages, duration })
    }
}

#[derive(Debug)]
pub struct Throttle {
    pub start: Instant,
    usages: AtomicU32,
}
impl Throttle {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            usages: AtomicU32::new(0),
        }
    }

    pub fn usages(&self) -> u32 {
        self.usages.load(Ordering::SeqCst)
    }
}

/// The live throttles of one command. Entries are created on first use and expire `duration`
/// after they were created.
pub struct Throttles {
    pub throttling: Throttling,
    cache: Cache<UserId, Arc<Throttle>>,
}
impl Throttles {
    pub fn new(throttling: Throttling) -> Self {
        Self {
            throttling,
            // uncapped: an evicted entry would reset a live window, and the ttl bounds growth
            cache: Cache::builder().time_to_live(throttling.duration).build(),
        }
    }

    /// The user's current throttle, starting a new window if there is none.
    pub fn throttle(&self, user: UserId) -> Arc<Throttle> {
        let throttle = self.cache.get_with(user, || Arc::new(Throttle::new()));
        if throttle.start.elapsed() < self.throttling.duration {
            return throttle;
        }

        let fresh = Arc::new(Throttle::new());
        self.cache.insert(user, fresh.clone());
        fresh
    }

    /// How long until the user may use the command again, if one more use would exceed the cap.
    pub fn remaining(&self, throttle: &Throttle) -> Option<Duration> {
        if throttle.usages() + 1 > self.throttling.usages {
            Some(self.throttling.duration.saturating_sub(throttle.start.elapsed()))
        } else {
            None
        }
    }

    /// Counts one use, unless the cap is already reached. On refusal, returns how long until the
    /// window ends.
    pub fn take(&self, throttle: &Throttle) -> Result<(), Duration> {
        throttle
            .usages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.throttling.usages).then_some(used + 1)
            })
            .map(|_| ())
            .map_err(|_| self.throttling.duration.saturating_sub(throttle.start.elapsed()))
    }
}
