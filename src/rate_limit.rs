//! Cooldown between consecutive calls to a rate-limited service

use std::time::{Duration, Instant};

/// Caller-owned limiter: at most one call per `cooldown`
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown: Duration,
    last_used: Option<Instant>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_used: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time left before the next call is allowed
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_used {
            Some(last) => self.cooldown.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Record a call at `now` if the cooldown has passed
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.remaining(now).is_zero() {
            self.last_used = Some(now);
            true
        } else {
            false
        }
    }

    /// Block until the cooldown has passed, then record the call
    pub fn acquire(&mut self) {
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            log::debug!("Rate limit: waiting {:?}", wait);
            std::thread::sleep(wait);
        }
        self.last_used = Some(Instant::now());
    }
}
