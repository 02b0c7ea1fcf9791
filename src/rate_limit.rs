//! Session-scoped submission cooldown

use log::debug;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Rejects submissions that arrive within `cooldown` of the last accepted one.
/// One limiter is shared by every form in a session.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last_accepted: Mutex::new(None) }
    }

    /// Record an attempt if the cooldown has elapsed, otherwise return the
    /// time left before the next attempt is allowed
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut last = self.last_accepted.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                debug!("Submission rejected, {:?} of cooldown left", remaining);
                return Err(remaining);
            }
        }
        *last = Some(now);
        Ok(())
    }
}
