// src/scraper/retry.rs
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::errors::ScrapeError;

const BASE_DELAY_SECS: u64 = 2;
const MAX_DELAY_SECS: u64 = 10;
const JITTER_MAX_MS: u64 = 2000;

/// Bounded attempts with capped exponential backoff. Shared by login and export.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(BASE_DELAY_SECS),
            max_delay: Duration::from_secs(MAX_DELAY_SECS),
            jitter: Duration::from_millis(JITTER_MAX_MS),
        }
    }

    /// Same attempt cap, no sleeping between attempts.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn sleep_after(&self, attempt: u32) {
        let mut delay = self.backoff(attempt);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms > 0 {
            delay += Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt cap is reached. `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, ScrapeError>
    where
        F: FnMut(u32) -> Result<T, ScrapeError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let start = Instant::now();
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{what} succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        "{what} attempt {attempt}/{attempts} failed in {:?}: {e}",
                        start.elapsed()
                    );
                    if attempt >= attempts {
                        return Err(e);
                    }
                    self.sleep_after(attempt);
                    attempt += 1;
                }
            }
        }
    }
}
