//! Per-endpoint pacing using Governor (GCRA algorithm)

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Minimum spacing between calls, per endpoint
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub signatures_delay_ms: u64,
    pub transaction_delay_ms: u64,
    pub market_data_delay_ms: u64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            signatures_delay_ms: 200,
            transaction_delay_ms: 150,
            market_data_delay_ms: 1000,
        }
    }
}

/// Token bucket allowing one call per period with a burst of one.
///
/// A zero period disables pacing entirely.
pub struct RateLimiter {
    name: &'static str,
    limiter: Option<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, delay_ms: u64) -> Self {
        let limiter = Quota::with_period(Duration::from_millis(delay_ms))
            .map(|quota| GovernorLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self { name, limiter }
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next call is allowed
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("Pacing {} request", self.name);
                limiter.until_ready().await;
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("paced", &self.is_paced())
            .finish()
    }
}
