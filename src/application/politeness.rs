//! Politeness gate
//!
//! Minimum spacing between outbound requests, listing and detail alike.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lets one request through per `delay`. A zero delay disables the gate.
pub struct Politeness {
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    delay: Duration,
}

impl Politeness {
    pub fn new(delay: Duration) -> Self {
        let rate_limiter = Quota::with_period(delay).map(RateLimiter::direct);
        Self { rate_limiter, delay }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next slot. Returns `false` if cancelled while waiting.
    pub async fn wait(&self, cancellation_token: &CancellationToken) -> bool {
        let Some(rate_limiter) = &self.rate_limiter else {
            return !cancellation_token.is_cancelled();
        };

        tokio::select! {
            () = rate_limiter.until_ready() => !cancellation_token.is_cancelled(),
            () = cancellation_token.cancelled() => false,
        }
    }
}
