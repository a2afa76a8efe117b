//! Request pacing: token bucket plus a jittered inter-request delay.

use std::time::SystemTime;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::config::ScraperConfig;

/// Paces page requests across all in-flight races.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    min_delay: Duration,
    max_delay: Duration,
}

struct BucketState {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, min_delay_secs: f64, max_delay_secs: f64) -> Self {
        let capacity = requests_per_minute.max(1) as f64;
        let min_delay = Duration::from_secs_f64(min_delay_secs.max(0.0));
        let max_delay = Duration::from_secs_f64(max_delay_secs.max(min_delay_secs).max(0.0));
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                capacity,
                refill_per_sec: capacity / 60.0,
                last_refill: Instant::now(),
            }),
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.requests_per_minute,
            config.min_delay_secs,
            config.max_delay_secs,
        )
    }

    /// Take one token, sleeping until the bucket and the jitter band allow
    /// the next request.
    pub async fn acquire(&self) {
        let delay = {
            let mut state = self.state.lock().await;

            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            state.tokens = (state.tokens + elapsed * state.refill_per_sec).min(state.capacity);
            state.last_refill = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                self.jittered_delay()
            } else {
                // Bucket empty; wait for the next token to accrue.
                let wait = (1.0 - state.tokens) / state.refill_per_sec;
                state.tokens = 0.0;
                Duration::from_secs_f64(wait) + self.min_delay
            }
        };

        tokio::time::sleep(delay).await;
    }

    fn jittered_delay(&self) -> Duration {
        let band = self.max_delay.saturating_sub(self.min_delay);
        self.min_delay + band.mul_f64(jitter_factor())
    }
}

/// Pseudo-random factor in [0, 1), good enough for request spacing.
fn jitter_factor() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}
