//! Background maintenance jobs.
//!
//! The ticket economy itself has no timers; the only recurring job is pruning
//! idle keys out of the in-process rate limiter. Call `spawn_all` once during
//! startup.

use crate::utils::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// Spawn all background tasks (detached via `tokio::spawn`).
pub fn spawn_all(rate_limiter: Arc<dyn RateLimiter>, prune_interval: Duration) {
    // 定期清理限流器中已过期的 key
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_interval);
        // 第一次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = rate_limiter.prune();
            if removed > 0 {
                log::debug!("Rate limiter pruned {removed} idle keys");
            }
        }
    });
}
