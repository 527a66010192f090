//! 进程内限流
//!
//! 计数只保存在本进程内存中：进程重启即清零，多实例部署时也不共享。
//! 这是尽力而为的准入控制，不参与任何一致性保证；需要跨实例共享时
//! 另外实现 `RateLimiter`（例如基于带过期的计数存储）替换即可，
//! 核心事务代码不依赖具体实现。
//!
//! 默认实现基于 governor 的 keyed GCRA：窗口内允许 `max_requests` 次突发，
//! 之后每 `window / max_requests` 补充一个名额。

use crate::error::{AppError, AppResult};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::Quota;
use std::num::NonZeroU32;
use std::time::Duration;

pub trait RateLimiter: Send + Sync {
    /// 记录一次请求；超限时返回 `AppError::RateLimited`
    fn check(&self, key: &str) -> AppResult<()>;

    /// 清理已完全恢复名额的 key，返回清理数量
    fn prune(&self) -> usize;
}

type KeyedLimiter<C> = governor::RateLimiter<
    String,
    DashMapStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

pub struct GovernorLimiter<C: Clock = DefaultClock> {
    inner: KeyedLimiter<C>,
}

fn quota(max_requests: usize, window: Duration) -> Quota {
    let burst = u32::try_from(max_requests)
        .ok()
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MIN);
    Quota::with_period(window / burst.get())
        .map(|q| q.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst))
}

impl GovernorLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: governor::RateLimiter::dashmap(quota(max_requests, window)),
        }
    }
}

impl<C: Clock> GovernorLimiter<C> {
    pub fn with_clock(max_requests: usize, window: Duration, clock: &C) -> Self {
        Self {
            inner: governor::RateLimiter::dashmap_with_clock(quota(max_requests, window), clock),
        }
    }
}

impl<C> RateLimiter for GovernorLimiter<C>
where
    C: Clock + Send + Sync,
    C::Instant: Send + Sync,
{
    fn check(&self, key: &str) -> AppResult<()> {
        self.inner
            .check_key(&key.to_string())
            .map_err(|_| AppError::RateLimited)
    }

    fn prune(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain_recent();
        self.inner.shrink_to_fit();
        before.saturating_sub(self.inner.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    #[test]
    fn test_limit_per_key() {
        let clock = FakeRelativeClock::default();
        let limiter = GovernorLimiter::with_clock(2, Duration::from_secs(60), &clock);
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());
        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            limiter.check("1.2.3.4"),
            Err(AppError::RateLimited)
        ));
        // 不同 key 互不影响
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn test_quota_replenishes_over_window() {
        let clock = FakeRelativeClock::default();
        let limiter = GovernorLimiter::with_clock(2, Duration::from_secs(60), &clock);
        limiter.check("user").unwrap();
        limiter.check("user").unwrap();
        clock.advance(Duration::from_secs(29));
        assert!(limiter.check("user").is_err());
        // 每 30 秒补充一个名额
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check("user").is_ok());
        assert!(limiter.check("user").is_err());
    }

    #[test]
    fn test_rejected_requests_are_not_counted() {
        let clock = FakeRelativeClock::default();
        let limiter = GovernorLimiter::with_clock(1, Duration::from_secs(10), &clock);
        limiter.check("k").unwrap();
        for _ in 1..5 {
            clock.advance(Duration::from_secs(1));
            assert!(limiter.check("k").is_err());
        }
        clock.advance(Duration::from_secs(6));
        assert!(limiter.check("k").is_ok());
    }

    #[test]
    fn test_default_clock_behind_trait_object() {
        let limiter: std::sync::Arc<dyn RateLimiter> =
            std::sync::Arc::new(GovernorLimiter::new(1, Duration::from_secs(3600)));
        assert!(limiter.check("spin:alice").is_ok());
        assert!(matches!(
            limiter.check("spin:alice"),
            Err(AppError::RateLimited)
        ));
        assert!(limiter.check("spin:bob").is_ok());
        assert_eq!(limiter.prune(), 0);
    }

    #[test]
    fn test_prune_drops_idle_keys() {
        let clock = FakeRelativeClock::default();
        let limiter = GovernorLimiter::with_clock(5, Duration::from_secs(10), &clock);
        limiter.check("old").unwrap();
        clock.advance(Duration::from_secs(8));
        limiter.check("fresh").unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(limiter.prune(), 1);
        assert_eq!(limiter.prune(), 0);
    }
}
