//! Rate limiting for on-demand discovery refreshes.
//

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::config::{Config, ConfigTrait};

const DEFAULT_REFRESH_LIMIT: u32 = 10;
const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(600);

/// Bounds how often a missed service lookup may trigger a discovery pass,
/// so unauthenticated probing or a misconfigured client cannot hammer the
/// discovery source.
pub struct RefreshLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RefreshLimiter {
    pub fn new(cfg: &Config) -> Self {
        let discovery = cfg.discovery();
        let limit = discovery
            .and_then(|d| d.refresh_limit)
            .unwrap_or(DEFAULT_REFRESH_LIMIT)
            .max(1);
        let window = discovery
            .and_then(|d| d.refresh_window)
            .unwrap_or(DEFAULT_REFRESH_WINDOW);

        // `limit` refreshes per `window`, available in one burst.
        let period = window / limit;
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::with_period(Duration::from_secs(1)).unwrap())
            .allow_burst(NonZeroU32::new(limit).unwrap());

        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Returns whether one refresh attempt is allowed right now.
    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    #[test]
    fn test_limiter_exhausts_after_burst() {
        let mut cfg = config::new_test_config();
        {
            let discovery = cfg.deployd.discovery.as_mut().unwrap();
            discovery.refresh_limit = Some(3);
            discovery.refresh_window = Some(Duration::from_secs(3600));
        }
        let limiter = RefreshLimiter::new(&cfg);

        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn test_limiter_defaults_without_discovery_section() {
        let cfg: config::Config = serde_yaml::from_str("deployd:\n  env: dev\n").unwrap();
        let limiter = RefreshLimiter::new(&cfg);
        assert!(limiter.allow());
    }
}
