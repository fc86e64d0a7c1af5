use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use reqwest::Url;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type HostRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Wait applied when a host answers 429 without `Retry-After`.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

struct HostBackoff {
    limiter: HostRateLimiter,
    until: Instant,
}

/// Manages outbound back-off per upstream host.
///
/// Hosts are never throttled up front. Only once a host answers 429 is it
/// gated, for the period its `Retry-After` asks for, so that calls in the
/// meantime fail fast locally instead of hammering the service. When the
/// period is over the host is released again.
pub struct RateLimitManager {
    host_backoffs: Arc<Mutex<HashMap<String, HostBackoff>>>,
}

impl RateLimitManager {
    pub fn new() -> Self {
        Self {
            host_backoffs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Extract the host from a URL
    pub fn extract_host(url: &Url) -> Option<String> {
        url.host_str().map(|h| h.to_ascii_lowercase())
    }

    /// Start backing off from a host after it answered 429
    pub async fn update_rate_limiter(&self, host: &str, retry_after_seconds: Option<u64>) {
        let period = retry_after_seconds
            .map(|s| Duration::from_secs(s.max(1)))
            .unwrap_or(DEFAULT_BACKOFF);

        // One request per period, with the single burst slot spent right away
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_minute(NonZeroU32::MIN));
        let limiter = RateLimiter::keyed(quota);
        let _ = limiter.check_key(&host.to_string());

        self.host_backoffs.lock().await.insert(
            host.to_string(),
            HostBackoff {
                limiter,
                until: Instant::now() + period,
            },
        );

        warn!("Upstream host {} answered 429, backing off for {:?}", host, period);
    }

    /// Fail fast while a host is in back-off
    pub async fn check_rate_limit(&self, host: &str) -> Result<(), Duration> {
        let mut backoffs = self.host_backoffs.lock().await;

        let Some(backoff) = backoffs.get(host) else {
            return Ok(());
        };

        if Instant::now() >= backoff.until {
            backoffs.remove(host);
            info!("Upstream host {} released from back-off", host);
            return Ok(());
        }

        match backoff.limiter.check_key(&host.to_string()) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(Clock::now(&DefaultClock::default()));
                debug!("Upstream host {} throttled: waiting {:?}", host, wait_time);
                Err(wait_time)
            }
        }
    }
}

impl Default for RateLimitManager {
    fn default() -> Self {
        Self::new()
    }
}
