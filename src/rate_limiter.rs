//! Per-client, per-route fixed-window rate limiting
//!
//! Each (client address, route) pair owns one window. The first request in a
//! window starts it; once `limit` requests have been admitted, further requests
//! are rejected until the window has elapsed, at which point the window is
//! replaced rather than merged. Bursts of up to twice the limit are possible
//! across a window boundary.

use crate::error::{ceil_secs, TrustError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Every rate-limited operation, each with its own independent windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ResolveVanity,
    SteamAccount,
    PageLoad,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::ResolveVanity => "resolve-vanity",
            Route::SteamAccount => "steam-account",
            Route::PageLoad => "page-load",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub client: String,
    pub route: Route,
}

impl ClientKey {
    pub fn new(client: impl Into<String>, route: Route) -> Self {
        Self {
            client: client.into(),
            route,
        }
    }
}

/// How many requests a route admits per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteQuota {
    pub limit: u32,
    pub window: Duration,
}

impl RouteQuota {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateWindow {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) > self.window
    }
}

/// A rejected request and how long the caller should wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter {
    pub secs: u64,
}

impl From<RetryAfter> for TrustError {
    fn from(r: RetryAfter) -> Self {
        TrustError::RateLimited {
            retry_after_secs: r.secs,
        }
    }
}

/// Bounded in-memory store of rate windows.
pub struct RateLimiter {
    windows: Mutex<HashMap<ClientKey, RateWindow>>,
    max_entries: usize,
}

impl RateLimiter {
    pub fn new(max_entries: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Admit or reject one request for `key`.
    pub fn check(&self, key: &ClientKey, quota: RouteQuota) -> Result<(), RetryAfter> {
        let result = self.check_at(key, quota, Instant::now());
        if let Err(retry) = result {
            warn!(
                "Rate limited: ip={} route={} retry_after={}s",
                key.client, key.route, retry.secs
            );
        }
        result
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(
        &self,
        key: &ClientKey,
        quota: RouteQuota,
        now: Instant,
    ) -> Result<(), RetryAfter> {
        let mut windows = self.windows.lock();

        if let Some(entry) = windows.get_mut(key) {
            if !entry.is_expired(now) {
                if entry.count >= quota.limit {
                    let remaining =
                        (entry.window_start + entry.window).saturating_duration_since(now);
                    return Err(RetryAfter {
                        secs: ceil_secs(remaining),
                    });
                }
                entry.count += 1;
                return Ok(());
            }
        } else if windows.len() >= self.max_entries {
            Self::make_room(&mut windows, self.max_entries, now);
        }

        if quota.limit == 0 {
            return Err(RetryAfter {
                secs: ceil_secs(quota.window),
            });
        }

        windows.insert(
            key.clone(),
            RateWindow {
                count: 1,
                window_start: now,
                window: quota.window,
            },
        );
        Ok(())
    }

    /// Drop every window that has elapsed. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    pub fn prune_expired_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| !w.is_expired(now));
        let removed = before - windows.len();
        if removed > 0 {
            debug!("Pruned {} expired rate windows", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(windows: &mut HashMap<ClientKey, RateWindow>, max_entries: usize, now: Instant) {
        windows.retain(|_, w| !w.is_expired(now));
        if windows.len() < max_entries {
            return;
        }
        // Still full: evict the oldest live window
        let oldest = windows
            .iter()
            .min_by_key(|(_, w)| w.window_start)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            windows.remove(&key);
        }
    }
}
