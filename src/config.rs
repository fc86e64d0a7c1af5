//! Process configuration loaded from the environment

use crate::rate_limiter::RouteQuota;
use reqwest::Url;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com/";
pub const DEFAULT_COMMUNITY_BASE_URL: &str = "https://steamcommunity.com/";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub steam_api_key: Option<String>,
    pub api_base_url: Url,
    pub community_base_url: Url,
    /// Shared aggregation timeout, also used as the per-request HTTP timeout
    pub api_timeout: Duration,
    pub resolve_vanity_quota: RouteQuota,
    pub steam_account_quota: RouteQuota,
    pub page_load_quota: RouteQuota,
    pub rate_limit_max_entries: usize,
    pub rate_limit_sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".to_string(),
            steam_api_key: None,
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("valid default url"),
            community_base_url: Url::parse(DEFAULT_COMMUNITY_BASE_URL)
                .expect("valid default url"),
            api_timeout: Duration::from_millis(15_000),
            resolve_vanity_quota: RouteQuota::new(10, Duration::from_secs(60)),
            steam_account_quota: RouteQuota::new(10, Duration::from_secs(60)),
            page_load_quota: RouteQuota::new(100, Duration::from_secs(60)),
            rate_limit_max_entries: 100_000,
            rate_limit_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let quota = |limit_var: &str, window_var: &str, default: RouteQuota| {
            RouteQuota::new(
                parse_or(&lookup, limit_var, default.limit),
                Duration::from_secs(parse_or(&lookup, window_var, default.window.as_secs())),
            )
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            steam_api_key: lookup("STEAM_API_KEY").filter(|k| !k.trim().is_empty()),
            api_base_url: url_or(&lookup, "STEAM_API_BASE_URL", defaults.api_base_url),
            community_base_url: url_or(
                &lookup,
                "STEAM_COMMUNITY_BASE_URL",
                defaults.community_base_url,
            ),
            api_timeout: Duration::from_millis(parse_or(
                &lookup,
                "API_TIMEOUT_MS",
                defaults.api_timeout.as_millis() as u64,
            )),
            resolve_vanity_quota: quota(
                "RESOLVE_VANITY_LIMIT",
                "RESOLVE_VANITY_WINDOW_SECS",
                defaults.resolve_vanity_quota,
            ),
            steam_account_quota: quota(
                "STEAM_ACCOUNT_LIMIT",
                "STEAM_ACCOUNT_WINDOW_SECS",
                defaults.steam_account_quota,
            ),
            page_load_quota: quota(
                "PAGE_LOAD_LIMIT",
                "PAGE_LOAD_WINDOW_SECS",
                defaults.page_load_quota,
            ),
            rate_limit_max_entries: parse_or(
                &lookup,
                "RATE_LIMIT_MAX_ENTRIES",
                defaults.rate_limit_max_entries,
            ),
            // A zero interval would turn the sweeper into a busy loop
            rate_limit_sweep_interval: Duration::from_secs(
                parse_or(
                    &lookup,
                    "RATE_LIMIT_SWEEP_SECS",
                    defaults.rate_limit_sweep_interval.as_secs(),
                )
                .max(1),
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Ignoring invalid {}={:?}: {}", name, raw, e);
            default
        }),
        None => default,
    }
}

fn url_or<F>(lookup: &F, name: &str, default: Url) -> Url
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    // Endpoint paths are joined onto the base, so it must end with a slash
    let raw = if raw.ends_with('/') { raw } else { format!("{raw}/") };
    Url::parse(&raw).unwrap_or_else(|e| {
        warn!("Ignoring invalid {}={:?}: {}", name, raw, e);
        default
    })
}
