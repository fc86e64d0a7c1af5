//! Shared application state and its background maintenance

use crate::account_aggregation_service::{AccountAggregationConfig, AccountAggregationService};
use crate::config::Config;
use crate::error::UpstreamError;
use crate::identity_resolver::IdentityResolver;
use crate::rate_limit_manager::RateLimitManager;
use crate::rate_limiter::RateLimiter;
use crate::steam_api::{HttpSteamApi, HttpSteamApiConfig, SteamApi};
use crate::trust_check::TrustChecker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Owner of every component that outlives a single request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub resolver: Arc<IdentityResolver>,
    pub aggregation: Arc<AccountAggregationService>,
    pub trust_checker: Arc<TrustChecker>,
}

impl AppState {
    /// Wire the components around a given upstream implementation.
    pub fn new(config: Config, api: Arc<dyn SteamApi>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max_entries));

        let resolver = Arc::new(IdentityResolver::new(
            api.clone(),
            rate_limiter.clone(),
            config.resolve_vanity_quota,
        ));

        let aggregation = Arc::new(AccountAggregationService::new(
            AccountAggregationConfig {
                timeout: config.api_timeout,
                quota: config.steam_account_quota,
            },
            api,
            rate_limiter.clone(),
        ));

        let trust_checker = Arc::new(TrustChecker::new(resolver.clone(), aggregation.clone()));

        Self {
            config: Arc::new(config),
            rate_limiter,
            resolver,
            aggregation,
            trust_checker,
        }
    }

    /// Wire the components around the real Steam HTTP API.
    pub fn with_http_api(config: Config) -> Result<Self, UpstreamError> {
        let api = HttpSteamApi::new(
            HttpSteamApiConfig {
                api_key: config.steam_api_key.clone(),
                api_base_url: config.api_base_url.clone(),
                community_base_url: config.community_base_url.clone(),
                request_timeout: config.api_timeout,
            },
            Arc::new(RateLimitManager::new()),
        )?;
        Ok(Self::new(config, Arc::new(api)))
    }
}

/// Periodically drop expired rate windows until `token` is cancelled.
pub fn spawn_rate_limit_sweeper(
    state: &AppState,
    token: CancellationToken,
    task_tracker: &TaskTracker,
) {
    let rate_limiter = state.rate_limiter.clone();
    let interval = state.config.rate_limit_sweep_interval;

    task_tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Rate limit sweeper cancelled, exiting");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let removed = rate_limiter.prune_expired();
                    debug!(
                        "Rate limit sweep removed {} windows, {} remain",
                        removed,
                        rate_limiter.len()
                    );
                }
            }
        }
    });
}
