//! Account Aggregation Service - fans out to every upstream data source for one account
//!
//! All seven calls run concurrently and share one cancellation token. When
//! the shared deadline passes, the token is cancelled, every in-flight call is
//! abandoned, and the whole operation fails as a timeout even if some sources
//! had already answered. An individual source that errors or returns
//! something unparseable only degrades to an absent field. If every source
//! was refused for rate limiting, the fetch fails as rate limited instead of
//! returning an empty record.

use crate::error::TrustError;
use crate::models::{
    AccountSignals, BadgesPayload, FriendListPayload, GroupListPayload, OwnedGamesPayload,
    PlayerBansPayload, PlayerSummariesPayload, RecentlyPlayedPayload, SourcePayloads,
};
use crate::rate_limiter::{ClientKey, RateLimiter, Route, RouteQuota};
use crate::steam_api::{Endpoint, SteamApi};
use crate::steam_id::CanonicalAccountId;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for the account aggregation service
#[derive(Debug, Clone)]
pub struct AccountAggregationConfig {
    /// Budget shared by all upstream calls of one fetch
    pub timeout: Duration,
    /// Quota of the `steam-account` route
    pub quota: RouteQuota,
}

impl Default for AccountAggregationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            quota: RouteQuota::new(10, Duration::from_secs(60)),
        }
    }
}

/// Gathers profile, ban and extra signals for one account
pub struct AccountAggregationService {
    config: AccountAggregationConfig,
    api: Arc<dyn SteamApi>,
    rate_limiter: Arc<RateLimiter>,
}

impl AccountAggregationService {
    pub fn new(
        config: AccountAggregationConfig,
        api: Arc<dyn SteamApi>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            api,
            rate_limiter,
        }
    }

    pub fn config(&self) -> &AccountAggregationConfig {
        &self.config
    }

    /// Fetch and normalize every signal for `id` on behalf of `client`
    pub async fn fetch_account_signals(
        &self,
        client: &str,
        id: &CanonicalAccountId,
    ) -> Result<AccountSignals, TrustError> {
        self.rate_limiter
            .check(&ClientKey::new(client, Route::SteamAccount), self.config.quota)?;

        if !self.api.has_credentials() {
            return Err(TrustError::Configuration(
                "STEAM_API_KEY is not configured".to_string(),
            ));
        }

        let started = Instant::now();
        let cancel = CancellationToken::new();

        let fan_out = async {
            let (summaries, bans, badges, friends, owned_games, groups, recent_games) = tokio::join!(
                self.fetch_source::<PlayerSummariesPayload>(Endpoint::PlayerSummaries, id, &cancel),
                self.fetch_source::<PlayerBansPayload>(Endpoint::PlayerBans, id, &cancel),
                self.fetch_source::<BadgesPayload>(Endpoint::Badges, id, &cancel),
                self.fetch_source::<FriendListPayload>(Endpoint::FriendList, id, &cancel),
                self.fetch_source::<OwnedGamesPayload>(Endpoint::OwnedGames, id, &cancel),
                self.fetch_source::<GroupListPayload>(Endpoint::GroupList, id, &cancel),
                self.fetch_source::<RecentlyPlayedPayload>(Endpoint::RecentlyPlayed, id, &cancel),
            );

            // Nothing came back because upstream is pushing back, not because
            // the account is empty
            if let Some(retry_after_secs) = all_throttled([
                summaries.throttled_secs(),
                bans.throttled_secs(),
                badges.throttled_secs(),
                friends.throttled_secs(),
                owned_games.throttled_secs(),
                groups.throttled_secs(),
                recent_games.throttled_secs(),
            ]) {
                return Err(retry_after_secs);
            }

            Ok(SourcePayloads {
                summaries: summaries.into_option(),
                bans: bans.into_option(),
                badges: badges.into_option(),
                friends: friends.into_option(),
                owned_games: owned_games.into_option(),
                groups: groups.into_option(),
                recent_games: recent_games.into_option(),
            })
        };

        let deadline = async {
            tokio::time::sleep(self.config.timeout).await;
            cancel.cancel();
        };

        let sources = tokio::select! {
            sources = fan_out => match sources {
                Ok(sources) => sources,
                Err(retry_after_secs) => {
                    warn!(
                        "Upstream throttled: ip={} route={} steamid={} retry_after={}s",
                        client,
                        Route::SteamAccount,
                        id,
                        retry_after_secs
                    );
                    return Err(TrustError::RateLimited { retry_after_secs });
                }
            },
            _ = deadline => {
                warn!(
                    "Timeout: ip={} route={} steamid={} dur_ms={}",
                    client,
                    Route::SteamAccount,
                    id,
                    self.config.timeout.as_millis()
                );
                return Err(TrustError::Timeout { after: self.config.timeout });
            }
        };

        let signals = AccountSignals::from_sources(sources);

        info!(
            "Lookup: ip={} route={} steamid={} player={} ban={} dur_ms={}",
            client,
            Route::SteamAccount,
            id,
            if signals.profile.is_some() { "ok" } else { "null" },
            if signals.ban.is_some() { "ok" } else { "null" },
            started.elapsed().as_millis()
        );

        Ok(signals)
    }

    /// One upstream call. Any failure, or cancellation, leaves the source absent.
    async fn fetch_source<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        id: &CanonicalAccountId,
        cancel: &CancellationToken,
    ) -> SourceOutcome<T> {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Source {} for {} cancelled", endpoint, id);
                return SourceOutcome::Absent;
            }
            result = self.api.fetch(endpoint, id) => result,
        };

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                debug!("Source {} for {} unavailable: {}", endpoint, id, e);
                return match e.retry_after_secs() {
                    Some(secs) => SourceOutcome::Throttled(secs),
                    None => SourceOutcome::Absent,
                };
            }
        };

        match serde_json::from_value::<T>(value) {
            Ok(payload) => SourceOutcome::Ready(payload),
            Err(e) => {
                debug!("Source {} for {} returned an unexpected shape: {}", endpoint, id, e);
                SourceOutcome::Absent
            }
        }
    }
}

enum SourceOutcome<T> {
    Ready(T),
    Absent,
    /// Upstream or the local back-off refused the call.
    Throttled(u64),
}

impl<T> SourceOutcome<T> {
    fn into_option(self) -> Option<T> {
        match self {
            SourceOutcome::Ready(payload) => Some(payload),
            SourceOutcome::Absent | SourceOutcome::Throttled(_) => None,
        }
    }

    fn throttled_secs(&self) -> Option<u64> {
        match self {
            SourceOutcome::Throttled(secs) => Some(*secs),
            _ => None,
        }
    }
}

/// The longest wait, but only when every source was throttled.
fn all_throttled(waits: [Option<u64>; 7]) -> Option<u64> {
    waits
        .into_iter()
        .try_fold(0, |longest, wait| wait.map(|secs| longest.max(secs)))
}
