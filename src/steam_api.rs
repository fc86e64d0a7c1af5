//! Outbound boundary to the Steam Web API and the community site

use crate::error::UpstreamError;
use crate::rate_limit_manager::RateLimitManager;
use crate::steam_id::CanonicalAccountId;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode, Url};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

static STEAM_ID64_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<steamID64>(\d{17})</steamID64>").expect("valid regex"));

/// The seven read-only data sources queried for every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    PlayerSummaries,
    PlayerBans,
    Badges,
    FriendList,
    OwnedGames,
    GroupList,
    RecentlyPlayed,
}

impl Endpoint {
    pub const ALL: [Endpoint; 7] = [
        Endpoint::PlayerSummaries,
        Endpoint::PlayerBans,
        Endpoint::Badges,
        Endpoint::FriendList,
        Endpoint::OwnedGames,
        Endpoint::GroupList,
        Endpoint::RecentlyPlayed,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::PlayerSummaries => "ISteamUser/GetPlayerSummaries/v2/",
            Endpoint::PlayerBans => "ISteamUser/GetPlayerBans/v1/",
            Endpoint::Badges => "IPlayerService/GetBadges/v1/",
            Endpoint::FriendList => "ISteamUser/GetFriendList/v1/",
            Endpoint::OwnedGames => "IPlayerService/GetOwnedGames/v1/",
            Endpoint::GroupList => "ISteamUser/GetUserGroupList/v1/",
            Endpoint::RecentlyPlayed => "IPlayerService/GetRecentlyPlayedGames/v1/",
        }
    }

    /// Query parameters besides the API key.
    fn query(self, id: &CanonicalAccountId) -> Vec<(&'static str, String)> {
        let id = id.to_string();
        match self {
            // Batch endpoints take a comma-separated id list
            Endpoint::PlayerSummaries | Endpoint::PlayerBans => vec![("steamids", id)],
            Endpoint::FriendList => vec![("steamid", id), ("relationship", "all".into())],
            Endpoint::OwnedGames => vec![
                ("steamid", id),
                ("include_appinfo", "0".into()),
                ("include_played_free_games", "1".into()),
            ],
            Endpoint::Badges | Endpoint::GroupList | Endpoint::RecentlyPlayed => {
                vec![("steamid", id)]
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::PlayerSummaries => "summaries",
            Endpoint::PlayerBans => "bans",
            Endpoint::Badges => "badges",
            Endpoint::FriendList => "friends",
            Endpoint::OwnedGames => "owned",
            Endpoint::GroupList => "groups",
            Endpoint::RecentlyPlayed => "recent",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calls into the upstream identity service.
#[async_trait]
pub trait SteamApi: Send + Sync {
    /// Whether an API key is available for the data endpoints.
    fn has_credentials(&self) -> bool;

    /// Map a vanity name to an account id. `Ok(None)` means no such profile.
    async fn resolve_vanity(
        &self,
        vanity: &str,
    ) -> Result<Option<CanonicalAccountId>, UpstreamError>;

    /// Fetch one data source as untyped JSON.
    async fn fetch(
        &self,
        endpoint: Endpoint,
        id: &CanonicalAccountId,
    ) -> Result<serde_json::Value, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct HttpSteamApiConfig {
    pub api_key: Option<String>,
    pub api_base_url: Url,
    pub community_base_url: Url,
    pub request_timeout: Duration,
}

/// [`SteamApi`] over HTTPS.
pub struct HttpSteamApi {
    client: Client,
    config: HttpSteamApiConfig,
    rate_limit_manager: Arc<RateLimitManager>,
}

impl HttpSteamApi {
    pub fn new(
        config: HttpSteamApiConfig,
        rate_limit_manager: Arc<RateLimitManager>,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("steam-trust/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limit_manager,
        })
    }

    fn endpoint_url(&self, endpoint: Endpoint, id: &CanonicalAccountId, key: &str) -> Result<Url, UpstreamError> {
        let mut url = self
            .config
            .api_base_url
            .join(endpoint.path())
            .map_err(|e| UpstreamError::Transport(format!("bad endpoint url: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", key);
            for (name, value) in endpoint.query(id) {
                pairs.append_pair(name, &value);
            }
        }
        Ok(url)
    }

    fn vanity_url(&self, vanity: &str) -> Result<Url, UpstreamError> {
        let mut url = self.config.community_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Transport("community base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["id", vanity, ""]);
        url.set_query(Some("xml=1"));
        Ok(url)
    }

    /// Send a GET through the per-host throttle, recording any 429 answer.
    async fn get(&self, url: Url) -> Result<Response, UpstreamError> {
        let host = RateLimitManager::extract_host(&url).unwrap_or_default();
        if let Err(wait) = self.rate_limit_manager.check_rate_limit(&host).await {
            return Err(UpstreamError::Throttled { host, wait });
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            self.rate_limit_manager
                .update_rate_limiter(&host, retry_after_secs)
                .await;
            return Err(UpstreamError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        Ok(response)
    }
}

#[async_trait]
impl SteamApi for HttpSteamApi {
    fn has_credentials(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    async fn resolve_vanity(
        &self,
        vanity: &str,
    ) -> Result<Option<CanonicalAccountId>, UpstreamError> {
        let url = self.vanity_url(vanity)?;
        let response = match self.get(url).await {
            Ok(r) => r,
            Err(UpstreamError::Status(status)) => {
                debug!("Vanity lookup for {:?} returned {}", vanity, status);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let body = response.text().await?;
        Ok(parse_vanity_xml(&body))
    }

    async fn fetch(
        &self,
        endpoint: Endpoint,
        id: &CanonicalAccountId,
    ) -> Result<serde_json::Value, UpstreamError> {
        let key = match self.config.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => k,
            _ => return Err(UpstreamError::MissingCredentials),
        };
        let url = self.endpoint_url(endpoint, id, key)?;
        let response = self.get(url).await?;
        Ok(response.json::<serde_json::Value>().await?)
    }
}

/// Pull the account id out of a community profile XML document.
pub fn parse_vanity_xml(body: &str) -> Option<CanonicalAccountId> {
    STEAM_ID64_TAG
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| CanonicalAccountId::new(m.as_str()))
}
