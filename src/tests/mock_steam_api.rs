use crate::error::UpstreamError;
use crate::steam_api::{Endpoint, SteamApi};
use crate::steam_id::CanonicalAccountId;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const GABEN_ID: &str = "76561197960287930";

/// Canned behavior of one data source.
#[derive(Clone)]
pub enum SourceReply {
    Json(Value),
    Fail,
    Hang,
    /// Upstream answered 429 with this `Retry-After`.
    RateLimited(u64),
    /// The local host back-off refused the call.
    Throttled(Duration),
}

/// Canned behavior of one vanity lookup.
#[derive(Clone)]
pub enum VanityReply {
    Found(&'static str),
    Missing,
    RateLimited(u64),
}

pub struct MockSteamApi {
    credentials: bool,
    sources: HashMap<Endpoint, SourceReply>,
    vanities: HashMap<String, VanityReply>,
    vanity_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockSteamApi {
    /// No vanities, every source failing.
    pub fn empty() -> Self {
        Self {
            credentials: true,
            sources: HashMap::new(),
            vanities: HashMap::new(),
            vanity_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Every source answering with a realistic established account.
    pub fn healthy() -> Self {
        let mut api = Self::empty();
        for (endpoint, payload) in healthy_payloads() {
            api.sources.insert(endpoint, SourceReply::Json(payload));
        }
        api.with_vanity("gaben", VanityReply::Found(GABEN_ID))
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    pub fn with_source(mut self, endpoint: Endpoint, reply: SourceReply) -> Self {
        self.sources.insert(endpoint, reply);
        self
    }

    pub fn with_all_sources(mut self, reply: SourceReply) -> Self {
        for endpoint in Endpoint::ALL {
            self.sources.insert(endpoint, reply.clone());
        }
        self
    }

    pub fn with_vanity(mut self, vanity: &str, reply: VanityReply) -> Self {
        self.vanities.insert(vanity.to_string(), reply);
        self
    }

    pub fn vanity_calls(&self) -> usize {
        self.vanity_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SteamApi for MockSteamApi {
    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn resolve_vanity(
        &self,
        vanity: &str,
    ) -> Result<Option<CanonicalAccountId>, UpstreamError> {
        self.vanity_calls.fetch_add(1, Ordering::SeqCst);
        match self.vanities.get(vanity) {
            Some(VanityReply::Found(id)) => Ok(CanonicalAccountId::new(id)),
            Some(VanityReply::RateLimited(secs)) => Err(UpstreamError::RateLimited {
                retry_after_secs: Some(*secs),
            }),
            Some(VanityReply::Missing) | None => Ok(None),
        }
    }

    async fn fetch(
        &self,
        endpoint: Endpoint,
        _id: &CanonicalAccountId,
    ) -> Result<Value, UpstreamError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.sources.get(&endpoint).cloned() {
            Some(SourceReply::Json(value)) => Ok(value),
            Some(SourceReply::Hang) => std::future::pending().await,
            Some(SourceReply::RateLimited(secs)) => Err(UpstreamError::RateLimited {
                retry_after_secs: Some(secs),
            }),
            Some(SourceReply::Throttled(wait)) => Err(UpstreamError::Throttled {
                host: "api.steampowered.com".to_string(),
                wait,
            }),
            Some(SourceReply::Fail) | None => {
                Err(UpstreamError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

pub fn healthy_payloads() -> Vec<(Endpoint, Value)> {
    vec![
        (
            Endpoint::PlayerSummaries,
            json!({
                "response": {
                    "players": [{
                        "steamid": GABEN_ID,
                        "communityvisibilitystate": 3,
                        "profilestate": 1,
                        "personaname": "Rabscuttle",
                        "profileurl": "https://steamcommunity.com/id/gaben/",
                        "avatarfull": "https://avatars.example/full.jpg",
                        "avatarhash": "c5d56249ee5d28a07db4ac9f7f60af961fab5426",
                        "timecreated": 1_063_407_589,
                        "loccountrycode": "US"
                    }]
                }
            }),
        ),
        (
            Endpoint::PlayerBans,
            json!({
                "players": [{
                    "SteamId": GABEN_ID,
                    "CommunityBanned": false,
                    "VACBanned": false,
                    "NumberOfVACBans": 0,
                    "DaysSinceLastBan": 0,
                    "NumberOfGameBans": 0,
                    "EconomyBan": "none"
                }]
            }),
        ),
        (
            Endpoint::Badges,
            json!({
                "response": {
                    "badges": [{ "badgeid": 1 }, { "badgeid": 2 }, { "badgeid": 13 }],
                    "player_level": 12
                }
            }),
        ),
        (
            Endpoint::FriendList,
            json!({
                "friendslist": {
                    "friends": [
                        { "steamid": "76561197960265731", "relationship": "friend" },
                        { "steamid": "76561197960265738", "relationship": "friend" }
                    ]
                }
            }),
        ),
        (
            Endpoint::OwnedGames,
            json!({ "response": { "game_count": 42, "games": [] } }),
        ),
        (
            Endpoint::GroupList,
            json!({
                "success": true,
                "response": { "groups": [{ "gid": "4" }] }
            }),
        ),
        (
            Endpoint::RecentlyPlayed,
            json!({
                "response": {
                    "total_count": 2,
                    "games": [
                        { "appid": 570, "playtime_2weeks": 90 },
                        { "appid": 440, "playtime_2weeks": 30 }
                    ]
                }
            }),
        ),
    ]
}
