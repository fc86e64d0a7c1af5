use super::mock_steam_api::{MockSteamApi, SourceReply, GABEN_ID};
use crate::account_aggregation_service::{AccountAggregationConfig, AccountAggregationService};
use crate::error::TrustError;
use crate::models::{EconomyBan, Visibility};
use crate::rate_limiter::{RateLimiter, RouteQuota};
use crate::steam_api::Endpoint;
use crate::steam_id::CanonicalAccountId;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn gaben() -> CanonicalAccountId {
    CanonicalAccountId::new(GABEN_ID).unwrap()
}

fn service_with(api: Arc<MockSteamApi>, limit: u32) -> AccountAggregationService {
    AccountAggregationService::new(
        AccountAggregationConfig {
            timeout: Duration::from_secs(15),
            quota: RouteQuota::new(limit, Duration::from_secs(60)),
        },
        api,
        Arc::new(RateLimiter::new(1000)),
    )
}

#[tokio::test]
async fn test_config_defaults() {
    let config = AccountAggregationConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(15));
    assert_eq!(config.quota.limit, 10);
    assert_eq!(config.quota.window, Duration::from_secs(60));
}

#[tokio::test]
async fn test_all_sources_are_normalized() {
    let api = Arc::new(MockSteamApi::healthy());
    let service = service_with(api.clone(), 10);

    let signals = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();

    assert_eq!(api.fetch_calls(), Endpoint::ALL.len());

    let profile = signals.profile.expect("profile present");
    assert_eq!(profile.steam_id, Some(gaben()));
    assert_eq!(profile.visibility, Visibility::Public);
    assert_eq!(profile.created_at, Some(1_063_407_589));
    assert_eq!(profile.display_name.as_deref(), Some("Rabscuttle"));
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some("https://avatars.example/full.jpg")
    );
    assert_eq!(profile.country_code.as_deref(), Some("US"));

    let ban = signals.ban.expect("ban record present");
    assert_eq!(ban.vac_bans, 0);
    assert_eq!(ban.game_bans, 0);
    assert!(!ban.community_banned);
    assert_eq!(ban.economy_ban, EconomyBan::None);
    assert!(!ban.has_any_ban());

    let extras = signals.extras;
    assert_eq!(extras.level, Some(12));
    assert_eq!(extras.badges_count, Some(3));
    assert_eq!(extras.friends, Some(2));
    assert_eq!(extras.games, Some(42));
    assert_eq!(extras.groups, Some(1));
    assert_eq!(extras.recent_games_count, Some(2));
    assert_eq!(extras.recent_minutes, Some(120));
}

#[tokio::test]
async fn test_failed_sources_degrade_to_absent_fields() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_source(Endpoint::Badges, SourceReply::Fail)
            .with_source(Endpoint::FriendList, SourceReply::Json(json!("<html>oops</html>")))
            .with_source(Endpoint::RecentlyPlayed, SourceReply::Fail),
    );
    let service = service_with(api, 10);

    let signals = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();

    assert!(signals.profile.is_some());
    assert!(signals.ban.is_some());
    assert_eq!(signals.extras.level, None);
    assert_eq!(signals.extras.badges_count, None);
    assert_eq!(signals.extras.friends, None);
    assert_eq!(signals.extras.recent_games_count, None);
    assert_eq!(signals.extras.recent_minutes, None);
    assert_eq!(signals.extras.games, Some(42));
}

#[tokio::test]
async fn test_missing_player_yields_null_profile() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_source(
                Endpoint::PlayerSummaries,
                SourceReply::Json(json!({ "response": { "players": [] } })),
            )
            .with_source(Endpoint::PlayerBans, SourceReply::Fail),
    );
    let service = service_with(api, 10);

    let signals = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();

    assert_eq!(signals.profile, None);
    assert_eq!(signals.ban, None);
}

#[tokio::test]
async fn test_explicit_zero_is_distinct_from_unavailable() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_source(
                Endpoint::RecentlyPlayed,
                SourceReply::Json(json!({ "response": {} })),
            )
            .with_source(
                Endpoint::FriendList,
                SourceReply::Json(json!({ "friendslist": { "friends": [] } })),
            )
            .with_source(Endpoint::GroupList, SourceReply::Json(json!({ "response": {} }))),
    );
    let service = service_with(api, 10);

    let extras = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap()
        .extras;

    assert_eq!(extras.recent_games_count, Some(0));
    assert_eq!(extras.recent_minutes, Some(0));
    assert_eq!(extras.friends, Some(0));
    assert_eq!(extras.groups, None);
}

#[tokio::test]
async fn test_ban_record_fields() {
    let api = Arc::new(MockSteamApi::healthy().with_source(
        Endpoint::PlayerBans,
        SourceReply::Json(json!({
            "players": [{
                "SteamId": GABEN_ID,
                "CommunityBanned": true,
                "VACBanned": true,
                "NumberOfVACBans": 2,
                "DaysSinceLastBan": 400,
                "NumberOfGameBans": 1,
                "EconomyBan": "probation"
            }]
        })),
    ));
    let service = service_with(api, 10);

    let ban = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap()
        .ban
        .unwrap();

    assert_eq!(ban.vac_bans, 2);
    assert_eq!(ban.game_bans, 1);
    assert!(ban.community_banned);
    assert_eq!(ban.days_since_last_ban, Some(400));
    assert_eq!(ban.economy_ban, EconomyBan::Restricted("probation".into()));
}

#[tokio::test]
async fn test_missing_credentials_is_configuration_error() {
    let api = Arc::new(MockSteamApi::healthy().without_credentials());
    let service = service_with(api.clone(), 10);

    let err = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap_err();

    assert!(matches!(err, TrustError::Configuration(_)));
    assert_eq!(api.fetch_calls(), 0);
}

#[tokio::test]
async fn test_route_is_rate_limited_before_any_upstream_call() {
    let api = Arc::new(MockSteamApi::healthy());
    let service = service_with(api.clone(), 1);

    service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();
    let err = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap_err();

    assert!(matches!(err, TrustError::RateLimited { .. }));
    assert_eq!(api.fetch_calls(), Endpoint::ALL.len());
}

#[tokio::test(start_paused = true)]
async fn test_shared_deadline_fails_whole_fetch() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_source(Endpoint::Badges, SourceReply::Hang)
            .with_source(Endpoint::OwnedGames, SourceReply::Hang)
            .with_source(Endpoint::RecentlyPlayed, SourceReply::Hang),
    );
    let service = service_with(api.clone(), 10);

    let err = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap_err();

    match err {
        TrustError::Timeout { after } => assert_eq!(after, Duration::from_secs(15)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(api.fetch_calls(), Endpoint::ALL.len());
}

#[tokio::test]
async fn test_every_source_throttled_is_rate_limited() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_all_sources(SourceReply::Throttled(Duration::from_millis(12_300)))
            .with_source(Endpoint::PlayerBans, SourceReply::RateLimited(30)),
    );
    let service = service_with(api, 10);

    let err = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap_err();

    match err {
        TrustError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 30),
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_some_sources_throttled_still_degrade_to_absent_fields() {
    let api = Arc::new(
        MockSteamApi::healthy()
            .with_source(Endpoint::Badges, SourceReply::RateLimited(30))
            .with_source(
                Endpoint::GroupList,
                SourceReply::Throttled(Duration::from_secs(5)),
            ),
    );
    let service = service_with(api, 10);

    let signals = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();

    assert!(signals.profile.is_some());
    assert_eq!(signals.extras.level, None);
    assert_eq!(signals.extras.groups, None);
    assert_eq!(signals.extras.games, Some(42));
}

#[tokio::test]
async fn test_every_source_failing_for_other_reasons_is_an_empty_record() {
    let api = Arc::new(MockSteamApi::healthy().with_all_sources(SourceReply::Fail));
    let service = service_with(api, 10);

    let signals = service
        .fetch_account_signals("1.2.3.4", &gaben())
        .await
        .unwrap();

    assert_eq!(signals.profile, None);
    assert_eq!(signals.ban, None);
    assert_eq!(signals.extras, crate::models::ExtrasRecord::default());
}
