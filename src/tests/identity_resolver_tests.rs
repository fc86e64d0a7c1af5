use super::mock_steam_api::{MockSteamApi, VanityReply, GABEN_ID};
use crate::error::TrustError;
use crate::identity_resolver::{classify, IdentityResolver, InputShape};
use crate::rate_limiter::{RateLimiter, RouteQuota};
use crate::steam_id::CanonicalAccountId;
use std::sync::Arc;
use std::time::Duration;

const ID: &str = "76561198000000000";

fn canonical(id: &str) -> InputShape {
    InputShape::Canonical(CanonicalAccountId::new(id).unwrap())
}

fn vanity(name: &str) -> InputShape {
    InputShape::Vanity(name.to_string())
}

fn resolver_with(api: Arc<MockSteamApi>, limit: u32) -> IdentityResolver {
    IdentityResolver::new(
        api,
        Arc::new(RateLimiter::new(1000)),
        RouteQuota::new(limit, Duration::from_secs(60)),
    )
}

#[test]
fn test_classify_canonical_forms() {
    assert_eq!(classify(ID), canonical(ID));
    assert_eq!(classify("  76561198000000000\n"), canonical(ID));
    assert_eq!(
        classify("https://steamcommunity.com/profiles/76561198000000000/"),
        canonical(ID)
    );
    assert_eq!(
        classify("steamcommunity.com/profiles/76561198000000000"),
        canonical(ID)
    );
    assert_eq!(classify("<76561198000000000>"), canonical(ID));
    assert_eq!(
        classify("my id is 76561198000000000, add me"),
        canonical(ID)
    );
}

#[test]
fn test_classify_loose_seventeen_digit_forms() {
    // Canonical prefix not required once the shape itself is explicit
    assert_eq!(
        classify("12345678901234567"),
        canonical("12345678901234567")
    );
    assert_eq!(
        classify("steam://url/SteamIDPage/12345678901234567"),
        canonical("12345678901234567")
    );
    assert_eq!(
        classify("profiles/12345678901234567"),
        canonical("12345678901234567")
    );
}

#[test]
fn test_classify_vanity_forms() {
    assert_eq!(
        classify("https://steamcommunity.com/id/somevanity/"),
        vanity("somevanity")
    );
    assert_eq!(
        classify("http://www.steamcommunity.com/id/SomeVanity?tab=all"),
        vanity("SomeVanity")
    );
    assert_eq!(
        classify("steamcommunity.com/id/gabelogannewell"),
        vanity("gabelogannewell")
    );
    assert_eq!(
        classify("<https://steamcommunity.com/id/bob_the_builder>"),
        vanity("bob_the_builder")
    );
    assert_eq!(classify("gaben@steam"), vanity("gaben"));
    assert_eq!(classify("gaben @Steam"), vanity("gaben"));
    assert_eq!(classify("/id/someone"), vanity("someone"));
    assert_eq!(classify("id/someone/games"), vanity("someone"));
    assert_eq!(classify("robin-walker"), vanity("robin-walker"));
}

#[test]
fn test_classify_unrecognized() {
    assert_eq!(classify("not a valid id!!"), InputShape::Unrecognized);
    assert_eq!(classify(""), InputShape::Unrecognized);
    assert_eq!(classify("ab"), InputShape::Unrecognized);
    assert_eq!(
        classify("https://example.com/id/someone"),
        InputShape::Unrecognized
    );
    assert_eq!(
        classify(&"x".repeat(33)),
        InputShape::Unrecognized
    );
}

#[tokio::test]
async fn test_canonical_input_never_calls_upstream() {
    let api = Arc::new(MockSteamApi::empty());
    let resolver = resolver_with(api.clone(), 1);

    for _ in 0..5 {
        let id = resolver.resolve("1.2.3.4", ID).await.unwrap();
        assert_eq!(id.as_str(), ID);
    }
    let id = resolver
        .resolve("1.2.3.4", "https://steamcommunity.com/profiles/76561198000000000")
        .await
        .unwrap();
    assert_eq!(id.as_str(), ID);

    assert_eq!(api.vanity_calls(), 0);
}

#[tokio::test]
async fn test_vanity_url_delegates_to_upstream() {
    let api = Arc::new(MockSteamApi::empty().with_vanity("somevanity", VanityReply::Found(ID)));
    let resolver = resolver_with(api.clone(), 10);

    let id = resolver
        .resolve("1.2.3.4", "https://steamcommunity.com/id/somevanity")
        .await
        .unwrap();
    assert_eq!(id.as_str(), ID);
    assert_eq!(api.vanity_calls(), 1);
}

#[tokio::test]
async fn test_unrecognized_input_is_not_found_without_upstream_call() {
    let api = Arc::new(MockSteamApi::healthy());
    let resolver = resolver_with(api.clone(), 10);

    let err = resolver
        .resolve("1.2.3.4", "not a valid id!!")
        .await
        .unwrap_err();
    assert!(matches!(err, TrustError::NotFound(_)));
    assert_eq!(api.vanity_calls(), 0);
}

#[tokio::test]
async fn test_unknown_vanity_is_not_found() {
    let api = Arc::new(MockSteamApi::empty().with_vanity("ghost", VanityReply::Missing));
    let resolver = resolver_with(api.clone(), 10);

    let err = resolver.resolve("1.2.3.4", "ghost").await.unwrap_err();
    assert!(matches!(err, TrustError::NotFound(_)));
    assert_eq!(api.vanity_calls(), 1);
}

#[tokio::test]
async fn test_upstream_throttling_surfaces_as_rate_limited() {
    let api = Arc::new(MockSteamApi::empty().with_vanity("busy", VanityReply::RateLimited(30)));
    let resolver = resolver_with(api, 10);

    let err = resolver.resolve("1.2.3.4", "busy").await.unwrap_err();
    assert!(matches!(
        err,
        TrustError::RateLimited {
            retry_after_secs: 30
        }
    ));
}

#[tokio::test]
async fn test_vanity_route_is_rate_limited_per_client() {
    let api = Arc::new(MockSteamApi::healthy());
    let resolver = resolver_with(api.clone(), 2);

    for _ in 0..2 {
        let id = resolver.resolve("1.2.3.4", "gaben").await.unwrap();
        assert_eq!(id.as_str(), GABEN_ID);
    }

    let err = resolver.resolve("1.2.3.4", "gaben").await.unwrap_err();
    match err {
        TrustError::RateLimited { retry_after_secs } => assert!(retry_after_secs >= 1),
        other => panic!("expected rate limit, got {other:?}"),
    }
    // The rejected request never reached upstream
    assert_eq!(api.vanity_calls(), 2);

    // A different client has its own window
    assert!(resolver.resolve("5.6.7.8", "gaben").await.is_ok());
    assert_eq!(api.vanity_calls(), 3);
}
