//! Identity resolution: free-form user input to a canonical account id
//!
//! Classification is pure and never touches the network. Only inputs that
//! look like vanity names reach the upstream lookup, and that lookup is
//! rate limited on its own route.

use crate::error::{TrustError, UpstreamError};
use crate::rate_limiter::{ClientKey, RateLimiter, Route, RouteQuota};
use crate::steam_api::SteamApi;
use crate::steam_id::{is_seventeen_digits, CanonicalAccountId};
use regex::Regex;
use reqwest::Url;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::{debug, info};

/// Community site host; subdomains are accepted too.
pub const COMMUNITY_HOST: &str = "steamcommunity.com";

static STEAM_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*@steam$").expect("valid regex"));

static HAS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid regex"));

static SHORT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^/?(?:id|profiles)/([^/?#]+)").expect("valid regex"));

static VANITY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{3,32}$").expect("valid regex"));

/// What a piece of input turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
    /// Resolved without any upstream call.
    Canonical(CanonicalAccountId),
    /// Needs a vanity lookup.
    Vanity(String),
    Unrecognized,
}

/// Classify raw input. First match wins.
pub fn classify(raw: &str) -> InputShape {
    let trimmed = raw.trim();

    if let Some(id) = CanonicalAccountId::find_embedded(trimmed) {
        return InputShape::Canonical(id);
    }

    let input = strip_decorations(trimmed);

    if let Some(id) = CanonicalAccountId::new(input) {
        return InputShape::Canonical(id);
    }

    if let Some(shape) = classify_url(input) {
        return shape;
    }

    if let Some(token) = SHORT_PATH
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        return match CanonicalAccountId::new(token) {
            Some(id) => InputShape::Canonical(id),
            None => InputShape::Vanity(token.to_string()),
        };
    }

    if VANITY_NAME.is_match(input) {
        return InputShape::Vanity(input.to_string());
    }

    InputShape::Unrecognized
}

/// Drop `<...>` wrapping and a trailing `@steam`.
fn strip_decorations(input: &str) -> &str {
    let input = input.strip_prefix('<').unwrap_or(input);
    let input = input.strip_suffix('>').unwrap_or(input);
    match STEAM_SUFFIX.find(input) {
        Some(m) => &input[..m.start()],
        None => input,
    }
}

fn classify_url(input: &str) -> Option<InputShape> {
    let candidate = if HAS_SCHEME.is_match(input) {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&candidate).ok()?;

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let is_community =
        host == COMMUNITY_HOST || host.ends_with(&format!(".{COMMUNITY_HOST}"));

    if is_community {
        let parts: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        let first = parts.first().map(|s| s.to_ascii_lowercase());
        match (first.as_deref(), parts.get(1)) {
            (Some("profiles"), Some(p)) if is_seventeen_digits(p) => {
                return CanonicalAccountId::new(p).map(InputShape::Canonical);
            }
            (Some("id"), Some(vanity)) => return Some(InputShape::Vanity(vanity.to_string())),
            _ => {}
        }
    }

    if url.scheme().starts_with("steam") {
        if let Some(id) = CanonicalAccountId::find_digit_run(input) {
            return Some(InputShape::Canonical(id));
        }
    }

    None
}

/// Turns user input into a canonical account id.
pub struct IdentityResolver {
    api: Arc<dyn SteamApi>,
    rate_limiter: Arc<RateLimiter>,
    vanity_quota: RouteQuota,
}

impl IdentityResolver {
    pub fn new(
        api: Arc<dyn SteamApi>,
        rate_limiter: Arc<RateLimiter>,
        vanity_quota: RouteQuota,
    ) -> Self {
        Self {
            api,
            rate_limiter,
            vanity_quota,
        }
    }

    /// Resolve `input` on behalf of `client` (the caller's network address).
    pub async fn resolve(
        &self,
        client: &str,
        input: &str,
    ) -> Result<CanonicalAccountId, TrustError> {
        match classify(input) {
            InputShape::Canonical(id) => {
                debug!("Resolved {:?} locally to {}", input, id);
                Ok(id)
            }
            InputShape::Vanity(vanity) => self.resolve_vanity(client, &vanity).await,
            InputShape::Unrecognized => {
                debug!("Input {:?} matches no known id shape", input);
                Err(TrustError::NotFound(format!(
                    "could not resolve {:?} to a Steam account",
                    input.trim()
                )))
            }
        }
    }

    /// Look a vanity name up upstream, rate limited on the `resolve-vanity` route.
    pub async fn resolve_vanity(
        &self,
        client: &str,
        vanity: &str,
    ) -> Result<CanonicalAccountId, TrustError> {
        self.rate_limiter
            .check(&ClientKey::new(client, Route::ResolveVanity), self.vanity_quota)?;

        let started = Instant::now();
        let result = self.api.resolve_vanity(vanity).await;
        let dur_ms = started.elapsed().as_millis();

        match result {
            Ok(Some(id)) => {
                info!(
                    "Lookup: ip={} route={} vanity={:?} -> steamid={} dur_ms={}",
                    client,
                    Route::ResolveVanity,
                    vanity,
                    id,
                    dur_ms
                );
                Ok(id)
            }
            Ok(None) => {
                info!(
                    "Lookup: ip={} route={} vanity={:?} result=not_found dur_ms={}",
                    client,
                    Route::ResolveVanity,
                    vanity,
                    dur_ms
                );
                Err(TrustError::NotFound(format!("no profile named {vanity:?}")))
            }
            Err(e @ (UpstreamError::RateLimited { .. } | UpstreamError::Throttled { .. })) => {
                let retry_after_secs = e.retry_after_secs().unwrap_or(60);
                info!(
                    "Lookup: ip={} route={} vanity={:?} result=upstream_rate_limited retry_after={}s",
                    client,
                    Route::ResolveVanity,
                    vanity,
                    retry_after_secs
                );
                Err(TrustError::RateLimited { retry_after_secs })
            }
            Err(e) => {
                info!(
                    "Lookup: ip={} route={} vanity={:?} result=error error={} dur_ms={}",
                    client,
                    Route::ResolveVanity,
                    vanity,
                    e,
                    dur_ms
                );
                Err(TrustError::NotFound(format!("no profile named {vanity:?}")))
            }
        }
    }
}
