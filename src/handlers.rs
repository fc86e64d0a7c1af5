//! HTTP surface

use crate::error::TrustError;
use crate::rate_limiter::{ClientKey, Route};
use crate::scoring::ScoreOptions;
use crate::state::AppState;
use crate::steam_id::CanonicalAccountId;
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{
        header::{CONTENT_TYPE, RETRY_AFTER, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

static INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(Deserialize)]
pub struct ResolveQuery {
    input: Option<String>,
}

#[derive(Deserialize)]
pub struct VanityQuery {
    vanity: Option<String>,
}

#[derive(Deserialize)]
pub struct AccountQuery {
    steamid: Option<String>,
}

#[derive(Deserialize)]
pub struct TrustQuery {
    input: Option<String>,
    #[serde(default)]
    suspicious_empty: bool,
}

#[derive(Serialize)]
struct ResolvedId {
    steamid: CanonicalAccountId,
}

/// Build the application router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/health", get(|| async { "OK" }))
        .route("/api/resolve", get(resolve_handler))
        .route("/api/resolve-vanity", get(resolve_vanity_handler))
        .route("/api/steam-account", get(steam_account_handler))
        .route("/api/trust", get(trust_handler))
        .layer(cors)
        .with_state(state)
}

/// Caller address, preferring proxy-supplied headers.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    for name in ["cf-connecting-ip", "true-client-ip"] {
        if let Some(ip) = header_str(headers, name).filter(|v| !v.is_empty()) {
            return ip.to_string();
        }
    }
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    peer.ip().to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

fn required(value: Option<String>, name: &str) -> Result<String, TrustError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TrustError::InvalidInput(format!("missing {name}")))
}

impl IntoResponse for TrustError {
    fn into_response(self) -> Response {
        match self {
            TrustError::RateLimited { retry_after_secs } => {
                let mut response = json_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    json!({ "error": "rate_limited", "retry_after": retry_after_secs }),
                );
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            TrustError::NotFound(_) => {
                json_response(StatusCode::NOT_FOUND, json!({ "error": "not found" }))
            }
            TrustError::InvalidInput(msg) => {
                json_response(StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            TrustError::Timeout { .. } => {
                json_response(StatusCode::GATEWAY_TIMEOUT, json!({ "error": "timeout" }))
            }
            TrustError::Configuration(msg) => {
                error!("Configuration error: {}", msg);
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "service misconfigured" }),
                )
            }
        }
    }
}

async fn index_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ip = client_ip(&headers, peer);
    if let Err(retry) = state
        .rate_limiter
        .check(&ClientKey::new(ip, Route::PageLoad), state.config.page_load_quota)
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [
                (RETRY_AFTER, retry.secs.to_string()),
                (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            ],
            "Too Many Requests",
        )
            .into_response();
    }
    Html(INDEX_TEMPLATE).into_response()
}

async fn resolve_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<ResolveQuery>,
) -> Result<Response, TrustError> {
    let input = required(params.input, "input")?;
    let ip = client_ip(&headers, peer);
    let steamid = state.resolver.resolve(&ip, &input).await?;
    Ok(json_response(StatusCode::OK, ResolvedId { steamid }))
}

async fn resolve_vanity_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<VanityQuery>,
) -> Result<Response, TrustError> {
    let vanity = required(params.vanity, "vanity")?;
    let ip = client_ip(&headers, peer);
    let steamid = state.resolver.resolve_vanity(&ip, &vanity).await?;
    Ok(json_response(StatusCode::OK, ResolvedId { steamid }))
}

async fn steam_account_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<AccountQuery>,
) -> Result<Response, TrustError> {
    let raw = required(params.steamid, "steamid")?;
    let id: CanonicalAccountId = raw.parse().map_err(TrustError::InvalidInput)?;
    let ip = client_ip(&headers, peer);
    let signals = state.aggregation.fetch_account_signals(&ip, &id).await?;
    Ok(json_response(StatusCode::OK, signals))
}

async fn trust_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<TrustQuery>,
) -> Result<Response, TrustError> {
    let input = required(params.input, "input")?;
    let ip = client_ip(&headers, peer);
    let options = ScoreOptions {
        suspicious_empty: params.suspicious_empty,
    };
    let report = state.trust_checker.check(&ip, &input, &options).await?;
    Ok(json_response(StatusCode::OK, report))
}
