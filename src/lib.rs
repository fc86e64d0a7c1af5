pub mod account_aggregation_service;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity_resolver;
pub mod models;
pub mod rate_limit_manager;
pub mod rate_limiter;
pub mod report;
pub mod scoring;
pub mod state;
pub mod steam_api;
pub mod steam_id;
pub mod trust_check;

#[cfg(test)]
mod tests;

pub use account_aggregation_service::{AccountAggregationConfig, AccountAggregationService};
pub use config::Config;
pub use error::{TrustError, UpstreamError};
pub use identity_resolver::{IdentityResolver, InputShape};
pub use models::{AccountSignals, BanRecord, EconomyBan, ExtrasRecord, ProfileRecord, RiskLevel, Visibility};
pub use rate_limit_manager::RateLimitManager;
pub use rate_limiter::{ClientKey, RateLimiter, RetryAfter, Route, RouteQuota};
pub use scoring::{compute_score, compute_score_at, ScoreOptions, ScoreResult};
pub use state::{spawn_rate_limit_sweeper, AppState};
pub use steam_api::{Endpoint, HttpSteamApi, HttpSteamApiConfig, SteamApi};
pub use steam_id::CanonicalAccountId;
pub use trust_check::{TrustChecker, TrustReport};
