//! Error types for account resolution, aggregation and scoring

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failures a caller can observe.
#[derive(Debug, Error)]
pub enum TrustError {
    /// The caller exceeded a per-route quota, or the identity service throttled us.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The input could not be resolved to an account.
    #[error("not found: {0}")]
    NotFound(String),

    /// The aggregation fan-out did not finish within its budget.
    #[error("upstream aggregation timed out after {after:?}")]
    Timeout { after: Duration },

    /// Credentials needed to call upstream are missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure of a single upstream call. The aggregation gateway turns these
/// into absent fields unless every source was rate limited.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no Steam Web API key configured")]
    MissingCredentials,

    #[error("requests to {host} throttled for {wait:?}")]
    Throttled { host: String, wait: Duration },

    #[error("upstream rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("upstream returned status {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid payload: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key
        let e = e.without_url();
        if e.is_decode() {
            UpstreamError::Parse(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

impl UpstreamError {
    /// Seconds a caller should wait if this failure means "slow down".
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            UpstreamError::Throttled { wait, .. } => Some(ceil_secs(*wait)),
            UpstreamError::RateLimited { retry_after_secs } => Some(retry_after_secs.unwrap_or(60)),
            _ => None,
        }
    }
}

/// Round a duration up to whole seconds, never below one.
pub(crate) fn ceil_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
