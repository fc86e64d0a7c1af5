//! End-to-end trust check: resolve, aggregate, score, report

use crate::account_aggregation_service::AccountAggregationService;
use crate::error::TrustError;
use crate::identity_resolver::IdentityResolver;
use crate::models::{BanRecord, ExtrasRecord, ProfileRecord};
use crate::report::render_report;
use crate::scoring::{compute_score_at, ScoreOptions, ScoreResult};
use crate::steam_id::CanonicalAccountId;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustReport {
    pub steamid: CanonicalAccountId,
    pub profile: ProfileRecord,
    pub ban: Option<BanRecord>,
    pub extras: ExtrasRecord,
    pub score: ScoreResult,
    pub report: String,
}

pub struct TrustChecker {
    resolver: Arc<IdentityResolver>,
    aggregation: Arc<AccountAggregationService>,
}

impl TrustChecker {
    pub fn new(resolver: Arc<IdentityResolver>, aggregation: Arc<AccountAggregationService>) -> Self {
        Self {
            resolver,
            aggregation,
        }
    }

    pub async fn check(
        &self,
        client: &str,
        input: &str,
        options: &ScoreOptions,
    ) -> Result<TrustReport, TrustError> {
        let id = self.resolver.resolve(client, input).await?;
        let signals = self.aggregation.fetch_account_signals(client, &id).await?;

        let profile = signals.profile.ok_or_else(|| {
            TrustError::NotFound(format!("no player summary returned for {id}"))
        })?;

        let now = Utc::now();
        let score = compute_score_at(
            &profile,
            signals.ban.as_ref(),
            &signals.extras,
            options,
            now.timestamp(),
        );
        let report = render_report(
            &id,
            &profile,
            signals.ban.as_ref(),
            &signals.extras,
            &score,
            now,
        );

        Ok(TrustReport {
            steamid: id,
            profile,
            ban: signals.ban,
            extras: signals.extras,
            score,
            report,
        })
    }
}
