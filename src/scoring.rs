//! Deterministic trust scoring
//!
//! Starts from 100, subtracts ban, age and privacy penalties, adds small
//! capped bonuses for an established profile, then clamps the result under a
//! ban-derived ceiling so positive signals cannot mask a banned account.

use crate::models::{BanRecord, ExtrasRecord, ProfileRecord, RiskLevel, Visibility};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Score returned when age is unknown and the profile is private.
pub const INSUFFICIENT_DATA_SCORE: u8 = 50;

/// Bans older than this many days weigh less.
const STALE_BAN_DAYS: u32 = 180;

const SECONDS_PER_DAY: i64 = 86_400;

/// Caller-supplied scoring inputs that are not account signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOptions {
    /// An external heuristic flagged the account as suspiciously empty.
    #[serde(default)]
    pub suspicious_empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub level: RiskLevel,
    pub is_private: bool,
    pub age_days: Option<i64>,
    pub age_level: Option<RiskLevel>,
}

/// Per-ban weights.
struct BanWeights {
    vac: f64,
    game: f64,
}

impl BanWeights {
    fn penalty(stale: bool) -> Self {
        if stale {
            Self { vac: 15.0, game: 10.0 }
        } else {
            Self { vac: 25.0, game: 15.0 }
        }
    }

    fn cap(stale: bool) -> Self {
        if stale {
            Self { vac: 15.0, game: 10.0 }
        } else {
            Self { vac: 20.0, game: 15.0 }
        }
    }
}

/// Score an account as of now.
pub fn compute_score(
    profile: &ProfileRecord,
    ban: Option<&BanRecord>,
    extras: &ExtrasRecord,
    options: &ScoreOptions,
) -> ScoreResult {
    compute_score_at(profile, ban, extras, options, Utc::now().timestamp())
}

/// Score an account as of `now` (unix seconds).
pub fn compute_score_at(
    profile: &ProfileRecord,
    ban: Option<&BanRecord>,
    extras: &ExtrasRecord,
    options: &ScoreOptions,
    now: i64,
) -> ScoreResult {
    let is_private = profile.visibility != Visibility::Public;
    let age_days = account_age_days(profile.created_at, now);
    let age_level = age_days.map(age_level);

    // Unknown age on a private profile cannot be evaluated
    if age_days.is_none() && is_private {
        return ScoreResult {
            score: INSUFFICIENT_DATA_SCORE,
            level: RiskLevel::from_score(INSUFFICIENT_DATA_SCORE),
            is_private,
            age_days,
            age_level,
        };
    }

    let default_ban = BanRecord::default();
    let ban = ban.unwrap_or(&default_ban);
    let stale = ban
        .days_since_last_ban
        .is_some_and(|days| days > STALE_BAN_DAYS);

    let mut score = 100.0;

    let weights = BanWeights::penalty(stale);
    score -= weights.vac * f64::from(ban.vac_bans);
    score -= weights.game * f64::from(ban.game_bans);
    if ban.community_banned {
        score -= 20.0;
    }
    if ban.economy_ban.is_restricted() {
        score -= 15.0;
    }

    if let Some(days) = age_days {
        score += age_adjustment(days);
    }

    if is_private {
        score -= 35.0;
    }

    score += clamp_signal(extras.friends, 100) * 0.15;
    score += clamp_signal(extras.games, 100) * 0.15;
    score += clamp_signal(extras.level, 50) * 0.2;
    score += clamp_signal(extras.badges_count, 50) * 0.1;

    if options.suspicious_empty {
        score -= 30.0;
    }

    if let Some(hash) = profile.avatar_hash.as_deref().filter(|h| !h.is_empty()) {
        // An all-zero hash is the placeholder for "no avatar ever set"
        if hash.chars().all(|c| c == '0') {
            score -= 5.0;
        } else {
            score += 5.0;
        }
    }

    if ban.has_any_ban() {
        score = score.min(ban_ceiling(ban, stale));
    }

    let score = score.round().clamp(0.0, 100.0) as u8;

    ScoreResult {
        score,
        level: RiskLevel::from_score(score),
        is_private,
        age_days,
        age_level,
    }
}

/// Highest score a banned account may reach.
pub fn ban_ceiling(ban: &BanRecord, stale: bool) -> f64 {
    let weights = BanWeights::cap(stale);
    let mut cap = 100.0;
    cap -= weights.vac * f64::from(ban.vac_bans);
    cap -= weights.game * f64::from(ban.game_bans);
    if ban.community_banned {
        cap -= 20.0;
    }
    if ban.economy_ban.is_restricted() {
        cap -= 15.0;
    }
    cap
}

pub fn account_age_days(created_at: Option<i64>, now: i64) -> Option<i64> {
    created_at
        .filter(|&t| t != 0)
        .map(|t| now.saturating_sub(t).max(0) / SECONDS_PER_DAY)
}

pub fn age_level(days: i64) -> RiskLevel {
    if days < 7 {
        RiskLevel::Err
    } else if days < 90 {
        RiskLevel::Warn
    } else {
        RiskLevel::Ok
    }
}

/// Exactly one bracket applies.
fn age_adjustment(days: i64) -> f64 {
    match days {
        d if d < 2 => -100.0,
        d if d < 3 => -90.0,
        d if d < 14 => -75.0,
        d if d < 40 => -55.0,
        d if d < 90 => -40.0,
        d if d < 110 => -25.0,
        d if d < 130 => -10.0,
        _ => 5.0,
    }
}

fn clamp_signal(value: Option<u32>, max: u32) -> f64 {
    f64::from(value.unwrap_or(0).min(max))
}
