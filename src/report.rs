//! Plain-text reputation report for copying into chats and tickets

use crate::models::{BanRecord, EconomyBan, ExtrasRecord, ProfileRecord};
use crate::scoring::ScoreResult;
use crate::steam_id::CanonicalAccountId;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub fn render_report(
    id: &CanonicalAccountId,
    profile: &ProfileRecord,
    ban: Option<&BanRecord>,
    extras: &ExtrasRecord,
    score: &ScoreResult,
    generated_at: DateTime<Utc>,
) -> String {
    let default_ban = BanRecord::default();
    let ban = ban.unwrap_or(&default_ban);

    let display_name = profile.display_name.as_deref().unwrap_or("Unknown");
    let trading = match &ban.economy_ban {
        EconomyBan::None => "None",
        EconomyBan::Restricted(status) => status.as_str(),
    };
    // Steam reports zero days when there has never been a ban
    let last_ban = match ban.days_since_last_ban {
        Some(days) if days > 0 => format!("{days} days ago"),
        _ => "N/A".to_string(),
    };
    let recent_hours = (extras.recent_minutes.unwrap_or(0) as f64 / 60.0).round() as u64;

    let mut out = String::new();
    let _ = writeln!(out, "Steam Account Reputation Report For {display_name} - {id}");
    let _ = writeln!(out);
    let _ = write!(
        out,
        "Profile: {}",
        if score.is_private { "Private" } else { "Public" }
    );
    if let Some(days) = score.age_days {
        let _ = write!(out, ", Age: {days} days");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Bans: VAC {}, Game {}, Community {}, Trading {}",
        ban.vac_bans,
        ban.game_bans,
        if ban.community_banned { "Yes" } else { "No" },
        trading
    );
    let _ = writeln!(out, "Last ban: {last_ban}");
    let _ = writeln!(
        out,
        "Level: {}, Badges: {}, Games: {}, Groups: {}",
        or_unknown(extras.level),
        or_unknown(extras.badges_count),
        or_unknown(extras.games),
        or_unknown(extras.groups)
    );
    let _ = writeln!(
        out,
        "Recent games: {}, Recent playtime: {}h",
        extras.recent_games_count.unwrap_or(0),
        recent_hours
    );
    let _ = writeln!(
        out,
        "Score: {}/100 - {}",
        score.score,
        score.level.verdict()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Account URL: {}", id.profile_url());
    let _ = write!(
        out,
        "Report generated at {}",
        generated_at.format("%d/%m/%Y %H:%M:%S UTC")
    );
    out
}

fn or_unknown(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}
