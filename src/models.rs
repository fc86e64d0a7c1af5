//! Normalized account signals and the raw upstream payloads they are built from
//!
//! Raw payloads mirror the Steam Web API JSON. They are converted exactly once,
//! in [`AccountSignals::from_sources`], into the tagged records the scoring
//! engine and the presentation layer consume.

use crate::steam_id::CanonicalAccountId;
use serde::{Deserialize, Serialize};

/// Raw `communityvisibilitystate` value meaning "public".
pub const PUBLIC_VISIBILITY_STATE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    /// Friends-only, private, or any state other than public.
    Private,
}

impl Visibility {
    pub fn from_state(state: i64) -> Self {
        if state == PUBLIC_VISIBILITY_STATE {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Trading restriction status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum EconomyBan {
    None,
    /// Any value other than `none`, verbatim (`probation`, `banned`, ...).
    Restricted(String),
}

impl EconomyBan {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            EconomyBan::None
        } else {
            EconomyBan::Restricted(trimmed.to_string())
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, EconomyBan::Restricted(_))
    }
}

/// Score bucket shared by the overall score and the account-age chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Ok,
    Warn,
    Err,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskLevel::Ok
        } else if score >= 40 {
            RiskLevel::Warn
        } else {
            RiskLevel::Err
        }
    }

    pub fn verdict(self) -> &'static str {
        match self {
            RiskLevel::Ok => "Good Account",
            RiskLevel::Warn => "Manual Review Needed",
            RiskLevel::Err => "Risky Account",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub steam_id: Option<CanonicalAccountId>,
    pub visibility: Visibility,
    /// Unix seconds; `None` when hidden or reported as zero.
    pub created_at: Option<i64>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub country_code: Option<String>,
    pub avatar_hash: Option<String>,
}

impl Default for ProfileRecord {
    fn default() -> Self {
        Self {
            steam_id: None,
            visibility: Visibility::Private,
            created_at: None,
            display_name: None,
            avatar_url: None,
            profile_url: None,
            country_code: None,
            avatar_hash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub vac_bans: u32,
    pub game_bans: u32,
    pub community_banned: bool,
    pub economy_ban: EconomyBan,
    pub days_since_last_ban: Option<u32>,
}

impl BanRecord {
    pub fn has_any_ban(&self) -> bool {
        self.vac_bans > 0 || self.game_bans > 0 || self.community_banned || self.economy_ban.is_restricted()
    }
}

impl Default for BanRecord {
    fn default() -> Self {
        Self {
            vac_bans: 0,
            game_bans: 0,
            community_banned: false,
            economy_ban: EconomyBan::None,
            days_since_last_ban: None,
        }
    }
}

/// Secondary signals. `None` means the source was unavailable, which is
/// distinct from an explicit zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrasRecord {
    pub friends: Option<u32>,
    pub games: Option<u32>,
    pub level: Option<u32>,
    pub badges_count: Option<u32>,
    pub groups: Option<u32>,
    pub recent_games_count: Option<u32>,
    pub recent_minutes: Option<u64>,
}

/// Everything the gateway gathered for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSignals {
    pub profile: Option<ProfileRecord>,
    pub ban: Option<BanRecord>,
    pub extras: ExtrasRecord,
}

/// One optional payload per upstream source.
#[derive(Debug, Default)]
pub struct SourcePayloads {
    pub summaries: Option<PlayerSummariesPayload>,
    pub bans: Option<PlayerBansPayload>,
    pub badges: Option<BadgesPayload>,
    pub friends: Option<FriendListPayload>,
    pub owned_games: Option<OwnedGamesPayload>,
    pub groups: Option<GroupListPayload>,
    pub recent_games: Option<RecentlyPlayedPayload>,
}

impl AccountSignals {
    pub fn from_sources(sources: SourcePayloads) -> Self {
        let profile = sources
            .summaries
            .and_then(|s| s.response.players.into_iter().next())
            .map(ProfileRecord::from);

        let ban = sources
            .bans
            .and_then(|b| b.players.into_iter().next())
            .map(BanRecord::from);

        let (level, badges_count) = match sources.badges {
            Some(b) => (
                b.response.player_level,
                b.response.badges.map(|v| v.len() as u32),
            ),
            None => (None, None),
        };

        let friends = sources
            .friends
            .and_then(|f| f.friendslist)
            .and_then(|l| l.friends)
            .map(|v| v.len() as u32);

        let games = sources.owned_games.and_then(|o| o.response.game_count);

        let groups = sources
            .groups
            .and_then(|g| g.response.groups)
            .map(|v| v.len() as u32);

        let (recent_games_count, recent_minutes) = match sources.recent_games {
            Some(r) => {
                let minutes = r
                    .response
                    .games
                    .as_ref()
                    .map(|games| games.iter().map(|g| g.playtime_2weeks.unwrap_or(0)).sum())
                    .unwrap_or(0);
                (Some(r.response.total_count.unwrap_or(0)), Some(minutes))
            }
            None => (None, None),
        };

        Self {
            profile,
            ban,
            extras: ExtrasRecord {
                friends,
                games,
                level,
                badges_count,
                groups,
                recent_games_count,
                recent_minutes,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Raw upstream payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummariesPayload {
    #[serde(default)]
    pub response: PlayerSummariesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummariesResponse {
    #[serde(default)]
    pub players: Vec<RawPlayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayer {
    #[serde(default)]
    pub steamid: Option<String>,
    #[serde(default)]
    pub communityvisibilitystate: Option<i64>,
    #[serde(default)]
    pub timecreated: Option<i64>,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub avatarfull: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profileurl: Option<String>,
    #[serde(default)]
    pub loccountrycode: Option<String>,
    #[serde(default)]
    pub avatarhash: Option<String>,
}

impl From<RawPlayer> for ProfileRecord {
    fn from(raw: RawPlayer) -> Self {
        Self {
            steam_id: raw.steamid.as_deref().and_then(CanonicalAccountId::new),
            visibility: Visibility::from_state(raw.communityvisibilitystate.unwrap_or(0)),
            created_at: raw.timecreated.filter(|&t| t != 0),
            display_name: raw.personaname,
            avatar_url: raw.avatarfull.or(raw.avatar),
            profile_url: raw.profileurl,
            country_code: raw.loccountrycode,
            avatar_hash: raw.avatarhash,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerBansPayload {
    #[serde(default)]
    pub players: Vec<RawBan>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBan {
    #[serde(default)]
    pub community_banned: bool,
    #[serde(default, rename = "NumberOfVACBans")]
    pub number_of_vac_bans: u32,
    #[serde(default)]
    pub number_of_game_bans: u32,
    #[serde(default)]
    pub days_since_last_ban: Option<u32>,
    #[serde(default)]
    pub economy_ban: Option<String>,
}

impl From<RawBan> for BanRecord {
    fn from(raw: RawBan) -> Self {
        Self {
            vac_bans: raw.number_of_vac_bans,
            game_bans: raw.number_of_game_bans,
            community_banned: raw.community_banned,
            economy_ban: EconomyBan::from_raw(raw.economy_ban.as_deref().unwrap_or("none")),
            days_since_last_ban: raw.days_since_last_ban,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadgesPayload {
    #[serde(default)]
    pub response: BadgesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadgesResponse {
    #[serde(default)]
    pub player_level: Option<u32>,
    #[serde(default)]
    pub badges: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendListPayload {
    #[serde(default)]
    pub friendslist: Option<FriendList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendList {
    #[serde(default)]
    pub friends: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesPayload {
    #[serde(default)]
    pub response: OwnedGamesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesResponse {
    #[serde(default)]
    pub game_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupListPayload {
    #[serde(default)]
    pub response: GroupListResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupListResponse {
    #[serde(default)]
    pub groups: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentlyPlayedPayload {
    #[serde(default)]
    pub response: RecentlyPlayedResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub games: Option<Vec<RecentGame>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentGame {
    #[serde(default)]
    pub playtime_2weeks: Option<u64>,
}
