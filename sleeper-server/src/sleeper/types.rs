//! Sleeper API records.
//!
//! These mirror the upstream JSON. Fields we don't name are kept in `extra`
//! so they are re-exposed unchanged. Sleeper omits or nulls fields freely,
//! so most of them are optional or defaulted.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// CDN base for user and league avatars.
const AVATAR_CDN: &str = "https://sleepercdn.com/avatars";

/// A Sleeper user, as returned by `/user/{id}` and `/league/{id}/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,

    /// League member listings don't always carry the username.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Avatar identifier on the Sleeper CDN.
    #[serde(default)]
    pub avatar: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_bot: bool,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Full-size avatar URL, if the user has one.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| format!("{AVATAR_CDN}/{a}"))
    }

    /// Thumbnail avatar URL, if the user has one.
    pub fn avatar_thumbnail_url(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| format!("{AVATAR_CDN}/thumbs/{a}"))
    }
}

/// Lifecycle state of a league.
///
/// Sleeper may introduce new states; those are kept verbatim in `Other`
/// rather than failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeagueStatus {
    PreDraft,
    Drafting,
    InSeason,
    Complete,
    Other(String),
}

impl LeagueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LeagueStatus::PreDraft => "pre_draft",
            LeagueStatus::Drafting => "drafting",
            LeagueStatus::InSeason => "in_season",
            LeagueStatus::Complete => "complete",
            LeagueStatus::Other(s) => s,
        }
    }
}

impl From<String> for LeagueStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pre_draft" => LeagueStatus::PreDraft,
            "drafting" => LeagueStatus::Drafting,
            "in_season" => LeagueStatus::InSeason,
            "complete" => LeagueStatus::Complete,
            _ => LeagueStatus::Other(s),
        }
    }
}

impl From<LeagueStatus> for String {
    fn from(status: LeagueStatus) -> Self {
        match status {
            LeagueStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LeagueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fantasy league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub league_id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub season: String,

    pub status: LeagueStatus,

    #[serde(default)]
    pub sport: Option<String>,

    #[serde(default)]
    pub total_rosters: Option<u32>,

    /// League settings. Opaque: the keys vary by league type.
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub scoring_settings: Map<String, Value>,

    /// Starting lineup slots, in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub roster_positions: Vec<String>,

    #[serde(default)]
    pub previous_league_id: Option<String>,

    #[serde(default)]
    pub draft_id: Option<String>,

    #[serde(default)]
    pub avatar: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Win/loss record and points for a roster.
///
/// Sleeper splits points into an integer part and a two-digit decimal part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterSettings {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub fpts: i64,
    pub fpts_decimal: Option<u32>,
    pub fpts_against: Option<i64>,
    pub fpts_against_decimal: Option<u32>,
    pub waiver_position: Option<u32>,
    pub waiver_budget_used: Option<u32>,
    pub total_moves: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RosterSettings {
    /// Points scored, recombined from the integer and decimal fields.
    pub fn points_for(&self) -> f64 {
        combine_points(self.fpts, self.fpts_decimal)
    }

    /// Points conceded, recombined from the integer and decimal fields.
    pub fn points_against(&self) -> f64 {
        combine_points(self.fpts_against.unwrap_or(0), self.fpts_against_decimal)
    }
}

fn combine_points(whole: i64, hundredths: Option<u32>) -> f64 {
    whole as f64 + f64::from(hundredths.unwrap_or(0)) / 100.0
}

/// A team's roster within a league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    /// Unique within the league. Sleeper sends a number; we keep it opaque.
    #[serde(deserialize_with = "opaque_id")]
    pub roster_id: String,

    pub league_id: String,

    /// Orphaned rosters have no owner.
    #[serde(default)]
    pub owner_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub starters: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reserve: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: RosterSettings,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An NFL player from the players directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,

    /// Team defenses have no full name.
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    pub team: Option<String>,

    #[serde(default)]
    pub number: Option<u32>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Players directory, keyed by player id.
pub type Players = HashMap<String, Player>;

/// Current state of the NFL season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NflState {
    pub week: u32,
    pub season: String,
    pub season_type: String,
    pub display_week: u32,

    #[serde(default)]
    pub leg: u32,

    #[serde(default)]
    pub previous_season: Option<String>,

    #[serde(default)]
    pub league_season: Option<String>,

    #[serde(default)]
    pub league_create_season: Option<String>,

    #[serde(default)]
    pub season_start_date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept either a JSON string or number and keep it as a string.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
