//! Response shapes for the IFPA API.
//!
//! # Design
//! These are deliberately thin: the engine only needs something serde can
//! deserialize into, and search envelopes only need to yield their items.
//! Optional fields default to `None` so sparse upstream records deserialize;
//! unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// A row in a player search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSummary {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub stateprov: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub wppr_rank: Option<u32>,
}

/// Full player profile returned by `/player/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub stateprov: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub wppr_rank: Option<u32>,
    #[serde(default)]
    pub wppr_points: Option<f64>,
    #[serde(default)]
    pub events_played: Option<u32>,
}

/// Head-to-head record between two players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PvpRecord {
    pub player_id: u64,
    pub opponent_id: u64,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tournament {
    pub tournament_id: u64,
    pub tournament_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub stateprov: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub event_start_date: Option<String>,
    #[serde(default)]
    pub event_end_date: Option<String>,
    #[serde(default)]
    pub tournament_type: Option<String>,
    #[serde(default)]
    pub player_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentResults {
    pub tournament_id: u64,
    pub results: Vec<TournamentResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentResult {
    pub position: u32,
    pub player_id: u64,
    pub player_name: String,
    #[serde(default)]
    pub wppr_points: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Director {
    pub director_id: u64,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub stateprov: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub tournament_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    pub rank: u32,
    pub player_id: u64,
    pub name: String,
    pub wppr_points: f64,
    #[serde(default)]
    pub country_code: Option<String>,
}

// Search envelopes. `total_results` is informational only: some endpoints
// report a total while ignoring the paging parameters entirely.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSearchPage {
    #[serde(default)]
    pub search: Vec<PlayerSummary>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentSearchPage {
    #[serde(default)]
    pub tournaments: Vec<Tournament>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectorSearchPage {
    #[serde(default)]
    pub directors: Vec<Director>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingPage {
    #[serde(default)]
    pub rankings: Vec<RankingEntry>,
}
