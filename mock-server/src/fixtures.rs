//! Deterministic fixture data served by the mock API.
//!
//! Everything is derived from ids so tests can predict results without
//! reading the tables:
//! - players `1..=237`, location cycling WA, OR, CA (US) and ON (CA) by
//!   `(id - 1) % 4`; world rank equals id.
//! - tournaments `1001..=1030`, three per month from January 2024.
//! - directors `1..=12`.
//! - two players have met exactly when they share a location.

use serde::Serialize;

pub const PLAYER_COUNT: u64 = 237;
pub const FIRST_TOURNAMENT_ID: u64 = 1001;
pub const TOURNAMENT_COUNT: u64 = 30;
pub const DIRECTOR_COUNT: u64 = 12;

const LOCATIONS: [(&str, &str, &str); 4] = [
    ("Seattle", "WA", "US"),
    ("Portland", "OR", "US"),
    ("Los Angeles", "CA", "US"),
    ("Toronto", "ON", "CA"),
];

const FIRST_NAMES: [&str; 8] = [
    "Alex", "Bailey", "Casey", "Devon", "Emery", "Frankie", "Gray", "Harper",
];

const LAST_NAMES: [&str; 8] = [
    "Sharpe", "Elwin", "Gagne", "Slaughter", "Lyons", "Kiss", "Rodgers", "Zahler",
];

const EVENT_NAMES: [&str; 3] = ["Pinball Open", "Flipper Frenzy", "Tilt Classic"];

#[derive(Clone, Debug, Serialize)]
pub struct Player {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub stateprov: String,
    pub country_code: String,
    pub wppr_rank: u32,
    pub wppr_points: f64,
    pub events_played: u32,
}

/// Search rows carry only the summary fields.
#[derive(Clone, Debug, Serialize)]
pub struct PlayerRow {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub stateprov: String,
    pub country_code: String,
    pub wppr_rank: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Tournament {
    pub tournament_id: u64,
    pub tournament_name: String,
    pub city: String,
    pub stateprov: String,
    pub country_code: String,
    pub event_start_date: String,
    pub event_end_date: String,
    pub tournament_type: String,
    pub player_count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct TournamentResult {
    pub position: u32,
    pub player_id: u64,
    pub player_name: String,
    pub wppr_points: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Director {
    pub director_id: u64,
    pub name: String,
    pub city: String,
    pub stateprov: String,
    pub country_code: String,
    pub tournament_count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub player_id: u64,
    pub name: String,
    pub wppr_points: f64,
    pub country_code: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PvpRecord {
    pub player_id: u64,
    pub opponent_id: u64,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

fn location(index: u64) -> (&'static str, &'static str, &'static str) {
    LOCATIONS[(index % LOCATIONS.len() as u64) as usize]
}

pub fn player(id: u64) -> Option<Player> {
    if !(1..=PLAYER_COUNT).contains(&id) {
        return None;
    }
    let i = id - 1;
    let (city, stateprov, country) = location(i);
    Some(Player {
        player_id: id,
        first_name: FIRST_NAMES[(i % 8) as usize].to_string(),
        last_name: LAST_NAMES[((i / 8) % 8) as usize].to_string(),
        city: city.to_string(),
        stateprov: stateprov.to_string(),
        country_code: country.to_string(),
        wppr_rank: id as u32,
        wppr_points: 1000.0 - id as f64 * 3.5,
        events_played: (id % 40) as u32 + 1,
    })
}

pub fn players() -> Vec<Player> {
    (1..=PLAYER_COUNT).filter_map(player).collect()
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn row(&self) -> PlayerRow {
        PlayerRow {
            player_id: self.player_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            city: self.city.clone(),
            stateprov: self.stateprov.clone(),
            country_code: self.country_code.clone(),
            wppr_rank: self.wppr_rank,
        }
    }
}

pub fn tournament(id: u64) -> Option<Tournament> {
    let n = id.checked_sub(FIRST_TOURNAMENT_ID)?;
    if n >= TOURNAMENT_COUNT {
        return None;
    }
    let (city, stateprov, country) = location(n);
    let month = n / 3 + 1;
    let day = (n % 3) * 9 + 5;
    Some(Tournament {
        tournament_id: id,
        tournament_name: format!("{city} {} #{}", EVENT_NAMES[(n % 3) as usize], n + 1),
        city: city.to_string(),
        stateprov: stateprov.to_string(),
        country_code: country.to_string(),
        event_start_date: format!("2024-{month:02}-{day:02}"),
        event_end_date: format!("2024-{month:02}-{:02}", day + 1),
        tournament_type: if (n + 1) % 5 == 0 { "women" } else { "open" }.to_string(),
        player_count: 16 + ((n as u32 + 1) * 7) % 48,
    })
}

pub fn tournaments() -> Vec<Tournament> {
    (FIRST_TOURNAMENT_ID..FIRST_TOURNAMENT_ID + TOURNAMENT_COUNT)
        .filter_map(tournament)
        .collect()
}

/// Final standings. Player ids step by 7 modulo 237, so they never repeat
/// within one event.
pub fn tournament_results(id: u64) -> Option<Vec<TournamentResult>> {
    let event = tournament(id)?;
    let n = id - FIRST_TOURNAMENT_ID + 1;
    let size = event.player_count;
    Some(
        (1..=size)
            .filter_map(|position| {
                let player_id = (n * 13 + u64::from(position) * 7) % PLAYER_COUNT + 1;
                let entrant = player(player_id)?;
                Some(TournamentResult {
                    position,
                    player_id,
                    player_name: entrant.full_name(),
                    wppr_points: f64::from(size - position + 1) * 1.5,
                })
            })
            .collect(),
    )
}

pub fn directors() -> Vec<Director> {
    (1..=DIRECTOR_COUNT)
        .map(|id| {
            let i = id - 1;
            let (city, stateprov, country) = location(i);
            Director {
                director_id: id,
                name: format!(
                    "{} {}",
                    FIRST_NAMES[((i + 3) % 8) as usize],
                    LAST_NAMES[(i % 8) as usize]
                ),
                city: city.to_string(),
                stateprov: stateprov.to_string(),
                country_code: country.to_string(),
                tournament_count: id as u32 * 3,
            }
        })
        .collect()
}

/// Ranking table for `system`, or `None` for an unknown system.
pub fn rankings(system: &str) -> Option<Vec<RankingEntry>> {
    let include: fn(u64) -> bool = match system {
        "wppr" => |_| true,
        "women" => |id| id % 3 == 0,
        "youth" => |id| id % 5 == 0,
        "pro" => |id| id <= 64,
        _ => return None,
    };
    Some(
        players()
            .into_iter()
            .filter(|p| include(p.player_id))
            .enumerate()
            .map(|(i, p)| RankingEntry {
                rank: i as u32 + 1,
                player_id: p.player_id,
                name: p.full_name(),
                wppr_points: p.wppr_points,
                country_code: p.country_code,
            })
            .collect(),
    )
}

/// Head-to-head record, or `None` when the two players have never met.
pub fn pvp(player_id: u64, opponent_id: u64) -> Option<PvpRecord> {
    if player_id % 4 != opponent_id % 4 {
        return None;
    }
    Some(PvpRecord {
        player_id,
        opponent_id,
        wins: ((player_id * 7 + opponent_id) % 5) as u32,
        losses: ((opponent_id * 7 + player_id) % 5) as u32,
        ties: ((player_id + opponent_id) % 2) as u32,
    })
}
