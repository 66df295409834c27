//! In-memory stand-in for the IFPA API.
//!
//! # Design
//! Read-only axum router over the deterministic tables in [`fixtures`].
//! Every route requires the `X-API-Key` header. The upstream quirks the
//! client has to live with are reproduced on purpose:
//! - `stateprov` is a case-insensitive substring match, so `O` matches both
//!   `OR` and `ON`.
//! - `/director/search` ignores `start_pos` and `count` and always returns
//!   every match.

pub mod fixtures;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::debug;

use crate::fixtures::{Director, Player, PlayerRow, PvpRecord, RankingEntry, Tournament};

/// Key accepted by [`app`].
pub const API_KEY: &str = "test-api-key";

/// Page size when a request sends no `count`.
pub const DEFAULT_COUNT: usize = 50;

/// Largest `count` the server accepts.
pub const MAX_COUNT: usize = 250;

#[derive(Clone)]
struct AppState {
    api_key: Arc<str>,
}

type Params = HashMap<String, String>;

/// Error reply in the upstream shape: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Serialize)]
pub struct PlayerSearch {
    pub search: Vec<PlayerRow>,
    pub total_results: usize,
}

#[derive(Serialize)]
pub struct TournamentSearch {
    pub tournaments: Vec<Tournament>,
    pub total_results: usize,
}

#[derive(Serialize)]
pub struct DirectorSearch {
    pub directors: Vec<Director>,
}

#[derive(Serialize)]
pub struct RankingTable {
    pub rankings: Vec<RankingEntry>,
}

#[derive(Serialize)]
pub struct Results {
    pub tournament_id: u64,
    pub results: Vec<fixtures::TournamentResult>,
}

pub fn app() -> Router {
    app_with_key(API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
    };
    Router::new()
        .route("/player/search", get(search_players))
        .route("/player/{id}", get(get_player))
        .route("/player/{id}/pvp/{opponent_id}", get(get_pvp))
        .route("/tournament/search", get(search_tournaments))
        .route("/tournament/{id}", get(get_tournament))
        .route("/tournament/{id}/results", get(get_tournament_results))
        .route("/director/search", get(search_directors))
        .route("/rankings/{system}", get(get_rankings))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if supplied != Some(&*state.api_key) {
        debug!(path = %request.uri().path(), "rejecting request without a valid API key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API key" })),
        )
            .into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn text<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn number(params: &Params, key: &str) -> Result<Option<usize>, ApiFailure> {
    match text(params, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiFailure::bad_request(format!("{key} must be a non-negative integer"))),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Shared location filters. `stateprov` is a substring match, like upstream.
fn location_matches(params: &Params, city: &str, stateprov: &str, country: &str) -> bool {
    text(params, "city").map_or(true, |c| city.eq_ignore_ascii_case(c))
        && text(params, "stateprov").map_or(true, |s| contains_ci(stateprov, s))
        && text(params, "country").map_or(true, |c| country.eq_ignore_ascii_case(c))
}

/// Apply `start_pos`/`count`, returning the page and the unpaged total.
fn paginate<T>(items: Vec<T>, params: &Params) -> Result<(Vec<T>, usize), ApiFailure> {
    let start = number(params, "start_pos")?.unwrap_or(0);
    let count = number(params, "count")?.unwrap_or(DEFAULT_COUNT);
    if count == 0 || count > MAX_COUNT {
        return Err(ApiFailure::bad_request(format!(
            "count must be between 1 and {MAX_COUNT}"
        )));
    }
    let total = items.len();
    let page = items.into_iter().skip(start).take(count).collect();
    Ok((page, total))
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

async fn search_players(Query(params): Query<Params>) -> Result<Json<PlayerSearch>, ApiFailure> {
    let position = number(&params, "tourpos")?;
    let event = text(&params, "tournament");
    if position.is_some() && event.is_none() {
        return Err(ApiFailure::bad_request("tourpos requires tournament"));
    }
    let finishers: Option<Vec<(u64, u32)>> = event.map(|name| {
        fixtures::tournaments()
            .iter()
            .filter(|t| contains_ci(&t.tournament_name, name))
            .filter_map(|t| fixtures::tournament_results(t.tournament_id))
            .flatten()
            .map(|r| (r.player_id, r.position))
            .collect()
    });

    let matches: Vec<PlayerRow> = fixtures::players()
        .into_iter()
        .filter(|p| text(&params, "name").map_or(true, |n| contains_ci(&p.full_name(), n)))
        .filter(|p| location_matches(&params, &p.city, &p.stateprov, &p.country_code))
        .filter(|p| match &finishers {
            None => true,
            Some(rows) => rows.iter().any(|(id, pos)| {
                *id == p.player_id && position.map_or(true, |want| want == *pos as usize)
            }),
        })
        .map(|p| p.row())
        .collect();

    let (search, total_results) = paginate(matches, &params)?;
    Ok(Json(PlayerSearch {
        search,
        total_results,
    }))
}

async fn get_player(Path(id): Path<u64>) -> Result<Json<Player>, ApiFailure> {
    fixtures::player(id)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Player not found"))
}

async fn get_pvp(
    Path((id, opponent_id)): Path<(u64, u64)>,
) -> Result<Json<PvpRecord>, ApiFailure> {
    if id == opponent_id {
        return Err(ApiFailure::bad_request("A player cannot be compared with themselves"));
    }
    if fixtures::player(id).is_none() || fixtures::player(opponent_id).is_none() {
        return Err(ApiFailure::not_found("Player not found"));
    }
    fixtures::pvp(id, opponent_id)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Players have never met"))
}

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

fn sort_tournaments(items: &mut [Tournament], spec: &str) -> Result<(), ApiFailure> {
    // Stable sorts applied last key first give lexicographic ordering.
    for directive in spec.split(',').rev() {
        let (key, descending) = match directive.strip_prefix('-') {
            Some(key) => (key, true),
            None => (directive, false),
        };
        let compare: fn(&Tournament, &Tournament) -> Ordering = match key {
            "event_start_date" => |a, b| a.event_start_date.cmp(&b.event_start_date),
            "tournament_name" => |a, b| a.tournament_name.cmp(&b.tournament_name),
            "player_count" => |a, b| a.player_count.cmp(&b.player_count),
            other => return Err(ApiFailure::bad_request(format!("unknown sort key {other}"))),
        };
        if descending {
            items.sort_by(|a, b| compare(b, a));
        } else {
            items.sort_by(compare);
        }
    }
    Ok(())
}

async fn search_tournaments(
    Query(params): Query<Params>,
) -> Result<Json<TournamentSearch>, ApiFailure> {
    let start = text(&params, "start_date");
    let end = text(&params, "end_date");
    if start.is_some() != end.is_some() {
        return Err(ApiFailure::bad_request(
            "start_date and end_date must be sent together",
        ));
    }

    let mut matches: Vec<Tournament> = fixtures::tournaments()
        .into_iter()
        .filter(|t| text(&params, "name").map_or(true, |n| contains_ci(&t.tournament_name, n)))
        .filter(|t| location_matches(&params, &t.city, &t.stateprov, &t.country_code))
        .filter(|t| {
            text(&params, "tournament_type").map_or(true, |k| t.tournament_type.eq_ignore_ascii_case(k))
        })
        .filter(|t| match (start, end) {
            (Some(start), Some(end)) => {
                t.event_start_date.as_str() >= start && t.event_start_date.as_str() <= end
            }
            _ => true,
        })
        .collect();

    if let Some(spec) = text(&params, "sort") {
        sort_tournaments(&mut matches, spec)?;
    }

    let (tournaments, total_results) = paginate(matches, &params)?;
    Ok(Json(TournamentSearch {
        tournaments,
        total_results,
    }))
}

async fn get_tournament(Path(id): Path<u64>) -> Result<Json<Tournament>, ApiFailure> {
    fixtures::tournament(id)
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Tournament not found"))
}

async fn get_tournament_results(Path(id): Path<u64>) -> Result<Json<Results>, ApiFailure> {
    fixtures::tournament_results(id)
        .map(|results| {
            Json(Results {
                tournament_id: id,
                results,
            })
        })
        .ok_or_else(|| ApiFailure::not_found("Tournament not found"))
}

// ---------------------------------------------------------------------------
// Directors and rankings
// ---------------------------------------------------------------------------

/// Paging parameters are accepted and ignored.
async fn search_directors(Query(params): Query<Params>) -> Json<DirectorSearch> {
    let directors = fixtures::directors()
        .into_iter()
        .filter(|d| text(&params, "name").map_or(true, |n| contains_ci(&d.name, n)))
        .filter(|d| location_matches(&params, &d.city, &d.stateprov, &d.country_code))
        .collect();
    Json(DirectorSearch { directors })
}

async fn get_rankings(
    Path(system): Path<String>,
    Query(params): Query<Params>,
) -> Result<Json<RankingTable>, ApiFailure> {
    let table = fixtures::rankings(&system)
        .ok_or_else(|| ApiFailure::not_found("Ranking system not found"))?;
    let filtered: Vec<RankingEntry> = table
        .into_iter()
        .filter(|r| text(&params, "country").map_or(true, |c| r.country_code.eq_ignore_ascii_case(c)))
        .collect();
    let (rankings, _) = paginate(filtered, &params)?;
    Ok(Json(RankingTable { rankings }))
}
