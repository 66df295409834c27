//! Verify resolution and classification against JSON vectors in `test-vectors/`.
//!
//! `requests.json` describes query/lookup values and the exact request each
//! must resolve to; `errors.json` describes failed responses and the
//! classification each must produce. Classifications are compared as JSON so
//! the vector files stay readable.

use ifpa_core::classify::classify;
use ifpa_core::{
    ApiErrorKind, ClientConfig, HttpMethod, HttpRequest, HttpResponse, IfpaClient, Lookup, Query,
    RankingSystem, RequestContext, SortOrder, TournamentSort,
};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> IfpaClient {
    let config = ClientConfig::default()
        .with_api_key("test-key")
        .with_base_url(BASE_URL);
    IfpaClient::new(config).unwrap()
}

fn str_at(value: &Value, index: usize) -> &str {
    value[index].as_str().unwrap()
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| (str_at(pair, 0).to_string(), str_at(pair, 1).to_string()))
        .collect()
}

fn sort_key(name: &str) -> TournamentSort {
    match name {
        "start_date" => TournamentSort::StartDate,
        "name" => TournamentSort::Name,
        "player_count" => TournamentSort::PlayerCount,
        other => panic!("unknown sort key: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn players(filters: &[Value]) -> Query<ifpa_core::Players> {
    filters.iter().fold(Query::players(), |q, f| {
        let value = str_at(f, 1);
        match str_at(f, 0) {
            "name" => q.name(value),
            "country" => q.country(value),
            "state" => q.state(value),
            "city" => q.city(value),
            "tournament" => q.tournament(value),
            "tournament_position" => q.tournament_position(value.parse().unwrap()),
            "limit" => q.limit(value.parse().unwrap()),
            "offset" => q.offset(value.parse().unwrap()),
            other => panic!("unknown player filter: {other}"),
        }
    })
}

fn tournaments(filters: &[Value]) -> Query<ifpa_core::Tournaments> {
    filters.iter().fold(Query::tournaments(), |q, f| {
        let value = str_at(f, 1);
        match str_at(f, 0) {
            "name" => q.name(value),
            "city" => q.city(value),
            "tournament_type" => q.tournament_type(value),
            "date_range" => q.date_range(value, str_at(f, 2)),
            "sort_asc" => q.sort_by(sort_key(value), SortOrder::Asc),
            "sort_desc" => q.sort_by(sort_key(value), SortOrder::Desc),
            "limit" => q.limit(value.parse().unwrap()),
            "offset" => q.offset(value.parse().unwrap()),
            other => panic!("unknown tournament filter: {other}"),
        }
    })
}

fn directors(filters: &[Value]) -> Query<ifpa_core::Directors> {
    filters.iter().fold(Query::directors(), |q, f| {
        let value = str_at(f, 1);
        match str_at(f, 0) {
            "name" => q.name(value),
            "country" => q.country(value),
            other => panic!("unknown director filter: {other}"),
        }
    })
}

fn rankings(system: RankingSystem, filters: &[Value]) -> Query<ifpa_core::Rankings> {
    filters.iter().fold(Query::rankings(system), |q, f| {
        let value = str_at(f, 1);
        match str_at(f, 0) {
            "country" => q.country(value),
            "limit" => q.limit(value.parse().unwrap()),
            "offset" => q.offset(value.parse().unwrap()),
            other => panic!("unknown rankings filter: {other}"),
        }
    })
}

fn resolve_case(c: &IfpaClient, case: &Value) -> HttpRequest {
    if let Some(lookup) = case["lookup"].as_str() {
        let ids: Vec<u64> = case["ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|id| id.as_u64().unwrap())
            .collect();
        return match lookup {
            "player" => c.resolve_lookup(&Lookup::player(ids[0])),
            "player_vs_player" => c.resolve_lookup(&Lookup::player_vs_player(ids[0], ids[1])),
            "tournament" => c.resolve_lookup(&Lookup::tournament(ids[0])),
            "tournament_results" => c.resolve_lookup(&Lookup::tournament_results(ids[0])),
            other => panic!("unknown lookup: {other}"),
        };
    }

    let filters = case["filters"].as_array().unwrap();
    match case["resource"].as_str().unwrap() {
        "players" => c.resolve(&players(filters)),
        "tournaments" => c.resolve(&tournaments(filters)),
        "directors" => c.resolve(&directors(filters)),
        "rankings/wppr" => c.resolve(&rankings(RankingSystem::Wppr, filters)),
        "rankings/women" => c.resolve(&rankings(RankingSystem::Women, filters)),
        "rankings/youth" => c.resolve(&rankings(RankingSystem::Youth, filters)),
        "rankings/pro" => c.resolve(&rankings(RankingSystem::Pro, filters)),
        other => panic!("unknown resource: {other}"),
    }
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];

        let req = resolve_case(&c, case);
        assert_eq!(req.method, HttpMethod::Get, "{name}: method");
        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");
        assert_eq!(req.header("X-API-Key"), Some("test-key"), "{name}: api key");
        assert_eq!(req.header("Accept"), Some("application/json"), "{name}: accept");
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn kind_json(kind: &ApiErrorKind) -> Value {
    match kind {
        ApiErrorKind::Generic => json!({ "kind": "generic" }),
        ApiErrorKind::PlayersNeverMet {
            player_id,
            opponent_id,
        } => json!({
            "kind": "players_never_met",
            "player_id": player_id,
            "opponent_id": opponent_id,
        }),
        ApiErrorKind::NotFound { resource, id } => json!({
            "kind": "not_found",
            "resource": resource,
            "id": id,
        }),
        ApiErrorKind::Unauthorized { message } => json!({
            "kind": "unauthorized",
            "message": message,
        }),
        ApiErrorKind::RateLimited { retry_after } => json!({
            "kind": "rate_limited",
            "retry_after": retry_after,
        }),
    }
}

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let path = case["path"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap();

        let response = HttpResponse {
            status,
            headers: pairs(&case["headers"]),
            body: body.to_string(),
        };
        let context = RequestContext {
            request_id: Uuid::nil(),
            method: HttpMethod::Get,
            url: format!("{BASE_URL}{path}"),
            path: path.to_string(),
            query: Vec::new(),
        };

        let err = classify(response, context.clone());
        assert_eq!(kind_json(&err.kind), case["expected_kind"], "{name}: kind");
        assert_eq!(err.status, status, "{name}: status");
        assert_eq!(err.body, body, "{name}: body");
        assert_eq!(err.context, context, "{name}: context");
    }
}
