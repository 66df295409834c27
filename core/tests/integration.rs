//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the production
//! `HttpTransport` over real HTTP: blocking calls through ureq, async calls
//! through reqwest. Fixture numbers (237 players, 59 in Oregon, ...) come
//! from the mock server's deterministic tables.

use std::net::SocketAddr;

use futures_util::StreamExt;
use ifpa_core::{
    ApiErrorKind, ClientConfig, Error, IfpaClient, Lookup, Query, RankingSystem, SortOrder,
    TournamentSort,
};

/// Start the mock server on its own thread and runtime.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client_with_key(addr: SocketAddr, key: &str) -> IfpaClient {
    let config = ClientConfig::default()
        .with_api_key(key)
        .with_base_url(format!("http://{addr}"));
    IfpaClient::new(config).unwrap()
}

fn client(addr: SocketAddr) -> IfpaClient {
    client_with_key(addr, mock_server::API_KEY)
}

#[test]
fn blocking_round_trips() {
    let client = client(start_server());

    // Filtered page.
    let oregon = client
        .get(&Query::players().country("US").state("OR").limit(25))
        .unwrap();
    assert_eq!(oregon.len(), 25);
    assert!(oregon.iter().all(|p| p.stateprov.as_deref() == Some("OR")));

    // Full iteration across three pages.
    let all: Vec<_> = client
        .iterate(&Query::players(), 100)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(all.len(), 237);
    assert_eq!(all[0].player_id, 1);
    assert_eq!(all[236].player_id, 237);

    // Bounded collection.
    let canadians = client.get_all(&Query::players().country("CA"), 100).unwrap();
    assert_eq!(canadians.len(), 59);
    let err = client.get_all(&Query::players(), 200).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded { max_results: 200, .. }));

    // first / first_or_none.
    let alex = client.first(&Query::players().name("Alex")).unwrap();
    assert_eq!(alex.player_id, 1);
    assert!(client
        .first_or_none(&Query::players().name("Nobody"))
        .unwrap()
        .is_none());

    // Lookups.
    let player = client.fetch(&Lookup::player(7)).unwrap();
    assert_eq!(player.wppr_rank, Some(7));
    assert!(client.fetch_or_none(&Lookup::player(999)).unwrap().is_none());

    let record = client.fetch(&Lookup::player_vs_player(1, 5)).unwrap();
    assert_eq!((record.player_id, record.opponent_id), (1, 5));

    let err = client.fetch(&Lookup::player_vs_player(1, 2)).unwrap_err();
    assert_eq!(
        err.api_kind(),
        Some(&ApiErrorKind::PlayersNeverMet {
            player_id: 1,
            opponent_id: 2
        })
    );

    let results = client.fetch(&Lookup::tournament_results(1001)).unwrap();
    assert_eq!(results.tournament_id, 1001);
    assert_eq!(results.results.len(), 23);

    client.close();
}

#[test]
fn blocking_tournament_filters_and_quirks() {
    let client = client(start_server());

    let march = client
        .get(&Query::tournaments().date_range("2024-03-01", "2024-03-31"))
        .unwrap();
    let ids: Vec<_> = march.iter().map(|t| t.tournament_id).collect();
    assert_eq!(ids, vec![1007, 1008, 1009]);

    let biggest = client
        .get(
            &Query::tournaments()
                .sort_by(TournamentSort::PlayerCount, SortOrder::Desc)
                .limit(5),
        )
        .unwrap();
    assert_eq!(biggest.len(), 5);
    assert!(biggest
        .windows(2)
        .all(|w| w[0].player_count >= w[1].player_count));

    // Substring matching on stateprov leaks Ontario into an "O" search.
    let leaky: Vec<_> = client
        .iterate(&Query::players().state("O"), 100)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(leaky.len(), 118);
    assert!(leaky.iter().any(|p| p.stateprov.as_deref() == Some("ON")));

    // Director search ignores paging; iteration still ends after one page.
    let directors: Vec<_> = client
        .iterate(&Query::directors(), 5)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(directors.len(), 12);
}

#[test]
fn wrong_key_is_unauthorized() {
    let client = client_with_key(start_server(), "not-the-key");
    let err = client.fetch(&Lookup::player(1)).unwrap_err();
    assert_eq!(
        err.api_kind(),
        Some(&ApiErrorKind::Unauthorized {
            message: "Invalid API key".to_string()
        })
    );
}

#[test]
fn validation_failures_never_hit_the_server() {
    let client = client(start_server());
    let err = client
        .get(&Query::tournaments().start_date("March 1st"))
        .unwrap_err();
    let Error::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(validation.violations.len(), 2);
}

#[tokio::test]
async fn async_round_trips() {
    let client = client(start_server());

    let women = client
        .get_async(&Query::rankings(RankingSystem::Women).limit(10))
        .await
        .unwrap();
    assert_eq!(women.len(), 10);
    assert_eq!(women[0].player_id, 3);

    let streamed: Vec<_> = client
        .stream(&Query::players().country("US"), 100)
        .map(|p| p.unwrap().player_id)
        .collect()
        .await;
    assert_eq!(streamed.len(), 178);

    let all = client
        .get_all_async(&Query::rankings(RankingSystem::Pro), 100)
        .await
        .unwrap();
    assert_eq!(all.len(), 64);

    let first = client
        .first_async(&Query::tournaments().tournament_type("women"))
        .await
        .unwrap();
    assert_eq!(first.tournament_id, 1005);
    assert!(client
        .first_or_none_async(&Query::directors().name("Nobody"))
        .await
        .unwrap()
        .is_none());

    let tournament = client.fetch_async(&Lookup::tournament(1010)).await.unwrap();
    assert_eq!(tournament.event_start_date.as_deref(), Some("2024-04-05"));
    assert!(client
        .fetch_or_none_async(&Lookup::tournament(5))
        .await
        .unwrap()
        .is_none());

    let err = client
        .fetch_async(&Lookup::player_vs_player(2, 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err.api_kind(),
        Some(ApiErrorKind::PlayersNeverMet { .. })
    ));
}

#[tokio::test]
async fn sync_and_async_agree_over_http() {
    let addr = start_server();
    let q = Query::players().country("US").state("WA").limit(30);

    let async_client = client(addr);
    let awaited = async_client.get_async(&q).await.unwrap();

    let blocking_q = q.clone();
    let blocking = tokio::task::spawn_blocking(move || client(addr).get(&blocking_q))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(awaited, blocking);
    assert_eq!(awaited.len(), 30);
}
