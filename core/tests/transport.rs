//! `HttpTransport` against a wiremock server.
//!
//! Every mock is mounted with `expect(1)`: wiremock verifies the count when
//! the server drops, which is how "no automatic retry" is asserted.
//! Blocking calls run on `spawn_blocking` so they never stall the runtime
//! serving the mock.

use std::time::Duration;

use ifpa_core::{
    ApiErrorKind, ClientConfig, Error, IfpaClient, Lookup, Query, TransportError,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::default()
        .with_api_key("secret")
        .with_base_url(server.uri())
}

fn client(config: ClientConfig) -> IfpaClient {
    IfpaClient::new(config).unwrap()
}

fn player_body() -> serde_json::Value {
    json!({ "player_id": 7, "first_name": "Ada", "last_name": "Flip", "wppr_rank": 7 })
}

#[tokio::test(flavor = "multi_thread")]
async fn sends_key_accept_and_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/player/search"))
        .and(header("X-API-Key", "secret"))
        .and(header("Accept", "application/json"))
        .and(query_param("country", "US"))
        .and(query_param("stateprov", "OR"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "search": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let c = client(config(&server));
    let q = Query::players().country("US").state("OR").limit(5);
    assert!(c.get_async(&q).await.unwrap().is_empty());

    let found = tokio::task::spawn_blocking(move || c.get(&q)).await.unwrap();
    assert!(found.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_timeout_is_a_transport_failure_without_retry() {
    let server = MockServer::start().await;
    Mock::given(path("/player/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(player_body())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let c = client(config(&server).with_timeout(Duration::from_millis(100)));
    let err = c.fetch_async(&Lookup::player(7)).await.unwrap_err();
    match err {
        Error::Transport(TransportError::Timeout { timeout, url }) => {
            assert_eq!(timeout, Duration::from_millis(100));
            assert!(url.ends_with("/player/7"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_timeout_is_a_transport_failure_without_retry() {
    let server = MockServer::start().await;
    Mock::given(path("/player/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(player_body())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let c = client(config(&server).with_timeout(Duration::from_millis(100)));
    let err = tokio::task::spawn_blocking(move || c.fetch(&Lookup::player(7)))
        .await
        .unwrap()
        .unwrap_err();
    assert!(
        matches!(err, Error::Transport(ref t) if t.is_timeout()),
        "{err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_bodies_are_rejected_in_both_modes() {
    let server = MockServer::start().await;
    Mock::given(path("/player/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .expect(2)
        .mount(&server)
        .await;

    let c = client(config(&server).with_max_body_bytes(1024));
    let err = c.fetch_async(&Lookup::player(7)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::BodyTooLarge { limit: 1024, .. })
    ));

    let err = tokio::task::spawn_blocking(move || c.fetch(&Lookup::player(7)))
        .await
        .unwrap()
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Transport(TransportError::BodyTooLarge { limit: 1024, .. })
        ),
        "{err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_is_reported_once_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(path("/rankings/wppr"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .set_body_string("slow down"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let c = client(config(&server));
    let err = c
        .get_async(&Query::rankings(ifpa_core::RankingSystem::Wppr))
        .await
        .unwrap_err();
    assert_eq!(
        err.api_kind(),
        Some(&ApiErrorKind::RateLimited {
            retry_after: Some(7)
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_keeps_status_body_and_context() {
    let server = MockServer::start().await;
    Mock::given(path("/tournament/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(config(&server));
    let err = c
        .get_async(&Query::tournaments().name("Pinburgh"))
        .await
        .unwrap_err();
    let Error::Api(api) = err else {
        panic!("expected an API error");
    };
    assert_eq!(api.status, 503);
    assert_eq!(api.body, "maintenance");
    assert_eq!(api.kind, ApiErrorKind::Generic);
    assert_eq!(
        api.context.query,
        vec![("name".to_string(), "Pinburgh".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn non_utf8_error_body_is_an_api_error_in_both_modes() {
    let server = MockServer::start().await;
    Mock::given(path("/player/7"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![0xff, 0xfe, b'x']))
        .expect(2)
        .mount(&server)
        .await;

    let c = client(config(&server));
    let awaited = c.fetch_async(&Lookup::player(7)).await.unwrap_err();
    let blocking = tokio::task::spawn_blocking(move || c.fetch(&Lookup::player(7)))
        .await
        .unwrap()
        .unwrap_err();

    for err in [awaited, blocking] {
        let Error::Api(api) = err else {
            panic!("expected an API error, got {err:?}");
        };
        assert_eq!(api.status, 500);
        assert_eq!(api.kind, ApiErrorKind::Generic);
        assert!(api.body.ends_with('x'));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_success_body_is_a_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(path("/player/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(config(&server));
    let err = c.fetch_async(&Lookup::player(7)).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_refused_is_a_transport_failure() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let c = client(
        ClientConfig::default()
            .with_api_key("secret")
            .with_base_url(format!("http://127.0.0.1:{port}")),
    );
    let err = c.fetch_async(&Lookup::player(1)).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
    c.close();
}
