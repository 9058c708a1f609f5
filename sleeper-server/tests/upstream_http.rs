//! The Sleeper HTTP client against a local mock server.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sleeper_server::cache::CacheConfig;
use sleeper_server::facade::{CachedSleeperClient, RetryPolicy};
use sleeper_server::limiter::{RateLimitConfig, TokenBucket};
use sleeper_server::sleeper::{
    Endpoint, Freshness, SleeperClient, SleeperConfig, SleeperError, Upstream, UpstreamErrorKind,
};

fn client(server: &MockServer) -> SleeperClient {
    SleeperClient::new(SleeperConfig::new().with_base_url(server.url("/v1")).with_timeout(1))
        .expect("client should build")
}

fn cached(server: &MockServer) -> CachedSleeperClient<SleeperClient, TokenBucket> {
    CachedSleeperClient::new(
        client(server),
        TokenBucket::new(&RateLimitConfig::default()),
        &CacheConfig::default(),
        RetryPolicy::default(),
    )
}

fn user(identifier: &str) -> Endpoint {
    Endpoint::User {
        identifier: identifier.to_string(),
    }
}

#[tokio::test]
async fn ok_body_is_returned() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/user/coolguy123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"user_id": "12345", "username": "coolguy123"}));
        })
        .await;

    let response = client(&server).fetch(&user("coolguy123")).await.unwrap();

    assert_eq!(response.body["user_id"], "12345");
    assert_eq!(response.freshness, Freshness::default());
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn not_found_is_http_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/league/doesnotexist");
            then.status(404).body("not found");
        })
        .await;

    let err = client(&server)
        .fetch(&Endpoint::League {
            league_id: "doesnotexist".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, UpstreamErrorKind::HttpStatus(404));
    assert_eq!(err.body_snippet.as_deref(), Some("not found"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/nfl");
            then.status(503).body("maintenance");
        })
        .await;

    let err = client(&server).fetch(&Endpoint::NflState).await.unwrap_err();

    assert_eq!(err.kind, UpstreamErrorKind::HttpStatus(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn invalid_json_is_parse_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/nfl");
            then.status(200).body("<html>oops</html>");
        })
        .await;

    let err = client(&server).fetch(&Endpoint::NflState).await.unwrap_err();

    assert_eq!(err.kind, UpstreamErrorKind::ParseFailure);
    assert_eq!(err.body_snippet.as_deref(), Some("<html>oops</html>"));
}

#[tokio::test]
async fn null_body_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/user/nobody");
            then.status(200)
                .header("content-type", "application/json")
                .body("null");
        })
        .await;

    let err = client(&server).fetch(&user("nobody")).await.unwrap_err();

    assert_eq!(err.kind, UpstreamErrorKind::HttpStatus(404));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/nfl");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"week": 1}));
        })
        .await;

    let err = client(&server).fetch(&Endpoint::NflState).await.unwrap_err();

    assert_eq!(err.kind, UpstreamErrorKind::Timeout);
    assert!(err.is_transient());
}

#[tokio::test]
async fn cached_client_fetches_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/league/league1/rosters");
            then.status(200).json_body(json!([
                {"roster_id": 1, "league_id": "league1", "owner_id": "u1", "players": ["4046"], "reserve": null}
            ]));
        })
        .await;
    let cached = cached(&server);

    let first = cached.get_league_rosters("league1").await.unwrap();
    let second = cached.get_league_rosters("league1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].roster_id, "1");
    assert!(first[0].reserve.is_empty());
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cached_client_retries_server_errors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/nfl");
            then.status(500).body("boom");
        })
        .await;
    let retry = RetryPolicy {
        max_retries: 2,
        base_backoff: Duration::from_millis(10),
    };
    let cached = CachedSleeperClient::new(
        client(&server),
        TokenBucket::new(&RateLimitConfig::default()),
        &CacheConfig::default(),
        retry,
    );

    let err = cached.get_nfl_state().await.unwrap_err();

    assert_eq!(
        err.upstream().map(|e| e.kind),
        Some(UpstreamErrorKind::HttpStatus(500))
    );
    mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn dot_segment_league_id_is_rejected() {
    let server = MockServer::start_async().await;
    let other = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/rosters");
            then.status(200).json_body(json!([]));
        })
        .await;
    let cached = cached(&server);

    for id in ["..", "..\\rosters"] {
        let err = cached.get_league_rosters(id).await.unwrap_err();
        assert!(matches!(err, SleeperError::Validation(_)), "{id}: {err}");
    }

    other.assert_calls_async(0).await;
}

#[tokio::test]
async fn cache_control_is_read_from_headers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/nfl");
            then.status(200)
                .header("cache-control", "public, max-age=15")
                .json_body(json!({"week": 1}));
        })
        .await;

    let response = client(&server).fetch(&Endpoint::NflState).await.unwrap();

    assert_eq!(response.freshness.max_age, Some(Duration::from_secs(15)));
    assert!(!response.freshness.no_store);
}

#[tokio::test]
async fn no_store_responses_are_refetched() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/league/league1/users");
            then.status(200)
                .header("cache-control", "no-store")
                .json_body(json!([{"user_id": "1", "is_bot": null}]));
        })
        .await;
    let cached = cached(&server);

    cached.get_league_users("league1").await.unwrap();
    let users = cached.get_league_users("league1").await.unwrap();

    assert!(!users[0].is_bot);
    mock.assert_calls_async(2).await;
}
