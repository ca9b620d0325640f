//! Integration tests for the rate-limited request dispatcher
//!
//! A wiremock server stands in for the info endpoint so queue ordering and
//! the 429 retry path can be observed from the outside.

mod common;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{clearinghouse_state_json, test_hyperliquid_config};
use whale_watch::InfoClient;

const USER_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const USER_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const USER_C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

fn info_body(user: &str) -> Value {
    json!({"type": "clearinghouseState", "user": user})
}

async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}

#[test_log::test(tokio::test)]
async fn test_requests_resolve_in_enqueue_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clearinghouse_state_json(vec![], "0")),
        )
        .mount(&server)
        .await;

    let client = InfoClient::new(&test_hyperliquid_config(&server.uri())).expect("client");

    // join! polls in argument order, so the sends hit the queue as A, B, C
    let (a, b, c) = tokio::join!(
        client.user_state(USER_A),
        client.user_state(USER_B),
        client.user_state(USER_C),
    );
    assert!(a.is_some() && b.is_some() && c.is_some());

    let bodies = received_bodies(&server).await;
    assert_eq!(
        bodies,
        vec![info_body(USER_A), info_body(USER_B), info_body(USER_C)]
    );
}

#[test_log::test(tokio::test)]
async fn test_rate_limited_request_retries_ahead_of_queue() {
    let server = MockServer::start().await;

    // First call for user A is rejected; everything after succeeds
    Mock::given(method("POST"))
        .and(path("/info"))
        .and(body_json(info_body(USER_A)))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clearinghouse_state_json(vec![], "123")),
        )
        .mount(&server)
        .await;

    let client = InfoClient::new(&test_hyperliquid_config(&server.uri())).expect("client");

    let (a, b) = tokio::join!(client.user_state(USER_A), client.user_state(USER_B));

    // The rejected request still resolves with data, not None
    assert_eq!(a.expect("retried").margin_summary.account_value, "123");
    assert!(b.is_some());

    // A was replayed verbatim at the head of the queue, ahead of B
    let bodies = received_bodies(&server).await;
    assert_eq!(
        bodies,
        vec![info_body(USER_A), info_body(USER_A), info_body(USER_B)]
    );
}

#[test_log::test(tokio::test)]
async fn test_server_error_resolves_to_none_and_queue_moves_on() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .and(body_json(info_body(USER_A)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clearinghouse_state_json(vec![], "0")),
        )
        .mount(&server)
        .await;

    let client = InfoClient::new(&test_hyperliquid_config(&server.uri())).expect("client");

    let (a, b) = tokio::join!(client.user_state(USER_A), client.user_state(USER_B));
    assert!(a.is_none(), "server error should read as no data");
    assert!(b.is_some(), "later requests are unaffected");

    // No retry for non-429 failures
    let bodies = received_bodies(&server).await;
    assert_eq!(bodies, vec![info_body(USER_A), info_body(USER_B)]);
}

#[test_log::test(tokio::test)]
async fn test_malformed_response_resolves_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = InfoClient::new(&test_hyperliquid_config(&server.uri())).expect("client");
    assert!(client.user_state(USER_A).await.is_none());
}
