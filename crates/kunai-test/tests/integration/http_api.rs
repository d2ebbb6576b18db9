#![allow(clippy::unused_async, clippy::unwrap_used)]
//! Tests for the HTTP surface served by the binary.

use kunai_test::component::config::ExchangeProtocol;
use kunai_test::component::constants::{ADMIN_ROUTE_PREFIX, FB_ROUTE_PREFIX, PEER_ROUTE_PATH};
use kunai_test::component::types::AuthScheme;
use kunai_test::rfc::rfc::peer::{PeerPrincipal, PeerRequest, PeerResponse};
use salvo::http::StatusCode;
use salvo::test::{ResponseExt, TestClient};
use wiremock::MockServer;

use super::helpers::*;

const BASE: &str = "http://127.0.0.1:5800";

fn window_query(principal: &str) -> String {
    format!(
        "u={principal}&s={}&e={}",
        t(5, 0, 0).timestamp_millis(),
        t(6, 0, 0).timestamp_millis()
    )
}

/// ## Summary
/// The healthcheck answers through the full router.
#[test_log::test(tokio::test)]
async fn healthcheck_is_ok() {
    let env = TestEnv::new();
    let service = service(env.state().await);

    let mut response = TestClient::get(format!("{BASE}/api/app/healthcheck"))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));
    assert_eq!(response.take_string().await.unwrap(), "OK");
}

/// ## Summary
/// A local principal's free/busy is published as iCalendar.
#[test_log::test(tokio::test)]
async fn ics_renders_local_freebusy() {
    let env = TestEnv::new();
    env.seed_alice();
    let service = service(env.state().await);

    let mut response = TestClient::get(format!(
        "{BASE}{FB_ROUTE_PREFIX}/ics?{}",
        window_query("alice@corp.example")
    ))
    .send(&service)
    .await;

    assert_eq!(response.status_code, Some(StatusCode::OK));
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/calendar"), "{content_type}");

    let body = response.take_string().await.unwrap();
    assert!(body.contains("METHOD:PUBLISH"), "{body}");
    assert!(
        body.contains("FREEBUSY;FBTYPE=BUSY:20240305T090000Z/20240305T100000Z"),
        "{body}"
    );
    assert!(
        body.contains("FREEBUSY;FBTYPE=BUSY-TENTATIVE:20240305T130000Z/20240305T140000Z"),
        "{body}"
    );
}

/// ## Summary
/// Missing or inverted window parameters are rejected.
#[test_log::test(tokio::test)]
async fn ics_rejects_bad_parameters() {
    let env = TestEnv::new();
    let service = service(env.state().await);

    let response = TestClient::get(format!("{BASE}{FB_ROUTE_PREFIX}/ics?u=alice@corp.example"))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::BAD_REQUEST));

    let response = TestClient::get(format!(
        "{BASE}{FB_ROUTE_PREFIX}/ics?u=alice@corp.example&s={}&e={}",
        t(6, 0, 0).timestamp_millis(),
        t(5, 0, 0).timestamp_millis()
    ))
    .send(&service)
    .await;
    assert_eq!(response.status_code, Some(StatusCode::BAD_REQUEST));
}

/// ## Summary
/// Working hours come back as BUSY-UNAVAILABLE outside office hours.
#[test_log::test(tokio::test)]
async fn working_hours_of_local_principal() {
    let env = TestEnv::new();
    let service = service(env.state().await);

    let mut response = TestClient::get(format!(
        "{BASE}{FB_ROUTE_PREFIX}/workinghours?{}",
        window_query("alice@corp.example")
    ))
    .send(&service)
    .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));

    let body = response.take_string().await.unwrap();
    assert!(
        body.contains("FREEBUSY;FBTYPE=BUSY-UNAVAILABLE:20240305T000000Z/20240305T090000Z"),
        "{body}"
    );
    assert!(
        body.contains("FREEBUSY;FBTYPE=BUSY-UNAVAILABLE:20240305T170000Z/20240306T000000Z"),
        "{body}"
    );
}

/// ## Summary
/// The peer endpoint answers only for principals hosted on this node and
/// keeps the request order.
#[test_log::test(tokio::test)]
async fn peer_endpoint_answers_locally() {
    let env = TestEnv::new();
    env.seed_alice();
    let service = service(env.state().await);

    let request = PeerRequest::new(
        t(5, 0, 0),
        t(6, 0, 0),
        vec![
            PeerPrincipal {
                name: "bob@corp.example".to_string(),
                exclude_uid: None,
            },
            PeerPrincipal {
                name: "alice@corp.example".to_string(),
                exclude_uid: Some("lunch-talk".to_string()),
            },
        ],
    );
    let mut response = TestClient::post(format!("{BASE}{PEER_ROUTE_PATH}"))
        .json(&request)
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));

    let answer: PeerResponse = response.take_json().await.unwrap();
    let ids: Vec<&str> = answer.users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["bob@corp.example", "alice@corp.example"]);

    assert!(answer.users[0].intervals.iter().all(|i| i.status == "N"));
    let alice: Vec<&str> = answer.users[1]
        .intervals
        .iter()
        .map(|i| i.status.as_str())
        .collect();
    assert_eq!(alice, ["F", "B", "F"]);
    assert_eq!(answer.users[1].intervals[1].start_ms, t(5, 9, 0).timestamp_millis());
}

/// ## Summary
/// A change notification queues the account and the admin queue endpoint
/// shows it waiting.
#[test_log::test(tokio::test)]
async fn change_hook_fills_queue() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    let service = service(env.state().await);

    let mut response = TestClient::post(format!("{BASE}{FB_ROUTE_PREFIX}/changed"))
        .json(&serde_json::json!({"account_id": "alice", "item_types": ["appointment"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));
    let body: serde_json::Value = response.take_json().await.unwrap();
    assert_eq!(body["queued"], 1);

    let mut response = TestClient::get(format!("{BASE}{ADMIN_ROUTE_PREFIX}/queue/{EXCHANGE}"))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));
    let body: serde_json::Value = response.take_json().await.unwrap();
    assert_eq!(body["pending"], serde_json::json!(["alice"]));

    let response = TestClient::post(format!("{BASE}{FB_ROUTE_PREFIX}/changed"))
        .json(&serde_json::json!({"account_id": "alice", "item_types": ["unknown"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::BAD_REQUEST));
}

/// ## Summary
/// Explicit pushes are queued once per account, and unknown providers are
/// reported as such.
#[test_log::test(tokio::test)]
async fn admin_push_queues_accounts() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    let service = service(env.state().await);

    let mut response = TestClient::post(format!("{BASE}{ADMIN_ROUTE_PREFIX}/push"))
        .json(&serde_json::json!({"provider": EXCHANGE, "accounts": ["alice", "erin", "alice"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));
    let body: serde_json::Value = response.take_json().await.unwrap();
    assert_eq!(body["added"], 2);

    let response = TestClient::post(format!("{BASE}{ADMIN_ROUTE_PREFIX}/push"))
        .json(&serde_json::json!({"provider": "nope", "accounts": ["alice"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::NOT_FOUND));

    let response = TestClient::get(format!("{BASE}{ADMIN_ROUTE_PREFIX}/queue/nope"))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::NOT_FOUND));
}

/// ## Summary
/// Account ids that cannot be stored as one queue line are refused by both
/// the change hook and explicit push, and leave the queue untouched.
#[test_log::test(tokio::test)]
async fn malformed_account_ids_are_rejected() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    let service = service(env.state().await);

    let response = TestClient::post(format!("{BASE}{FB_ROUTE_PREFIX}/changed"))
        .json(&serde_json::json!({"account_id": "alice", "item_types": ["appointment"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::OK));

    for account in ["evil\nid", " alice", ""] {
        let response = TestClient::post(format!("{BASE}{FB_ROUTE_PREFIX}/changed"))
            .json(&serde_json::json!({"account_id": account, "item_types": ["appointment"]}))
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::BAD_REQUEST), "{account:?}");
    }

    let response = TestClient::post(format!("{BASE}{ADMIN_ROUTE_PREFIX}/push"))
        .json(&serde_json::json!({"provider": EXCHANGE, "accounts": ["erin", "evil\rid"]}))
        .send(&service)
        .await;
    assert_eq!(response.status_code, Some(StatusCode::BAD_REQUEST));

    let mut response = TestClient::get(format!("{BASE}{ADMIN_ROUTE_PREFIX}/queue/{EXCHANGE}"))
        .send(&service)
        .await;
    let body: serde_json::Value = response.take_json().await.unwrap();
    assert_eq!(body["pending"], serde_json::json!(["alice"]));
}
