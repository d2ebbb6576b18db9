#![allow(clippy::unused_async, clippy::unwrap_used)]
//! Tests for the query fan-out across local, peer, and unknown principals.

use kunai_test::component::constants::PEER_ROUTE_PATH;
use kunai_test::component::model::{FbStatus, FreeBusyRequest};
use kunai_test::component::query::FreeBusyQuery;
use kunai_test::rfc::rfc::peer::{PeerInterval, PeerResponse, PeerUser};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::*;

fn bob_busy_at_eleven() -> PeerResponse {
    PeerResponse {
        users: vec![PeerUser {
            id: "bob@corp.example".to_string(),
            intervals: vec![PeerInterval {
                status: "B".to_string(),
                start_ms: t(5, 11, 0).timestamp_millis(),
                end_ms: t(5, 12, 0).timestamp_millis(),
            }],
        }],
    }
}

fn request(principal: &str) -> FreeBusyRequest {
    FreeBusyRequest::new(principal, t(5, 0, 0), t(6, 0, 0)).unwrap()
}

/// ## Summary
/// Exactly the principal nobody claims comes back as NODATA.
#[test_log::test(tokio::test)]
async fn unroutable_principal_is_the_only_nodata() {
    let peer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PEER_ROUTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(bob_busy_at_eleven()))
        .expect(1)
        .mount(&peer)
        .await;

    let env = TestEnv::new().with_peer(&peer.uri());
    env.seed_alice();

    let mut query = FreeBusyQuery::new(env.registry());
    for principal in [
        "alice@corp.example",
        "erin@corp.example",
        "bob@corp.example",
        "zed@elsewhere.example",
    ] {
        query.add(request(principal));
    }
    let results = query.execute().await.unwrap();

    assert_eq!(results.len(), 4);
    let nodata: Vec<&str> = results
        .iter()
        .filter(|(_, fb)| fb.is_nodata())
        .map(|(principal, _)| principal.as_str())
        .collect();
    assert_eq!(nodata, ["zed@elsewhere.example"]);

    assert_eq!(
        busy_spans(&results["alice@corp.example"]),
        [
            (t(5, 9, 0), t(5, 10, 0), FbStatus::Busy),
            (t(5, 13, 0), t(5, 14, 0), FbStatus::Tentative),
        ]
    );
    assert!(busy_spans(&results["erin@corp.example"]).is_empty());
    assert_eq!(
        busy_spans(&results["bob@corp.example"]),
        [(t(5, 11, 0), t(5, 12, 0), FbStatus::Busy)]
    );
}

/// ## Summary
/// A peer that fails only blanks out its own principals.
#[test_log::test(tokio::test)]
async fn failing_peer_degrades_to_nodata() {
    let peer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PEER_ROUTE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&peer)
        .await;

    let env = TestEnv::new().with_peer(&peer.uri());
    env.seed_alice();

    let mut query = FreeBusyQuery::new(env.registry());
    query
        .add(request("alice@corp.example"))
        .add(request("bob@corp.example"));
    let results = query.execute().await.unwrap();

    assert!(results["bob@corp.example"].is_nodata());
    assert_eq!(results["alice@corp.example"].busiest(), FbStatus::Busy);
}

/// ## Summary
/// A peer missing from configuration is a failed batch, not an error.
#[test_log::test(tokio::test)]
async fn unconfigured_peer_is_nodata() {
    let env = TestEnv::new();
    let mut query = FreeBusyQuery::new(env.registry());
    query.add(request("bob@corp.example"));
    let results = query.execute().await.unwrap();
    assert!(results["bob@corp.example"].is_nodata());
}

/// ## Summary
/// The appointment being rescheduled does not count against its owner.
#[test_log::test(tokio::test)]
async fn excluded_item_is_ignored() {
    let env = TestEnv::new();
    env.seed_alice();

    let mut query = FreeBusyQuery::new(env.registry());
    query.add(request("alice@corp.example").excluding("standup"));
    let results = query.execute().await.unwrap();
    assert_eq!(
        busy_spans(&results["alice@corp.example"]),
        [(t(5, 13, 0), t(5, 14, 0), FbStatus::Tentative)]
    );
}

/// ## Summary
/// A mailbox that does not share its calendar answers NODATA, not FREE.
#[test_log::test(tokio::test)]
async fn unshared_mailbox_is_nodata() {
    let env = TestEnv::new();
    env.write_mailbox("erin", &serde_json::json!({"share_freebusy": false}));

    let mut query = FreeBusyQuery::new(env.registry());
    query.add(request("erin@corp.example"));
    let results = query.execute().await.unwrap();
    assert!(results["erin@corp.example"].is_nodata());
}
