#![allow(clippy::unused_async, clippy::unwrap_used)]
//! Tests for both Exchange protocols against a mock server: availability
//! queries, form login, and the EWS publication sequence.

use chrono::Utc;
use kunai_test::component::config::ExchangeProtocol;
use kunai_test::component::model::{FbStatus, FreeBusyRequest};
use kunai_test::component::query::FreeBusyQuery;
use kunai_test::component::types::AuthScheme;
use kunai_test::rfc::rfc::mapi::minutes_since_1601;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::*;

/// `svc:secret`
const BASIC_AUTH: &str = "Basic c3ZjOnNlY3JldA==";

fn request(principal: &str) -> FreeBusyRequest {
    FreeBusyRequest::new(principal, t(5, 9, 0), t(5, 11, 0)).unwrap()
}

// ============================================================================
// WebDAV
// ============================================================================

/// ## Summary
/// The merged digit string of each recipient becomes its free/busy.
#[test_log::test(tokio::test)]
async fn webdav_query_decodes_merged_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public/"))
        .and(query_param("cmd", "freebusy"))
        .and(query_param("interval", "30"))
        .and(query_param("start", "2024-03-05T09:00:00Z"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_string(webdav_freebusy_response(&[
            ("carol@legacy.example", "0220"),
            ("dan@legacy.example", "3"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    let mut query = FreeBusyQuery::new(env.registry());
    query
        .add(request("carol@legacy.example"))
        .add(request("mailto:dan@legacy.example"))
        .add(request("ghost@legacy.example"));
    let results = query.execute().await.unwrap();

    assert_eq!(
        busy_spans(&results["carol@legacy.example"]),
        [(t(5, 9, 30), t(5, 10, 30), FbStatus::Busy)]
    );
    assert_eq!(
        busy_spans(&results["mailto:dan@legacy.example"]),
        [
            (t(5, 9, 0), t(5, 9, 30), FbStatus::Unavailable),
            (t(5, 9, 30), t(5, 11, 0), FbStatus::NoData),
        ]
    );
    assert!(results["ghost@legacy.example"].is_nodata());
}

/// ## Summary
/// Form authentication logs in once and reuses the session.
#[test_log::test(tokio::test)]
async fn webdav_form_login_happens_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exchweb/bin/auth/owaauth.dll"))
        .and(body_string_contains("username=svc"))
        .and(body_string_contains("flags=0"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "sessionid=abc; Path=/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(webdav_freebusy_response(&[(
            "carol@legacy.example",
            "2222",
        )])))
        .expect(2)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Form);
    let registry = env.registry();
    for _ in 0..2 {
        let mut query = FreeBusyQuery::new(registry.clone());
        query.add(request("carol@legacy.example"));
        let results = query.execute().await.unwrap();
        assert_eq!(results["carol@legacy.example"].busiest(), FbStatus::Busy);
    }
}

/// ## Summary
/// An expired form session (440) triggers one fresh login and a retry.
#[test_log::test(tokio::test)]
async fn webdav_expired_session_logs_in_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exchweb/bin/auth/owaauth.dll"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/"))
        .respond_with(ResponseTemplate::new(440))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(webdav_freebusy_response(&[(
            "carol@legacy.example",
            "1111",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Form);
    let mut query = FreeBusyQuery::new(env.registry());
    query.add(request("carol@legacy.example"));
    let results = query.execute().await.unwrap();
    assert_eq!(results["carol@legacy.example"].busiest(), FbStatus::Tentative);
}

/// ## Summary
/// A server error leaves the affected principals as NODATA.
#[test_log::test(tokio::test)]
async fn webdav_server_error_is_nodata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let mut query = FreeBusyQuery::new(env.registry());
    query
        .add(request("carol@legacy.example"))
        .add(request("alice@corp.example"));
    let results = query.execute().await.unwrap();
    assert!(results["carol@legacy.example"].is_nodata());
    assert_eq!(results["alice@corp.example"].busiest(), FbStatus::Busy);
}

/// ## Summary
/// A push PROPPATCHes the recipient's free/busy message.
#[test_log::test(tokio::test)]
async fn webdav_push_targets_recipient_message() {
    let server = MockServer::start().await;
    Mock::given(method("PROPPATCH"))
        .and(path(
            "/public/NON_IPM_SUBTREE/SCHEDULE%2B%20FREE%20BUSY/EX:_xF8FF_o=Legacy_xF8FF_ou=First%20Administrative%20Group/USER-/CN=RECIPIENTS/CN=alice.EML",
        ))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let registry = env.registry();
    let provider = registry.provider(EXCHANGE).unwrap();
    provider.handle_mailbox_change("alice").await.unwrap();
}

/// ## Summary
/// The published range is the provider's cached window.
#[test_log::test(tokio::test)]
async fn webdav_push_publishes_cached_window() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let registry = env.registry();
    let provider = registry.provider(EXCHANGE).unwrap();

    let (start, end) = provider.cached_window(Utc::now());
    assert!(end > start);
    Mock::given(method("PROPPATCH"))
        .and(body_string_contains(format!(
            r#"<p:x68470003 dt:dt="int">{}</p:x68470003>"#,
            minutes_since_1601(start)
        )))
        .and(body_string_contains(format!(
            r#"<p:x68480003 dt:dt="int">{}</p:x68480003>"#,
            minutes_since_1601(end)
        )))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    provider.handle_mailbox_change("alice").await.unwrap();
}

// ============================================================================
// EWS
// ============================================================================

/// ## Summary
/// `GetUserAvailability` answers are matched to requests by position, and
/// per-mailbox errors become NODATA.
#[test_log::test(tokio::test)]
async fn ews_query_reads_merged_view() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/EWS/Exchange.asmx"))
        .and(body_string_contains("GetUserAvailabilityRequest"))
        .and(body_string_contains("carol@legacy.example"))
        .and(body_string_contains("Exchange2010_SP1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap(
            r#"<m:GetUserAvailabilityResponse><m:FreeBusyResponseArray>
<m:FreeBusyResponse><m:ResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:ResponseMessage>
<m:FreeBusyView><t:FreeBusyViewType>MergedOnly</t:FreeBusyViewType><t:MergedFreeBusy>0022</t:MergedFreeBusy></m:FreeBusyView></m:FreeBusyResponse>
<m:FreeBusyResponse><m:ResponseMessage ResponseClass="Error"><m:MessageText>not found</m:MessageText><m:ResponseCode>ErrorMailRecipientNotFound</m:ResponseCode></m:ResponseMessage></m:FreeBusyResponse>
</m:FreeBusyResponseArray></m:GetUserAvailabilityResponse>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    let mut query = FreeBusyQuery::new(env.registry());
    query
        .add(request("carol@legacy.example"))
        .add(request("ghost@legacy.example"));
    let results = query.execute().await.unwrap();

    assert_eq!(
        busy_spans(&results["carol@legacy.example"]),
        [(t(5, 10, 0), t(5, 11, 0), FbStatus::Busy)]
    );
    assert!(results["ghost@legacy.example"].is_nodata());
}

/// ## Summary
/// A response array that does not line up with the requested mailboxes
/// cannot be matched by position, so the whole batch is NODATA.
#[test_log::test(tokio::test)]
async fn ews_short_availability_answer_is_nodata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/EWS/Exchange.asmx"))
        .and(body_string_contains("GetUserAvailabilityRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap(
            r#"<m:GetUserAvailabilityResponse><m:FreeBusyResponseArray>
<m:FreeBusyResponse><m:ResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:ResponseMessage>
<m:FreeBusyView><t:FreeBusyViewType>MergedOnly</t:FreeBusyViewType><t:MergedFreeBusy>2222</t:MergedFreeBusy></m:FreeBusyView></m:FreeBusyResponse>
<m:FreeBusyResponse><m:ResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:ResponseMessage>
<m:FreeBusyView><t:FreeBusyViewType>MergedOnly</t:FreeBusyViewType><t:MergedFreeBusy>1111</t:MergedFreeBusy></m:FreeBusyView></m:FreeBusyResponse>
</m:FreeBusyResponseArray></m:GetUserAvailabilityResponse>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let mut query = FreeBusyQuery::new(env.registry());
    query
        .add(request("carol@legacy.example"))
        .add(request("dan@legacy.example"))
        .add(request("frank@legacy.example"))
        .add(request("alice@corp.example"));
    let results = query.execute().await.unwrap();

    for principal in [
        "carol@legacy.example",
        "dan@legacy.example",
        "frank@legacy.example",
    ] {
        assert!(results[principal].is_nodata(), "{principal}");
    }
    assert_eq!(results["alice@corp.example"].busiest(), FbStatus::Busy);
}

async fn mount_folder_walk(server: &MockServer) {
    {
        Mock::given(method("POST"))
            .and(body_string_contains("m:FindFolder"))
            .and(body_string_contains("publicfoldersroot"))
            .respond_with(ResponseTemplate::new(200).set_body_string(find_folder_response(&[
                ("ipm", "IPM_SUBTREE"),
                ("sched", "SCHEDULE+ FREE BUSY"),
            ])))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("m:FindFolder"))
            .and(body_string_contains(r#"Id="sched""#))
            .respond_with(ResponseTemplate::new(200).set_body_string(find_folder_response(&[
                ("other", "EX:/o=Other/ou=Elsewhere"),
                ("org", &format!("EX:{ORG}")),
            ])))
            .expect(1)
            .mount(server)
            .await;
    }
}

/// ## Summary
/// Publishing walks to the organization folder and updates the existing
/// free/busy message with its change key.
#[test_log::test(tokio::test)]
async fn ews_push_updates_existing_message() {
    let server = MockServer::start().await;
    mount_folder_walk(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:FindItem"))
        .and(body_string_contains(r#"Id="org""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(find_item_response(&[
            ("msg-bob", "ck-bob", "USER-/CN=RECIPIENTS/CN=bob"),
            ("msg-alice", "ck-alice", "USER-/CN=RECIPIENTS/CN=alice"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:CreateItem"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:UpdateItem"))
        .and(body_string_contains(r#"Id="msg-alice""#))
        .and(body_string_contains(r#"ChangeKey="ck-alice""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(update_item_response()))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let registry = env.registry();
    let provider = registry.provider(EXCHANGE).unwrap();
    provider.handle_mailbox_change("alice").await.unwrap();
}

/// ## Summary
/// A recipient without a free/busy message gets one created first.
#[test_log::test(tokio::test)]
async fn ews_push_creates_missing_message() {
    let server = MockServer::start().await;
    mount_folder_walk(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:FindItem"))
        .respond_with(ResponseTemplate::new(200).set_body_string(find_item_response(&[])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:CreateItem"))
        .and(body_string_contains("USER-/CN=RECIPIENTS/CN=alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(create_item_response("new-msg", "k1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("m:UpdateItem"))
        .and(body_string_contains(r#"Id="new-msg""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(update_item_response()))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    let registry = env.registry();
    let provider = registry.provider(EXCHANGE).unwrap();
    provider.handle_mailbox_change("alice").await.unwrap();
}

/// ## Summary
/// Accounts hosted on another node are never published from here.
#[test_log::test(tokio::test)]
async fn push_of_foreign_account_fails() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    let registry = env.registry();
    let provider = registry.provider(EXCHANGE).unwrap();
    assert!(!provider.registers_for_account("bob"));
    assert!(provider.handle_mailbox_change("bob").await.is_err());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
