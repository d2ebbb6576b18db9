#![allow(clippy::unused_async, clippy::unwrap_used)]
//! Tests for push propagation: local change hook, persisted queue, and
//! retrying delivery to Exchange.

use std::time::Duration;

use kunai_test::component::config::ExchangeProtocol;
use kunai_test::component::sync::SyncManager;
use kunai_test::component::types::{AuthScheme, ItemTypeMask};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::*;

async fn proppatch_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "PROPPATCH")
        .count()
}

/// ## Summary
/// A push that fails once is retried after the backoff and then leaves
/// the queue, after exactly two attempts.
#[test_log::test(tokio::test)]
async fn push_succeeds_on_second_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("PROPPATCH"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PROPPATCH"))
        .respond_with(ResponseTemplate::new(207))
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    let manager = SyncManager::open(env.registry(), &env.settings.sync)
        .await
        .unwrap();

    assert_eq!(
        manager
            .on_mailbox_changed("alice", ItemTypeMask::APPOINTMENT)
            .await,
        1
    );
    let cancel = CancellationToken::new();
    let handles = manager.spawn_dispatchers(&cancel);

    let queued = &manager;
    let drained = wait_until(Duration::from_secs(15), || async move {
        queued.pending(EXCHANGE).await.unwrap().is_empty()
    })
    .await;
    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(drained, "queue never drained");
    assert_eq!(proppatch_count(&server).await, 2);
    let file = std::fs::read_to_string(env.queue_dir().join("exchange.queue")).unwrap();
    assert_eq!(file, "1\n");
}

/// ## Summary
/// An account whose push keeps failing is still queued after a restart.
#[test_log::test(tokio::test)]
async fn failing_push_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("PROPPATCH"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    env.seed_alice();
    {
        let manager = SyncManager::open(env.registry(), &env.settings.sync)
            .await
            .unwrap();
        manager
            .on_mailbox_changed("alice", ItemTypeMask::APPOINTMENT)
            .await;
        let cancel = CancellationToken::new();
        let handles = manager.spawn_dispatchers(&cancel);
        let server = &server;
        let retried = wait_until(Duration::from_secs(15), || async move {
            proppatch_count(server).await >= 2
        })
        .await;
        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(retried, "push was not retried");
    }

    let file = std::fs::read_to_string(env.queue_dir().join("exchange.queue")).unwrap();
    assert_eq!(file, "2\nalice\n");

    let reopened = SyncManager::open(env.registry(), &env.settings.sync)
        .await
        .unwrap();
    assert_eq!(reopened.pending(EXCHANGE).await.unwrap(), ["alice"]);
}

/// ## Summary
/// Only appointment changes of accounts hosted here are queued.
#[test_log::test(tokio::test)]
async fn irrelevant_changes_are_not_queued() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Webdav, &server.uri(), AuthScheme::Basic);
    let manager = SyncManager::open(env.registry(), &env.settings.sync)
        .await
        .unwrap();

    assert_eq!(manager.on_mailbox_changed("bob", ItemTypeMask::APPOINTMENT).await, 0);
    assert_eq!(manager.on_mailbox_changed("alice", ItemTypeMask::TASK).await, 0);
    assert_eq!(manager.on_mailbox_changed("nobody", ItemTypeMask::ALL).await, 0);
    assert!(manager.pending(EXCHANGE).await.unwrap().is_empty());
}

/// ## Summary
/// Repeated changes of one account while it waits collapse into one entry.
#[test_log::test(tokio::test)]
async fn repeated_changes_collapse() {
    let server = MockServer::start().await;
    let env = TestEnv::new().with_exchange(ExchangeProtocol::Ews, &server.uri(), AuthScheme::Basic);
    let manager = SyncManager::open(env.registry(), &env.settings.sync)
        .await
        .unwrap();

    for _ in 0..3 {
        manager
            .on_mailbox_changed("alice", ItemTypeMask::APPOINTMENT)
            .await;
    }
    manager
        .on_mailbox_changed("erin", ItemTypeMask::APPOINTMENT | ItemTypeMask::TASK)
        .await;
    assert_eq!(manager.pending(EXCHANGE).await.unwrap(), ["alice", "erin"]);
}
