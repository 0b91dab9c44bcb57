//! Admission limit: at most `max_clients` served, extras closed unread

mod common;

use common::*;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sixth_client_is_closed_without_reading() {
    let server = TestServer::start(test_config()).await;

    let mut clients = Vec::new();
    for i in 0..5 {
        let mut client = server.connect().await;
        send_lines(&mut client, &[&format!("{:09}", i)]).await;
        clients.push(client);
    }

    assert!(eventually(|| server.registry.len() == 5).await);
    assert!(eventually(|| server.store.total_unique() == 5).await);
    assert_eq!(server.admission.available(), 0);

    let mut extra = server.connect().await;
    send_lines(&mut extra, &["000000099"]).await;

    assert!(closed_by_server(&mut extra).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!server.store.contains(n(99)));
    assert_eq!(server.metrics.snapshot().connections_rejected, 1);
    assert_eq!(server.registry.len(), 5);

    drop(clients);
    let summary = server.stop().await;
    assert!(summary.drained_cleanly);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slot_reusable_after_disconnect() {
    let server = TestServer::start(test_config()).await;

    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(server.connect().await);
    }
    assert!(eventually(|| server.registry.len() == 5).await);

    // One client leaves
    drop(clients.pop());
    assert!(eventually(|| server.admission.available() == 1).await);

    let mut late = server.connect().await;
    send_lines(&mut late, &["000000100"]).await;
    assert!(eventually(|| server.store.contains(n(100))).await);
    assert_eq!(server.metrics.snapshot().connections_rejected, 0);

    drop(late);
    drop(clients);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_custom_capacity() {
    let config = uniqnum::ListenerConfig {
        max_clients: 1,
        ..test_config()
    };
    let server = TestServer::start(config).await;

    let mut first = server.connect().await;
    send_lines(&mut first, &["000000001"]).await;
    assert!(eventually(|| server.store.contains(n(1))).await);

    let mut second = server.connect().await;
    assert!(closed_by_server(&mut second).await);

    drop(first);
    server.stop().await;
}
