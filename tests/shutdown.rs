//! Terminate, grace period and forced close

mod common;

use common::*;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_test::{assert_err, assert_ok};
use uniqnum_core::ServerState;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminate_stops_server() {
    let server = TestServer::start(test_config()).await;
    let addr = server.addr;
    let shutdown = server.shutdown.clone();

    let mut client = server.connect().await;
    send_lines(&mut client, &["000000011", "terminate"]).await;

    let summary = server.join().await;
    assert!(summary.drained_cleanly);
    assert_eq!(summary.force_closed, 0);
    assert_eq!(summary.final_report.unique_total, 1);
    assert_eq!(shutdown.state(), ServerState::Stopped);

    // Listening socket is gone
    assert_err!(TcpStream::connect(addr).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_in_flight_client_finishes_within_grace() {
    let config = uniqnum::ListenerConfig {
        shutdown_grace: Duration::from_secs(3),
        ..test_config()
    };
    let server = TestServer::start(config).await;
    let shutdown = server.shutdown.clone();

    let mut worker = server.connect().await;
    send_lines(&mut worker, &["000000001"]).await;
    assert!(eventually(|| server.store.contains(n(1))).await);

    let mut terminator = server.connect().await;
    send_lines(&mut terminator, &["terminate"]).await;
    assert!(eventually(|| shutdown.state() != ServerState::Running).await);

    // Still served while draining
    send_lines(&mut worker, &["000000002", "000000001"]).await;
    assert_ok!(worker.shutdown().await);

    let summary = server.join().await;
    assert!(summary.drained_cleanly);
    assert_eq!(summary.final_report.unique_total, 2);
    assert_eq!(summary.final_report.duplicates, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_idle_client_force_closed_after_grace() {
    let config = uniqnum::ListenerConfig {
        shutdown_grace: Duration::from_millis(200),
        ..test_config()
    };
    let server = TestServer::start(config).await;
    let metrics = server.metrics.clone();
    let registry = server.registry.clone();

    let mut idle = server.connect().await;
    send_lines(&mut idle, &["000000005"]).await;
    assert!(eventually(|| server.store.contains(n(5))).await);

    let mut terminator = server.connect().await;
    send_lines(&mut terminator, &["terminate"]).await;

    let summary = server.join().await;
    assert!(!summary.drained_cleanly);
    assert_eq!(summary.force_closed, 1);
    assert_eq!(summary.final_report.unique_total, 1);
    assert_eq!(metrics.snapshot().connections_force_closed, 1);
    assert!(registry.is_empty());

    assert!(closed_by_server(&mut idle).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_terminates_stop_once() {
    let server = TestServer::start(test_config()).await;
    let shutdown = server.shutdown.clone();

    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(server.connect().await);
    }
    assert!(eventually(|| server.registry.len() == 3).await);

    for client in &mut clients {
        send_lines(client, &["terminate"]).await;
    }

    let summary = server.join().await;
    assert!(summary.drained_cleanly);
    assert_eq!(shutdown.state(), ServerState::Stopped);

    // Late requests are ignored
    assert!(!shutdown.request_shutdown("late"));
    assert_eq!(shutdown.state(), ServerState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_shutdown_request() {
    let server = TestServer::start(test_config()).await;

    let mut client = server.connect().await;
    send_lines(&mut client, &["000000321"]).await;
    assert!(eventually(|| server.store.contains(n(321))).await);
    drop(client);
    assert!(eventually(|| server.registry.is_empty()).await);

    let summary = server.stop().await;
    assert!(summary.drained_cleanly);
    assert_eq!(summary.final_report.unique, 1);
}
