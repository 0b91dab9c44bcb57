//! Common test utilities for integration tests
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use uniqnum::{ListenerConfig, Server, ShutdownCoordinator, ShutdownSummary};
use uniqnum_core::Number;
use uniqnum_pool::{AdmissionController, ConnectionRegistry, DedupStore, MetricsRegistry};

/// Upper bound for any single wait in these tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Listener on an ephemeral loopback port with test-friendly timings
pub fn test_config() -> ListenerConfig {
    ListenerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        stats_interval: Duration::from_secs(60),
        shutdown_grace: Duration::from_millis(500),
        ..ListenerConfig::default()
    }
}

/// A running server plus handles into its shared state
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<DedupStore>,
    pub admission: AdmissionController,
    pub registry: Arc<ConnectionRegistry>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub metrics: MetricsRegistry,
    pub handle: JoinHandle<uniqnum_core::Result<ShutdownSummary>>,
}

impl TestServer {
    pub async fn start(config: ListenerConfig) -> Self {
        let server = Server::bind(config).await.expect("bind test server");

        Self {
            addr: server.local_addr(),
            store: server.store(),
            admission: server.admission().clone(),
            registry: server.registry(),
            shutdown: server.shutdown_handle(),
            metrics: server.metrics(),
            handle: tokio::spawn(server.run()),
        }
    }

    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.expect("connect to test server")
    }

    /// Wait for `run` to return
    pub async fn join(self) -> ShutdownSummary {
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error")
    }

    /// Request shutdown from outside and wait for `run` to return
    pub async fn stop(self) -> ShutdownSummary {
        self.shutdown.request_shutdown("test");
        self.join().await
    }
}

pub fn n(value: u32) -> Number {
    Number::new(value).unwrap()
}

/// Write each line followed by '\n'
pub async fn send_lines(stream: &mut TcpStream, lines: &[&str]) {
    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    stream.write_all(payload.as_bytes()).await.expect("write lines");
}

/// True once the server has closed the connection (EOF or reset)
pub async fn closed_by_server(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 16];
    matches!(
        tokio::time::timeout(WAIT, stream.read(&mut buf)).await,
        Ok(Ok(0)) | Ok(Err(_))
    )
}

/// Poll `condition` until it holds or [`WAIT`] elapses
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Synchronous variant of [`wait_until`]
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    wait_until(|| std::future::ready(condition())).await
}
