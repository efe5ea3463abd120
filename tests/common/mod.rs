//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use devgate::config::DevGateConfig;
use devgate::http::{DevGateServer, STATUS_PATH};
use devgate::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock upstream that answers every request with a fixed body and
/// echoes the request line and the `x-request-id` it received.
pub async fn start_mock_upstream(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();

                        let request_line = head.lines().next().unwrap_or("").to_string();
                        let request_id = head
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("x-request-id")
                                    .then(|| value.trim().to_string())
                            })
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Upstream-Request: {}\r\nX-Upstream-Request-Id: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            request_line,
                            request_id,
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A devgate instance running on an ephemeral port.
#[allow(dead_code)]
pub struct RunningServer {
    pub addr: SocketAddr,
    pub config_tx: mpsc::UnboundedSender<DevGateConfig>,
    pub shutdown: Shutdown,
}

/// Start devgate with `config`, overriding its bind address.
pub async fn start_server(config: DevGateConfig) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = DevGateServer::new(config).unwrap();
    let server_shutdown = shutdown.handle();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    wait_until_serving(addr).await;

    RunningServer {
        addr,
        config_tx,
        shutdown,
    }
}

/// Poll the status endpoint until the server answers.
async fn wait_until_serving(addr: SocketAddr) {
    let url = format!("http://{}{}", addr, STATUS_PATH);
    let client = client();
    for _ in 0..100 {
        if let Ok(res) = client.get(&url).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("devgate did not start serving on {}", addr);
}

/// Fetch the status endpoint as JSON.
#[allow(dead_code)]
pub async fn status(addr: SocketAddr) -> serde_json::Value {
    client()
        .get(format!("http://{}{}", addr, STATUS_PATH))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Poll the status endpoint until `check` accepts it.
#[allow(dead_code)]
pub async fn wait_for_status(addr: SocketAddr, check: impl Fn(&serde_json::Value) -> bool) {
    for _ in 0..100 {
        if check(&status(addr).await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("status on {} never reached the expected state", addr);
}

/// HTTP client that never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
