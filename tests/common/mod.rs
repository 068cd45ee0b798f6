//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

use magiclb::config::TimeoutConfig;
use magiclb::proxy::ProxyError;
use magiclb::{ProxyServer, ProxyState, SharedStrategy};

/// Start an echo backend on an ephemeral port.
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// Start a backend that writes `greeting` to every connection, then closes it.
#[allow(dead_code)]
pub async fn start_greeting_backend(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(greeting).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// A port with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// A listener whose accept queue is full, so new connects to it never
/// complete. The returned streams hold the queue and must be kept alive.
#[allow(dead_code)]
pub async fn start_stalled_backend() -> (SocketAddr, TcpListener, Vec<TcpStream>) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut queued = Vec::new();
    for _ in 0..4 {
        if let Ok(Ok(stream)) =
            tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await
        {
            queued.push(stream);
        }
    }
    (addr, listener, queued)
}

pub type ProxyHandle = JoinHandle<Result<(), ProxyError>>;

/// Start a proxy on an ephemeral port and wait until it is accepting.
pub async fn start_proxy(strategy: SharedStrategy) -> (Arc<ProxyServer>, ProxyHandle) {
    let timeouts = TimeoutConfig {
        connect_secs: 2,
        poll_interval_ms: 50,
        idle_secs: 0,
    };
    start_proxy_with(strategy, timeouts).await
}

/// Like [`start_proxy`] with explicit timeouts.
#[allow(dead_code)]
pub async fn start_proxy_with(
    strategy: SharedStrategy,
    timeouts: TimeoutConfig,
) -> (Arc<ProxyServer>, ProxyHandle) {
    let server = Arc::new(ProxyServer::new("127.0.0.1", 0, strategy).with_timeouts(timeouts));

    let mut state = server.subscribe_state();
    let handle = server.spawn();
    let running = state.wait_for(|s| *s == ProxyState::Running);
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("proxy started in time")
        .unwrap();
    (server, handle)
}

/// Connect a client to a running proxy.
pub async fn connect(server: &ProxyServer) -> TcpStream {
    TcpStream::connect(server.local_addr().expect("proxy is bound"))
        .await
        .unwrap()
}

/// Read until EOF, failing the test if it takes longer than two seconds.
#[allow(dead_code)]
pub async fn read_to_end(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut buf))
        .await
        .expect("peer closed in time")
        .unwrap();
    buf
}

/// Send `msg` and read the same number of bytes back.
#[allow(dead_code)]
pub async fn round_trip(stream: &mut TcpStream, msg: &[u8]) -> Vec<u8> {
    stream.write_all(msg).await.unwrap();
    let mut buf = vec![0u8; msg.len()];
    tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("reply in time")
        .unwrap();
    buf
}
