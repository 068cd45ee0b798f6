//! Load testing for the TCP proxy.

use std::time::{Duration, Instant};

use magiclb::{Algorithm, BackendServer, SharedStrategy, Strategy};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_all_relay() {
    let a = common::start_echo_backend().await;
    let b = common::start_echo_backend().await;
    let strategy = SharedStrategy::new(Strategy::with_servers(
        Algorithm::RoundRobin,
        [
            BackendServer::new(1, "127.0.0.1", a.port()),
            BackendServer::new(2, "127.0.0.1", b.port()),
        ],
    ));
    let (server, handle) = common::start_proxy(strategy).await;

    let concurrency = 20;
    let messages_per_client = 25;
    let start = Instant::now();

    let mut clients = Vec::with_capacity(concurrency);
    for i in 0..concurrency {
        let server = server.clone();
        clients.push(tokio::spawn(async move {
            let mut stream = common::connect(&server).await;
            for j in 0..messages_per_client {
                let msg = format!("client {} message {}\n", i, j);
                assert_eq!(common::round_trip(&mut stream, msg.as_bytes()).await, msg.as_bytes());
            }
        }));
    }
    for client in clients {
        tokio::time::timeout(Duration::from_secs(10), client)
            .await
            .expect("client finished in time")
            .unwrap();
    }

    let elapsed = start.elapsed();
    println!(
        "{} sessions x {} round trips in {:?}",
        concurrency, messages_per_client, elapsed
    );

    server.stop();
    handle.await.unwrap().unwrap();
}
