//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use forward_proxy::config::ProxyConfig;
use forward_proxy::net::Listener;
use forward_proxy::{ListenerError, ProxyServer, ProxyState, Shutdown};

/// A mock origin server that records every request it receives.
///
/// Responses are served in order; once exhausted the last one repeats.
pub struct MockOrigin {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockOrigin {
    /// Start an origin answering every request with `response`.
    pub async fn start(response: &[u8]) -> Self {
        Self::start_scripted(vec![response.to_vec()], Duration::ZERO).await
    }

    /// Start an origin that waits `delay` before each answer.
    pub async fn start_delayed(response: &[u8], delay: Duration) -> Self {
        Self::start_scripted(vec![response.to_vec()], delay).await
    }

    /// Start an origin with a programmed sequence of responses.
    pub async fn start_scripted(responses: Vec<Vec<u8>>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = responses[served.min(responses.len() - 1)].clone();
                served += 1;
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let request = read_until_blank_line(&mut socket).await;
                    seen.lock().unwrap().push(request);
                    tokio::time::sleep(delay).await;
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.raw_requests()
            .iter()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect()
    }

    /// Requests received so far, exactly as they arrived on the wire.
    pub fn raw_requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }

    /// Absolute URL for `path` on this origin.
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port(), path)
    }
}

async fn read_until_blank_line(socket: &mut TcpStream) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buffer.ends_with(b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }
    buffer
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: Arc<ProxyState>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

impl TestProxy {
    /// Start a proxy with default settings listening on 127.0.0.1.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a proxy after letting the caller adjust its config.
    pub async fn start_with(adjust: impl FnOnce(&mut ProxyConfig)) -> Self {
        let mut config = ProxyConfig::default();
        config.listener.address = "127.0.0.1".into();
        config.listener.port = 0;
        adjust(&mut config);

        let listener = Listener::bind(&config.listener).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ProxyServer::new(config).unwrap();
        let state = server.state();

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();
        let handle = tokio::spawn(server.run(listener, server_shutdown));

        Self {
            addr,
            state,
            shutdown,
            handle,
        }
    }

    /// Send a raw request and read the reply until the proxy closes.
    pub async fn send(&self, request: &str) -> Vec<u8> {
        send_raw(self.addr, request.as_bytes()).await
    }

    /// `GET url HTTP/1.0` with no headers.
    pub async fn get(&self, url: &str) -> Vec<u8> {
        self.send(&format!("GET {} HTTP/1.0\r\n\r\n", url)).await
    }

    /// Issue a `/proxy/` command.
    pub async fn command(&self, command: &str) -> Vec<u8> {
        self.get(&format!("http://127.0.0.1:{}/proxy/{}", self.addr.port(), command))
            .await
    }
}

/// Connect, write `request`, and read until the peer closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}
