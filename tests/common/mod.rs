//! Shared utilities for integration testing.
//!
//! Mock backends speak raw HTTP/1.1 over `TcpListener` so tests control
//! exactly when bytes are written and when sockets close.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use stream_gateway::config::GatewayConfig;
use stream_gateway::http::HttpServer;
use stream_gateway::lifecycle::Shutdown;
use stream_gateway::net::StreamTracker;

pub const CAMERA_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// What a mock backend observed.
#[derive(Clone, Default)]
pub struct Probe {
    requests: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl Probe {
    /// Request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Connections the gateway closed on us.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record_request(&self, head: String) {
        self.requests.lock().unwrap().push(head);
    }

    fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Read until the end of the request head.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Read until the peer closes the connection.
async fn wait_for_close(socket: &mut TcpStream) {
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

fn chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

fn stream_head(content_type: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\n\r\n",
        content_type
    )
}

/// A camera backend that sends `chunks` then ends the stream.
pub async fn start_stream_backend(chunks: Vec<&'static [u8]>) -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let p = p.clone();
            let chunks = chunks.clone();
            tokio::spawn(async move {
                p.record_request(read_head(&mut socket).await);
                let _ = socket.write_all(stream_head(CAMERA_TYPE).as_bytes()).await;
                for data in chunks {
                    let _ = socket.write_all(&chunk(data)).await;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                let _ = socket.write_all(b"0\r\n\r\n").await;
                wait_for_close(&mut socket).await;
                p.record_close();
            });
        }
    });

    (addr, probe)
}

/// A camera backend that never ends the stream.
///
/// Writes a chunk every 50 ms until the gateway closes the connection.
pub async fn start_endless_backend() -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let p = p.clone();
            tokio::spawn(async move {
                p.record_request(read_head(&mut socket).await);
                let (mut reader, mut writer) = socket.into_split();
                let _ = writer.write_all(stream_head(CAMERA_TYPE).as_bytes()).await;

                let mut tick = tokio::time::interval(Duration::from_millis(50));
                let mut buf = [0u8; 256];
                loop {
                    tokio::select! {
                        read = reader.read(&mut buf) => match read {
                            Ok(0) | Err(_) => break,
                            Ok(_) => continue,
                        },
                        _ = tick.tick() => {
                            if writer.write_all(&chunk(b"--frame\r\n")).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                p.record_close();
            });
        }
    });

    (addr, probe)
}

/// A camera backend that sends `first` (if any) and then goes quiet,
/// holding the connection open until the gateway closes it.
pub async fn start_idle_backend(first: Option<&'static [u8]>) -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let p = p.clone();
            tokio::spawn(async move {
                p.record_request(read_head(&mut socket).await);
                let _ = socket.write_all(stream_head(CAMERA_TYPE).as_bytes()).await;
                if let Some(data) = first {
                    let _ = socket.write_all(&chunk(data)).await;
                }
                wait_for_close(&mut socket).await;
                p.record_close();
            });
        }
    });

    (addr, probe)
}

/// A camera backend that answers 200 with chunked headers, then sends a
/// malformed chunk size and hangs up.
pub async fn start_broken_chunk_backend() -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            p.record_request(read_head(&mut socket).await);
            let _ = socket.write_all(stream_head(CAMERA_TYPE).as_bytes()).await;
            let _ = socket.write_all(b"zz\r\nnot a chunk\r\n").await;
            drop(socket);
        }
    });

    (addr, probe)
}

/// A backend that accepts, reads the request, and hangs up without replying.
pub async fn start_silent_backend() -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            p.record_request(read_head(&mut socket).await);
            drop(socket);
        }
    });

    (addr, probe)
}

/// A one-shot backend answering every request with the same response.
pub async fn start_http_backend(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> (SocketAddr, Probe) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = Probe::default();

    let p = probe.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let p = p.clone();
            tokio::spawn(async move {
                p.record_request(read_head(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, probe)
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Gateway config pointing both services at local mocks.
pub fn gateway_config(media: SocketAddr, auth: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.services.media.host = media.ip().to_string();
    config.services.media.port = media.port();
    config.services.auth.host = auth.ip().to_string();
    config.services.auth.port = auth.port();
    config.stream.connect_timeout_ms = 1000;
    config
}

pub struct Gateway {
    pub addr: SocketAddr,
    pub tracker: StreamTracker,
    pub shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config);
    let tracker = server.tracker();
    let shutdown = server.shutdown();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    Gateway {
        addr,
        tracker,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
