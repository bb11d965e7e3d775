//! Upstream stream opener.
//!
//! # Responsibilities
//! - Dial the resolved backend with a bounded connect timeout
//! - Run a dedicated HTTP/1.1 connection for the session (no pooling)
//! - Send the streaming GET and classify the outcome
//!
//! # Design Decisions
//! - The connection is handed to the session's lifecycle guard as soon as
//!   the transport is up, before the request is written
//! - No read or idle timer is installed on the connection; a live feed may
//!   stay quiet for arbitrarily long

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response};
use bytes::Bytes;
use http_body_util::Empty;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::{StreamConfig, MULTIPART_STREAM_TYPE};
use crate::http::request::X_REQUEST_ID;
use crate::routing::StreamTarget;
use crate::stream::error::{BoxError, StreamError};
use crate::stream::guard::{LifecycleGuard, Release};

/// A live HTTP/1.1 connection to a stream backend.
///
/// The connection is driven by its own task; releasing it aborts that task,
/// which drops the socket.
#[derive(Debug)]
pub struct UpstreamConnection {
    peer: String,
    driver: JoinHandle<()>,
}

impl Release for UpstreamConnection {
    fn release(&mut self) {
        self.driver.abort();
        tracing::trace!(upstream = %self.peer, "Upstream connection driver aborted");
    }
}

/// Result of an open attempt. Consumed once.
#[derive(Debug)]
pub enum UpstreamOutcome {
    /// Upstream answered; the body is ready to relay.
    Connected(Response<Incoming>),
    /// Transport connect failed or timed out.
    ConnectFailed(io::Error),
    /// Connected, but the request or response failed.
    RequestFailed(BoxError),
}

impl UpstreamOutcome {
    /// Map the outcome onto the session error taxonomy.
    pub fn into_result(self, target: &StreamTarget) -> Result<Response<Incoming>, StreamError> {
        match self {
            Self::Connected(response) => Ok(response),
            Self::ConnectFailed(source) => Err(StreamError::UpstreamConnectFailed {
                target: target.to_string(),
                source,
            }),
            Self::RequestFailed(source) => Err(StreamError::UpstreamRequestFailed {
                target: target.to_string(),
                source,
            }),
        }
    }
}

/// Opens dedicated upstream connections for stream sessions.
#[derive(Debug, Clone)]
pub struct UpstreamOpener {
    connect_timeout: Duration,
    accept: HeaderValue,
    forward_headers: Arc<[HeaderName]>,
}

impl UpstreamOpener {
    /// An opener that requests the multipart stream type and forwards no
    /// client headers.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            accept: HeaderValue::from_static(MULTIPART_STREAM_TYPE),
            forward_headers: Arc::from(Vec::new()),
        }
    }

    pub fn with_accept(mut self, accept: HeaderValue) -> Self {
        self.accept = accept;
        self
    }

    /// Client headers to copy onto every upstream request (e.g. `Authorization`).
    pub fn with_forward_headers(mut self, names: impl IntoIterator<Item = HeaderName>) -> Self {
        self.forward_headers = names.into_iter().collect::<Vec<_>>().into();
        self
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        let accept = HeaderValue::from_str(&config.accept).unwrap_or_else(|_| {
            tracing::warn!(accept = %config.accept, "Invalid stream accept header, using default");
            HeaderValue::from_static(MULTIPART_STREAM_TYPE)
        });
        let names = config.forward_headers.iter().filter_map(|name| {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| tracing::warn!(header = %name, "Ignoring invalid forward header"))
                .ok()
        });

        Self::new(config.connect_timeout())
            .with_accept(accept)
            .with_forward_headers(names)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connect to `target`, attach the connection to `guard`, and send the
    /// streaming request.
    pub async fn open(
        &self,
        target: &StreamTarget,
        client_headers: &HeaderMap,
        guard: &mut LifecycleGuard<UpstreamConnection>,
    ) -> UpstreamOutcome {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return UpstreamOutcome::ConnectFailed(e),
            Err(_) => {
                return UpstreamOutcome::ConnectFailed(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {} ms", self.connect_timeout.as_millis()),
                ))
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(upstream = %target, error = %e, "Failed to set TCP_NODELAY");
        }

        let (mut sender, conn) = match http1::handshake(TokioIo::new(stream)).await {
            Ok(parts) => parts,
            Err(e) => return UpstreamOutcome::ConnectFailed(io::Error::other(e)),
        };
        let peer = target.authority();
        let driver = tokio::spawn({
            let peer = peer.clone();
            async move {
                if let Err(e) = conn.await {
                    tracing::debug!(upstream = %peer, error = %e, "Upstream connection ended with error");
                }
            }
        });
        guard.attach(UpstreamConnection { peer, driver });

        let request = match self.build_request(target, client_headers) {
            Ok(request) => request,
            Err(e) => return UpstreamOutcome::RequestFailed(Box::new(e)),
        };

        match sender.send_request(request).await {
            Ok(response) => UpstreamOutcome::Connected(response),
            Err(e) => UpstreamOutcome::RequestFailed(Box::new(e)),
        }
    }

    fn build_request(
        &self,
        target: &StreamTarget,
        client_headers: &HeaderMap,
    ) -> Result<Request<Empty<Bytes>>, axum::http::Error> {
        let mut builder = Request::get(target.path.as_str())
            .header(header::HOST, target.authority())
            .header(header::ACCEPT, self.accept.clone());

        if let Some(id) = client_headers.get(&X_REQUEST_ID) {
            builder = builder.header(X_REQUEST_ID, id.clone());
        }
        for name in self.forward_headers.iter() {
            for value in client_headers.get_all(name) {
                builder = builder.header(name.clone(), value.clone());
            }
        }

        builder.body(Empty::new())
    }
}
