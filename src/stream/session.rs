//! Stream sessions: one client ↔ upstream relay each.
//!
//! # Data Flow
//! ```text
//! Idle → Resolving → Opening → Relaying   → Closed
//!                           ↘ OpenFailed  ↗
//! ```
//!
//! # Design Decisions
//! - The response is committed only after the first upstream chunk, so a
//!   failure before any byte is sent still becomes a 500
//! - After commit, the relay runs in its own task that owns the session;
//!   the handler returns immediately with a streaming body
//! - Every state past Resolving reaches Closed exactly once, through an
//!   explicit finish or through Drop on cancellation

use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use hyper::body::Body;
use tokio::sync::mpsc;

use crate::config::GatewayConfig;
use crate::http::response::stream_response;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::net::{SessionId, SessionTicket, StreamTracker};
use crate::observability::metrics;
use crate::routing::{StreamRouter, StreamTarget};
use crate::stream::error::{BoxError, StreamError};
use crate::stream::guard::{LifecycleGuard, Release};
use crate::stream::opener::{UpstreamConnection, UpstreamOpener};
use crate::stream::relay::{self, RelayChunk, RelayOutcome, RelayStats};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Opening,
    Relaying,
    OpenFailed,
    Closed,
}

/// One in-flight stream relay.
#[derive(Debug)]
pub struct StreamSession<C: Release = UpstreamConnection> {
    ticket: SessionTicket,
    state: SessionState,
    started: Instant,
    target: Option<StreamTarget>,
    guard: LifecycleGuard<C>,
    stats: RelayStats,
}

impl<C: Release> StreamSession<C> {
    pub fn new(ticket: SessionTicket) -> Self {
        let guard = LifecycleGuard::new(ticket.id(), ticket.tracker().clone());
        Self {
            ticket,
            state: SessionState::Idle,
            started: Instant::now(),
            target: None,
            guard,
            stats: RelayStats::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.ticket.id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn guard_mut(&mut self) -> &mut LifecycleGuard<C> {
        &mut self.guard
    }

    pub(crate) fn transition(&mut self, next: SessionState) {
        tracing::trace!(session_id = %self.id(), from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }

    pub(crate) fn set_target(&mut self, target: StreamTarget) {
        self.target = Some(target);
    }

    /// Release the upstream connection and move to `Closed`.
    ///
    /// Returns `false` if the session was already closed.
    pub fn finish(&mut self, outcome: &'static str) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.guard.close();
        self.transition(SessionState::Closed);
        metrics::record_stream_outcome(outcome, self.stats.bytes);

        let target = self
            .target
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::info!(
            session_id = %self.id(),
            target = %target,
            outcome,
            chunks = self.stats.chunks,
            bytes = self.stats.bytes,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Stream session closed"
        );
        true
    }

    /// Relay `body` into `downstream` until either side ends or shutdown is
    /// requested, then close the session.
    pub async fn run<B>(
        mut self,
        body: B,
        downstream: mpsc::Sender<RelayChunk>,
        mut shutdown: ShutdownSignal,
    ) where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Into<BoxError>,
    {
        let outcome = tokio::select! {
            outcome = relay::relay(body, downstream, &mut self.stats) => Some(outcome),
            _ = shutdown.recv() => None,
        };

        let label = match &outcome {
            Some(RelayOutcome::Completed) => {
                tracing::debug!(session_id = %self.id(), "Upstream ended the stream");
                "completed"
            }
            Some(RelayOutcome::DownstreamDisconnected) => {
                tracing::debug!(session_id = %self.id(), "Client disconnected");
                "client_disconnected"
            }
            Some(RelayOutcome::Failed(e)) => {
                // Headers are already on the wire; the failure can only be logged.
                tracing::error!(session_id = %self.id(), error = %e, "Relay failed after response was committed");
                "relay_failed"
            }
            None => {
                tracing::debug!(session_id = %self.id(), "Stream stopped for shutdown");
                "shutdown"
            }
        };
        self.finish(label);
    }
}

impl<C: Release> Drop for StreamSession<C> {
    fn drop(&mut self) {
        if matches!(
            self.state,
            SessionState::Opening | SessionState::Relaying | SessionState::OpenFailed
        ) {
            tracing::debug!(session_id = %self.id(), state = ?self.state, "Session dropped before finishing");
            self.finish("aborted");
        }
    }
}

/// Entry point for stream requests.
#[derive(Debug, Clone)]
pub struct StreamService {
    router: StreamRouter,
    opener: UpstreamOpener,
    tracker: StreamTracker,
    shutdown: Shutdown,
    open_delay: Duration,
}

impl StreamService {
    pub fn new(
        router: StreamRouter,
        opener: UpstreamOpener,
        tracker: StreamTracker,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            router,
            opener,
            tracker,
            shutdown,
            open_delay: Duration::ZERO,
        }
    }

    /// Wait this long before dialing the backend.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn from_config(config: &GatewayConfig, tracker: StreamTracker, shutdown: Shutdown) -> Self {
        Self::new(
            StreamRouter::from_config(config),
            UpstreamOpener::from_config(&config.stream),
            tracker,
            shutdown,
        )
        .with_open_delay(config.stream.open_delay())
    }

    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }

    /// Resolve without opening anything.
    pub fn resolve(&self, path: &str) -> Option<StreamTarget> {
        self.router.resolve(path)
    }

    /// Run a stream session for `path`.
    ///
    /// On success the returned response streams the upstream body; the
    /// relay continues in a background task that owns the session.
    pub async fn serve(&self, path: &str, headers: &HeaderMap) -> Result<Response, StreamError> {
        let mut session: StreamSession = StreamSession::new(self.tracker.begin());
        session.transition(SessionState::Resolving);

        let target = self
            .router
            .resolve(path)
            .ok_or_else(|| StreamError::RouteNotResolved(path.to_string()))?;
        session.set_target(target.clone());

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        session.transition(SessionState::Opening);
        tracing::debug!(session_id = %session.id(), target = %target, "Opening upstream stream");

        let outcome = self.opener.open(&target, headers, session.guard_mut()).await;
        let response = match outcome.into_result(&target) {
            Ok(response) => response,
            Err(err) => {
                session.transition(SessionState::OpenFailed);
                tracing::warn!(session_id = %session.id(), error = %err, "Upstream stream unavailable");
                session.finish(err.kind());
                return Err(err);
            }
        };

        session.transition(SessionState::Relaying);
        let (parts, mut body) = response.into_parts();

        let first = match relay::first_chunk(&mut body).await {
            Ok(first) => first,
            Err(source) => {
                let err = StreamError::RelayFailed {
                    target: target.to_string(),
                    source,
                };
                tracing::error!(session_id = %session.id(), error = %err, "Upstream failed before first chunk");
                session.finish(err.kind());
                return Err(err);
            }
        };

        let (tx, downstream) = relay::downstream_channel();
        if let Some(chunk) = first {
            session.stats.record(chunk.len());
            // The channel is fresh, so the first chunk always fits.
            let _ = tx.try_send(Ok(chunk));
        }

        tracing::info!(
            session_id = %session.id(),
            target = %target,
            status = %parts.status,
            "Relaying stream"
        );
        let response = stream_response(&parts, downstream);
        tokio::spawn(session.run(body, tx, self.shutdown.subscribe()));

        Ok(response)
    }
}
