//! Stream session identity and lifecycle accounting.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Count active stream sessions
//! - Count upstream connections opened and released

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    active_sessions: AtomicU64,
    opened: AtomicU64,
    released: AtomicU64,
}

/// Tracks stream sessions and their upstream connections.
///
/// Cloning is cheap; all clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct StreamTracker {
    counters: Arc<Counters>,
}

impl StreamTracker {
    /// Create a new tracker with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. Returns a ticket that decrements on drop.
    pub fn begin(&self) -> SessionTicket {
        self.counters.active_sessions.fetch_add(1, Ordering::SeqCst);
        metrics::stream_session_started();
        SessionTicket {
            tracker: self.clone(),
            id: SessionId::new(),
        }
    }

    pub(crate) fn record_opened(&self) {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_released(&self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }

    /// Sessions currently in flight.
    pub fn active_sessions(&self) -> u64 {
        self.counters.active_sessions.load(Ordering::SeqCst)
    }

    /// Upstream connections handed to a lifecycle guard.
    pub fn opened_connections(&self) -> u64 {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Upstream connections closed by a lifecycle guard.
    pub fn released_connections(&self) -> u64 {
        self.counters.released.load(Ordering::SeqCst)
    }
}

/// Proof of a tracked session. Decrements the active count when dropped.
#[derive(Debug)]
pub struct SessionTicket {
    tracker: StreamTracker,
    id: SessionId,
}

impl SessionTicket {
    /// Get this session's ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.tracker
            .counters
            .active_sessions
            .fetch_sub(1, Ordering::SeqCst);
        metrics::stream_session_ended();
        tracing::trace!(session_id = %self.id, "Session ticket dropped");
    }
}
