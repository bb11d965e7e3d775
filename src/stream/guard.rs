//! Exactly-once release of a session's upstream connection.
//!
//! A [`LifecycleGuard`] starts empty when the session begins opening. The
//! opener attaches the connection as soon as the transport is up; from then
//! on the guard owns it. Whatever way the session ends (success, open
//! failure, relay failure, client disconnect, task cancellation, panic), the
//! connection is released once: explicitly through [`LifecycleGuard::close`]
//! or, failing that, when the guard is dropped.

use crate::net::{SessionId, StreamTracker};

/// A transport resource that must be released when a session ends.
pub trait Release: Send {
    /// Tear down the resource. Called at most once per value.
    fn release(&mut self);
}

/// Owns an upstream connection for the lifetime of one stream session.
#[derive(Debug)]
pub struct LifecycleGuard<C: Release> {
    session_id: SessionId,
    tracker: StreamTracker,
    conn: Option<C>,
    closed: bool,
}

impl<C: Release> LifecycleGuard<C> {
    /// Create an empty guard for a session.
    pub fn new(session_id: SessionId, tracker: StreamTracker) -> Self {
        Self {
            session_id,
            tracker,
            conn: None,
            closed: false,
        }
    }

    /// Hand a freshly opened connection to the guard.
    ///
    /// A connection attached after the guard has closed is released
    /// immediately; a guard never holds more than one connection.
    pub fn attach(&mut self, mut conn: C) {
        self.tracker.record_opened();
        if self.closed {
            tracing::warn!(session_id = %self.session_id, "Connection attached to closed guard, releasing");
            conn.release();
            self.tracker.record_released();
            return;
        }
        if let Some(mut previous) = self.conn.replace(conn) {
            tracing::warn!(session_id = %self.session_id, "Guard already held a connection, releasing it");
            previous.release();
            self.tracker.record_released();
        }
    }

    /// Whether a connection is currently held.
    pub fn is_attached(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the held connection, if any.
    ///
    /// Returns `true` if this call released a connection. Later calls are
    /// no-ops and return `false`.
    pub fn close(&mut self) -> bool {
        self.closed = true;
        match self.conn.take() {
            Some(mut conn) => {
                conn.release();
                self.tracker.record_released();
                tracing::debug!(session_id = %self.session_id, "Upstream connection released");
                true
            }
            None => false,
        }
    }
}

impl<C: Release> Drop for LifecycleGuard<C> {
    fn drop(&mut self) {
        if self.close() {
            tracing::debug!(session_id = %self.session_id, "Upstream connection released on drop");
        }
    }
}
