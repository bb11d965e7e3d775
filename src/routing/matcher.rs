//! Stream path pattern matching.
//!
//! # Responsibilities
//! - Match a client path against the stream prefix
//! - Rewrite the matched prefix to the backend prefix, keeping the suffix
//!
//! # Design Decisions
//! - One parametric rule covers every camera feed (`/video`, `/video7`, `/video/3`)
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

/// A client-path prefix and the backend prefix it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRoute {
    client_prefix: String,
    backend_prefix: String,
}

impl StreamRoute {
    pub fn new(client_prefix: impl Into<String>, backend_prefix: impl Into<String>) -> Self {
        Self {
            client_prefix: client_prefix.into(),
            backend_prefix: backend_prefix.into(),
        }
    }

    pub fn client_prefix(&self) -> &str {
        &self.client_prefix
    }

    /// Map `client_path` to its backend path, or `None` if it does not
    /// start with the client prefix.
    ///
    /// The exact prefix maps to the bare backend prefix; any suffix is
    /// carried over unchanged.
    pub fn backend_path(&self, client_path: &str) -> Option<String> {
        let suffix = client_path.strip_prefix(self.client_prefix.as_str())?;
        Some(format!("{}{}", self.backend_prefix, suffix))
    }
}
