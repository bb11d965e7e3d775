//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Stream request path
//!     → router.rs (resolve against the media backend)
//!     → matcher.rs (prefix match + rewrite)
//!     → Return: StreamTarget or NoMatch
//!
//! Route Compilation (at startup):
//!     StreamConfig + media ServiceEndpoint
//!     → StreamRoute
//!     → Freeze as immutable StreamRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::StreamRoute;
pub use router::{StreamRouter, StreamTarget};
