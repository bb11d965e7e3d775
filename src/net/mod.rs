//! Session accounting.
//!
//! # Data Flow
//! ```text
//! Stream request accepted
//!     → connection.rs (SessionTicket issued, active count incremented)
//!     → upstream connection attached / released (opened, released counts)
//!     → ticket dropped (active count decremented)
//! ```
//!
//! # Design Decisions
//! - Counters are lock-free atomics shared through an Arc
//! - Tickets are RAII so a cancelled handler still decrements

pub mod connection;

pub use connection::{SessionId, SessionTicket, StreamTracker};
