//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → stream sessions end their relays
//!             → guards release upstream connections → drain → exit
//! ```
//!
//! # Design Decisions
//! - Stream sessions are unbounded, so shutdown ends them instead of
//!   waiting for them
//! - The signal is level-triggered so late subscribers never miss it

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
