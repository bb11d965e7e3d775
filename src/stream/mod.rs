//! Live stream relay subsystem.
//!
//! # Data Flow
//! ```text
//! GET /video{N}
//!     → session.rs (resolve via routing, drive the state machine)
//!     → opener.rs (dedicated upstream connection, GET with Accept)
//!     → relay.rs (chunk-by-chunk copy into a bounded channel)
//!     → chunked response body to the client
//!
//! guard.rs releases the upstream connection exactly once on every exit path.
//! ```

pub mod error;
pub mod guard;
pub mod opener;
pub mod relay;
pub mod session;

pub use error::{BoxError, StreamError};
pub use guard::{LifecycleGuard, Release};
pub use opener::{UpstreamConnection, UpstreamOpener, UpstreamOutcome};
pub use relay::{RelayOutcome, RelayStats};
pub use session::{SessionState, StreamService, StreamSession};
