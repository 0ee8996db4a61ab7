//! Per-session identity, lifecycle state, and the process-wide registry

pub mod id;
pub mod registry;
pub mod state;

pub use id::SessionId;
pub use registry::SessionRegistry;
pub use state::{Session, SessionMetrics, SessionState};
