//! Service lifecycle pipeline and hook primitives for Bosun (Layer 1).
//!
//! `bosun_system` provides the core abstractions for orchestrating the
//! lifecycle of a fixed set of long-running async services inside a single
//! process.
//!
//! # Core Concepts
//!
//! - [`Service`] - Something with an async start/stop lifecycle
//! - [`Hook`] - A pluggable observer of the four lifecycle phases
//! - [`Entrypoint`] - The pipeline that drives hooks and services
//! - [`Context`] - Explicit shared key-value state
//! - [`Flag`] - Set-once waitable signal (readiness, stop, shutdown)
//!
//! # Example
//!
//! ```ignore
//! use bosun_system::prelude::*;
//!
//! let mut entrypoint = Entrypoint::new();
//! entrypoint
//!     .add_service(Database::connect(config))
//!     .add_service(HttpServer::new(addr));
//! entrypoint.run_until_complete(workload()).await?;
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Bosun architecture:
//!
//! - **Layer 1** (`bosun_system`): pipeline, service, and hook primitives (this crate)
//! - **Layer 2** (`bosun_hooks`): built-in hooks (dependency chain, signal
//!   bridge, context registrar, environment clearing)

/// Process-wide shared context.
pub mod context;

/// The hook pipeline.
pub mod entrypoint;

/// Error types surfaced by the entrypoint.
pub mod error;

/// Set-once waitable signals.
pub mod flag;

/// Lifecycle hook trait and phases.
pub mod hook;

/// Logging configuration.
pub mod logging;

/// Service abstraction and per-service handles.
pub mod service;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::entrypoint::Entrypoint;
    pub use crate::error::{BoxError, EntrypointError};
    pub use crate::flag::{Flag, FlagError, FlagState};
    pub use crate::hook::{EntrypointHandle, Hook, Phase};
    pub use crate::logging::{LogFormat, LoggingConfig};
    pub use crate::service::{Service, ServiceHandle, StopReason};
}

// Re-export key types at crate root for convenience
pub use context::Context;
pub use entrypoint::Entrypoint;
pub use error::{BoxError, EntrypointError};
pub use flag::Flag;
pub use hook::{EntrypointHandle, Hook, Phase};
pub use service::{Service, ServiceHandle, StopReason};
