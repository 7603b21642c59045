//! A lifecycle orchestrator for long-running async services.
//!
//! Bosun wraps a fixed set of services in a four-phase hook pipeline:
//! register services and hooks on an [`Entrypoint`], then run it around a
//! workload (or forever, until a termination signal). Built-in hooks cover
//! dependency-ordered start/stop, signal handling, context publication, and
//! environment scrubbing.
//!
//! ```ignore
//! use bosun::prelude::*;
//!
//! let mut entrypoint = Entrypoint::new();
//! entrypoint
//!     .add_service(database)
//!     .add_service(http_server)
//!     .first_start_last_stop()
//!     .listen_signals(TermSignal::DEFAULT);
//! entrypoint.run_forever().await?;
//! ```

pub use bosun_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use bosun_internal::prelude::*;
}
