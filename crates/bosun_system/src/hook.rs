//! Lifecycle hooks.
//!
//! Hooks are the fundamental unit of cross-cutting behavior in Bosun. The
//! entrypoint drives four phases — before-start, after-start, before-stop,
//! after-stop — and invokes each registered hook's matching callback in
//! registration order. A hook that does not implement a callback is a no-op
//! for that phase.
//!
//! Fan-out is sequential, not parallel: later hooks may depend on earlier
//! hooks' side effects (signal wiring must exist before dependency wrapping
//! runs), so execution is a deterministic iteration over the ordered hook
//! list.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use bosun_system::error::BoxError;
//! use bosun_system::hook::{EntrypointHandle, Hook};
//! use bosun_system::service::ServiceHandle;
//! use std::sync::Arc;
//!
//! struct Banner;
//!
//! #[async_trait]
//! impl Hook for Banner {
//!     async fn before_start(
//!         &self,
//!         _entrypoint: &EntrypointHandle,
//!         services: &[Arc<ServiceHandle>],
//!     ) -> Result<(), BoxError> {
//!         tracing::info!(services = services.len(), "starting up");
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;
use crate::flag::Flag;
use crate::service::ServiceHandle;

// ─────────────────────────────────────────────────────────────────────────────
// Phase
// ─────────────────────────────────────────────────────────────────────────────

/// The four lifecycle phases a hook can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before any service start is triggered.
    BeforeStart,
    /// After every service start has settled.
    AfterStart,
    /// Before any service stop is triggered.
    BeforeStop,
    /// After every service stop has settled.
    AfterStop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::BeforeStart => "before-start",
            Phase::AfterStart => "after-start",
            Phase::BeforeStop => "before-stop",
            Phase::AfterStop => "after-stop",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EntrypointHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Per-run control surface handed to hook callbacks.
///
/// Cloneable and task-safe: hooks clone it into background tasks (e.g. the
/// signal bridge's waiter) to request a stop of the current run.
#[derive(Debug, Clone)]
pub struct EntrypointHandle {
    context: Context,
    stop_requested: Flag,
}

impl EntrypointHandle {
    /// Creates a handle for a fresh run over `context`.
    pub(crate) fn new(context: Context) -> Self {
        Self {
            context,
            stop_requested: Flag::new(),
        }
    }

    /// The shared context of this run.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Requests the current run to stop.
    ///
    /// Idempotent: only the first request has effect. A `run_forever`
    /// workload returns once this is called; a `run_until_complete` workload
    /// is unaffected. Returns `true` if this call was the first.
    pub fn request_stop(&self) -> bool {
        self.stop_requested.set()
    }

    /// The flag set by [`request_stop`](Self::request_stop).
    #[must_use]
    pub fn stop_requested(&self) -> Flag {
        self.stop_requested.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook
// ─────────────────────────────────────────────────────────────────────────────

/// A pluggable observer of the four lifecycle phases.
///
/// All callbacks default to no-ops. A callback returning an error aborts the
/// remaining hooks of that phase and surfaces through the entrypoint (see
/// [`EntrypointError::Hook`]).
///
/// [`EntrypointError::Hook`]: crate::error::EntrypointError::Hook
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    /// Returns the hook's name for error messages and logs.
    ///
    /// Default implementation returns the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called before any service start is triggered, with the full ordered
    /// service list. This is where operation wrapping is installed.
    async fn before_start(
        &self,
        _entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called after every service start has settled.
    async fn after_start(
        &self,
        _entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called before any service stop is triggered.
    async fn before_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called after every service stop has settled. This is where operation
    /// wrapping is removed and background tasks are reaped.
    async fn after_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
        Ok(())
    }
}
