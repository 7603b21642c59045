//! Service abstraction and per-service lifecycle handles.
//!
//! A [`Service`] is something with an async `start` and `stop`, optionally a
//! symbolic name. Services are externally owned; the pipeline only holds a
//! [`ServiceHandle`] per registered service.
//!
//! # Operation wrapping
//!
//! The handle is where lifecycle hooks install their coordination: instead of
//! mutating the service, a hook *decorates* the handle's start or stop
//! operation with [`ServiceHandle::wrap_start`] / [`ServiceHandle::wrap_stop`].
//! The decorator delegates to the previous operation, and
//! [`ServiceHandle::restore_start`] / [`ServiceHandle::restore_stop`] discard
//! every decorator and hand back the original operation, so repeated runs
//! never compound wrappers and a service inspected outside a run behaves
//! unmodified.
//!
//! The handle also owns the service's readiness [`Flag`]: the pipeline sets
//! it once the (possibly wrapped) start operation completes, and fails it if
//! the start operation errors, so anyone waiting on readiness observes a
//! terminal state instead of hanging.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::context::Context;
use crate::error::BoxError;
use crate::flag::Flag;

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Why a service is being stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The run finished normally (workload completed or shutdown requested).
    #[default]
    Normal,
    /// The run is tearing down because an earlier phase failed.
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Normal => write!(f, "normal shutdown"),
            StopReason::Failed(message) => write!(f, "startup failure: {message}"),
        }
    }
}

/// A long-running unit of work with an async start/stop lifecycle.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use bosun_system::context::Context;
/// use bosun_system::error::BoxError;
/// use bosun_system::service::{Service, StopReason};
///
/// struct Listener;
///
/// #[async_trait]
/// impl Service for Listener {
///     fn name(&self) -> Option<&str> {
///         Some("listener")
///     }
///
///     async fn start(&self, _context: &Context) -> Result<(), BoxError> {
///         // bind sockets, spawn workers, ...
///         Ok(())
///     }
///
///     async fn stop(&self, _reason: StopReason) -> Result<(), BoxError> {
///         // drain connections, ...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Symbolic name used for context publication and log labels.
    ///
    /// Unnamed services are skipped by name-keyed hooks such as the context
    /// registrar.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Starts the service.
    ///
    /// The framework considers the service started once this returns `Ok`.
    async fn start(&self, context: &Context) -> Result<(), BoxError>;

    /// Stops the service.
    async fn stop(&self, _reason: StopReason) -> Result<(), BoxError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Start / stop operations
// ─────────────────────────────────────────────────────────────────────────────

/// Boxed future returned by start/stop operations.
pub type OpFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// A replaceable start operation.
pub type StartOp = Arc<dyn Fn() -> OpFuture + Send + Sync>;

/// A replaceable stop operation.
pub type StopOp = Arc<dyn Fn(StopReason) -> OpFuture + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// ServiceHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Per-service state owned by the pipeline.
///
/// Holds the service itself, its readiness flag, and the current (possibly
/// decorated) start/stop operations.
pub struct ServiceHandle {
    service: Arc<dyn Service>,
    name: Option<String>,
    label: String,
    ready: RwLock<Flag>,
    default_start: StartOp,
    default_stop: StopOp,
    start_op: RwLock<StartOp>,
    stop_op: RwLock<StopOp>,
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("label", &self.label)
            .field("ready", &self.ready.read().state())
            .field("start_wrapped", &self.is_start_wrapped())
            .field("stop_wrapped", &self.is_stop_wrapped())
            .finish()
    }
}

impl ServiceHandle {
    /// Creates a handle for `service` at registration position `index`.
    ///
    /// The default operations delegate straight to the service, passing the
    /// shared `context` into `start`.
    pub(crate) fn new(index: usize, service: Arc<dyn Service>, context: Context) -> Self {
        let name = service.name().map(str::to_owned);
        let label = name.clone().unwrap_or_else(|| format!("service#{index}"));

        let default_start: StartOp = {
            let service = Arc::clone(&service);
            Arc::new(move || {
                let service = Arc::clone(&service);
                let context = context.clone();
                Box::pin(async move { service.start(&context).await })
            })
        };
        let default_stop: StopOp = {
            let service = Arc::clone(&service);
            Arc::new(move |reason| {
                let service = Arc::clone(&service);
                Box::pin(async move { service.stop(reason).await })
            })
        };

        Self {
            service,
            name,
            label,
            ready: RwLock::new(Flag::new()),
            start_op: RwLock::new(Arc::clone(&default_start)),
            stop_op: RwLock::new(Arc::clone(&default_stop)),
            default_start,
            default_stop,
        }
    }

    /// The underlying service.
    #[must_use]
    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    /// The service's symbolic name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A label for logs and errors: the name, or `service#<index>`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The readiness flag for the current run.
    ///
    /// Set by the pipeline once the start operation completes, failed if it
    /// errors. Replaced with a fresh flag at the start of every run.
    #[must_use]
    pub fn ready(&self) -> Flag {
        self.ready.read().clone()
    }

    /// Decorates the start operation.
    ///
    /// `wrap` receives the current operation and returns the replacement,
    /// which typically delegates to it.
    pub fn wrap_start<F>(&self, wrap: F)
    where
        F: FnOnce(StartOp) -> StartOp,
    {
        let mut op = self.start_op.write();
        let inner = Arc::clone(&op);
        *op = wrap(inner);
    }

    /// Decorates the stop operation.
    pub fn wrap_stop<F>(&self, wrap: F)
    where
        F: FnOnce(StopOp) -> StopOp,
    {
        let mut op = self.stop_op.write();
        let inner = Arc::clone(&op);
        *op = wrap(inner);
    }

    /// Discards every start decorator, restoring the original operation.
    pub fn restore_start(&self) {
        *self.start_op.write() = Arc::clone(&self.default_start);
    }

    /// Discards every stop decorator, restoring the original operation.
    pub fn restore_stop(&self) {
        *self.stop_op.write() = Arc::clone(&self.default_stop);
    }

    /// Returns `true` if the start operation is currently decorated.
    #[must_use]
    pub fn is_start_wrapped(&self) -> bool {
        !Arc::ptr_eq(&self.start_op.read(), &self.default_start)
    }

    /// Returns `true` if the stop operation is currently decorated.
    #[must_use]
    pub fn is_stop_wrapped(&self) -> bool {
        !Arc::ptr_eq(&self.stop_op.read(), &self.default_stop)
    }

    /// The current start operation.
    #[must_use]
    pub fn start_op(&self) -> StartOp {
        Arc::clone(&self.start_op.read())
    }

    /// The current stop operation.
    #[must_use]
    pub fn stop_op(&self) -> StopOp {
        Arc::clone(&self.stop_op.read())
    }

    /// Resets per-run state: fresh readiness flag, original operations.
    ///
    /// Called by the pipeline at the top of every run so that a run aborted
    /// before its unwrap phase cannot leak wrappers into the next one.
    pub(crate) fn reset_for_run(&self) {
        *self.ready.write() = Flag::new();
        self.restore_start();
        self.restore_stop();
    }
}
