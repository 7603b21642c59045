//! Error types surfaced by the entrypoint.

use thiserror::Error;

use crate::hook::Phase;

/// Boxed error type carried by service and hook callbacks.
///
/// Services are externally owned and fail with arbitrary error types, so the
/// pipeline's seams use a boxed error and only the pipeline itself attaches
/// structure via [`EntrypointError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`Entrypoint::run_until_complete`] and
/// [`Entrypoint::run_forever`].
///
/// [`Entrypoint::run_until_complete`]: crate::entrypoint::Entrypoint::run_until_complete
/// [`Entrypoint::run_forever`]: crate::entrypoint::Entrypoint::run_forever
#[derive(Debug, Error)]
pub enum EntrypointError {
    /// A lifecycle hook callback failed. The remaining hooks of that phase
    /// were not invoked.
    #[error("hook '{hook}' failed during {phase}: {source}")]
    Hook {
        /// Name of the failing hook.
        hook: String,
        /// The lifecycle phase whose callback failed.
        phase: Phase,
        /// The hook's own error.
        #[source]
        source: BoxError,
    },

    /// A service's start operation failed.
    #[error("service '{service}' failed to start: {source}")]
    ServiceStart {
        /// Label of the failing service.
        service: String,
        /// The service's own error.
        #[source]
        source: BoxError,
    },

    /// A service's stop operation failed.
    #[error("service '{service}' failed to stop: {source}")]
    ServiceStop {
        /// Label of the failing service.
        service: String,
        /// The service's own error.
        #[source]
        source: BoxError,
    },
}
