//! Built-in lifecycle hooks for Bosun (Layer 2).
//!
//! `bosun_hooks` provides the standard hooks that turn the bare
//! `bosun_system` pipeline into a production entrypoint:
//!
//! - [`DependencyChain`] - start in registration order, stop in reverse
//! - [`SignalBridge`] - OS termination signals request a graceful shutdown
//! - [`ContextRegistrar`] - started named services published in the context
//! - [`ClearEnviron`] - scrub environment variables before services start
//!
//! [`EntrypointExt`] wires each of these with a single fluent method.
//!
//! Every hook follows the same discipline: whatever it installs in
//! before-start (operation wrappers, background tasks, context keys) it
//! removes again by after-stop, so the pipeline is reusable and nothing
//! outlives a run.

/// Start/stop ordering across services.
pub mod dependency;

/// Environment variable scrubbing.
pub mod environ;

/// Fluent hook registration on the entrypoint.
pub mod ext;

/// Publishing started services in the shared context.
pub mod registrar;

/// OS signal to graceful shutdown bridging.
pub mod signal;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::dependency::DependencyChain;
    pub use crate::environ::ClearEnviron;
    pub use crate::ext::EntrypointExt;
    pub use crate::registrar::ContextRegistrar;
    pub use crate::signal::{SignalBridge, TermSignal};
}

// Re-export key types at crate root for convenience
pub use dependency::{ChainError, DependencyChain};
pub use environ::ClearEnviron;
pub use ext::EntrypointExt;
pub use registrar::{ContextRegistrar, CONTEXT_KEY_PREFIX};
pub use signal::{SignalBridge, TermSignal};
