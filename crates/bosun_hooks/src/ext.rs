//! Convenience extension for wiring the built-in hooks.
//!
//! [`EntrypointExt`] adds one method per built-in hook to
//! [`Entrypoint`](bosun_system::entrypoint::Entrypoint), so the common
//! configurations read as a single fluent chain instead of explicit
//! `register(SomeHook::new())` calls.

use bosun_system::entrypoint::Entrypoint;

use crate::dependency::DependencyChain;
use crate::environ::ClearEnviron;
use crate::registrar::ContextRegistrar;
use crate::signal::{SignalBridge, TermSignal};

/// Fluent registration of the built-in hooks.
///
/// # Example
///
/// ```ignore
/// use bosun::prelude::*;
///
/// let mut entrypoint = Entrypoint::new();
/// entrypoint
///     .add_service(database)
///     .add_service(http_server)
///     .first_start_last_stop()
///     .listen_signals(TermSignal::DEFAULT)
///     .register_services_in_context();
/// entrypoint.run_forever().await?;
/// ```
pub trait EntrypointExt {
    /// Registers a [`DependencyChain`]: services start in registration order
    /// and stop in reverse.
    fn first_start_last_stop(&mut self) -> &mut Self;

    /// Registers a [`SignalBridge`] for the given signals.
    fn listen_signals(&mut self, signals: impl IntoIterator<Item = TermSignal>) -> &mut Self;

    /// Registers a [`ContextRegistrar`]: started named services become
    /// visible in the shared context.
    fn register_services_in_context(&mut self) -> &mut Self;

    /// Registers a [`ClearEnviron`] scrubbing the environment keys for which
    /// `filter` returns `true`.
    fn clear_environ(&mut self, filter: impl Fn(&str) -> bool) -> &mut Self;
}

impl EntrypointExt for Entrypoint {
    fn first_start_last_stop(&mut self) -> &mut Self {
        self.register(DependencyChain::new())
    }

    fn listen_signals(&mut self, signals: impl IntoIterator<Item = TermSignal>) -> &mut Self {
        self.register(SignalBridge::new(signals))
    }

    fn register_services_in_context(&mut self) -> &mut Self {
        self.register(ContextRegistrar::new())
    }

    fn clear_environ(&mut self, filter: impl Fn(&str) -> bool) -> &mut Self {
        self.register(ClearEnviron::matching(filter))
    }
}
