//! Context registrar.
//!
//! [`ContextRegistrar`] publishes every *named* service into the shared
//! [`Context`](bosun_system::context::Context) once that service has started,
//! under the key `service__<name>`. Other services and after-start hooks can
//! then look a started peer up by name instead of holding a direct reference.
//!
//! Each named service's start operation is decorated: the decorator spawns a
//! detached publisher task and then awaits only the original start body, so
//! startup is never gated on context publication. The publisher waits for the
//! service's readiness flag and inserts the handle only on successful start;
//! a service whose start failed is never published. The after-start phase
//! drains the publishers, so by the time any after-start hook runs, every key
//! for a started service is already visible.
//!
//! Keys are removed again in after-stop; a stopped service is not advertised
//! as available.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use bosun_system::error::BoxError;
use bosun_system::hook::{EntrypointHandle, Hook};
use bosun_system::service::{ServiceHandle, StartOp};

/// Prefix for context keys published by the registrar.
pub const CONTEXT_KEY_PREFIX: &str = "service__";

/// Returns the context key a service named `name` is published under.
#[must_use]
pub fn context_key(name: &str) -> String {
    format!("{CONTEXT_KEY_PREFIX}{name}")
}

/// Hook publishing started named services into the shared context.
///
/// # Example
///
/// ```ignore
/// entrypoint
///     .add_service(Database::connect(config))   // name() == Some("database")
///     .register(ContextRegistrar::default());
///
/// // later, in another service's start:
/// let database = context.get::<ServiceHandle>("service__database");
/// ```
#[derive(Default)]
pub struct ContextRegistrar {
    publishers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    /// Wrapped handles with the operation that was current before our
    /// decorator, so cleanup can reinstall it without discarding decorators
    /// installed by earlier hooks.
    wrapped: Mutex<Vec<(Arc<ServiceHandle>, StartOp)>>,
    published: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ContextRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistrar")
            .field("wrapped", &self.wrapped.lock().len())
            .field("published", &*self.published.lock())
            .finish()
    }
}

impl ContextRegistrar {
    /// Creates the hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Hook for ContextRegistrar {
    async fn before_start(
        &self,
        entrypoint: &EntrypointHandle,
        services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        let mut wrapped = self.wrapped.lock();
        let mut published = self.published.lock();

        for service in services {
            let Some(name) = service.name() else {
                continue;
            };
            let key = context_key(name);
            published.push(key.clone());

            let context = entrypoint.context().clone();
            let handle = Arc::clone(service);
            let publishers = Arc::clone(&self.publishers);
            let previous = service.start_op();
            service.wrap_start(move |inner| {
                Arc::new(move || {
                    let inner = Arc::clone(&inner);
                    let context = context.clone();
                    let handle = Arc::clone(&handle);
                    let key = key.clone();
                    let ready = handle.ready();
                    publishers.lock().push(tokio::spawn(async move {
                        // Failed starts are never published.
                        if ready.wait().await.is_ok() {
                            tracing::debug!(key = %key, "service published in context");
                            context.insert_arc(key, handle);
                        }
                    }));
                    // Startup is not gated on publication; only the original
                    // start body is awaited.
                    Box::pin(async move { inner().await })
                })
            });
            wrapped.push((Arc::clone(service), previous));
        }
        Ok(())
    }

    async fn after_start(
        &self,
        _entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        // All readiness flags are terminal once the start phase has settled,
        // so the publishers finish on their own. Draining them here makes
        // every publication visible to the remaining after-start hooks.
        let publishers: Vec<_> = self.publishers.lock().drain(..).collect();
        for publisher in publishers {
            publisher.await?;
        }

        // The wrappers have done their job once the start phase is over.
        // Reinstalling the pre-wrap operation removes only our decorator;
        // wrappers installed by earlier hooks (e.g. a dependency chain)
        // stay in place until their own cleanup runs.
        for (service, previous) in self.wrapped.lock().drain(..) {
            service.wrap_start(move |_decorated| previous);
        }
        Ok(())
    }

    async fn after_stop(&self, entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
        // Normally both lists were already drained in after-start; a run
        // that failed before or during its start phase skips that phase,
        // so finish the cleanup here. Other hooks reset their own wrappers
        // on this path too, so a full restore is safe.
        for (service, _previous) in self.wrapped.lock().drain(..) {
            service.restore_start();
        }
        for publisher in self.publishers.lock().drain(..) {
            publisher.abort();
        }

        let context = entrypoint.context();
        for key in self.published.lock().drain(..) {
            if context.remove(&key) {
                tracing::debug!(key = %key, "service removed from context");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_key_prefixes_name() {
        assert_eq!(context_key("database"), "service__database");
    }
}
