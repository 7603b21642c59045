//! Dependency chain coordination.
//!
//! [`DependencyChain`] makes the entrypoint's framework-concurrent start and
//! stop behave as if services started strictly in registration order and
//! stopped in strict reverse order. The dependency relation is linear: the
//! predecessor of service *i* is service *i-1*, its successor is service
//! *i+1*, recomputed fresh from the service order every run.
//!
//! Rather than serializing the start phase behind a global lock, the hook
//! gates only adjacent pairs: every start operation is decorated to wait for
//! its predecessor's readiness flag, every stop operation to wait for its
//! successor's per-run stop flag. All wrapped operations still run
//! concurrently, so the net effect is causally ordered completion without
//! serializing the event loop.
//!
//! If a predecessor's start fails, its readiness flag reaches the terminal
//! failed state and the successor fails fast with
//! [`ChainError::PredecessorFailed`] instead of waiting forever.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use bosun_system::error::BoxError;
use bosun_system::flag::Flag;
use bosun_system::hook::{EntrypointHandle, Hook};
use bosun_system::service::ServiceHandle;

/// Errors produced by the dependency chain wrappers.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The predecessor's start operation failed, so this service's start
    /// can never be released.
    #[error("predecessor '{predecessor}' never became ready")]
    PredecessorFailed {
        /// Label of the failed predecessor.
        predecessor: String,
    },
}

/// Hook enforcing first-registered-starts-first, last-registered-stops-first
/// ordering across all registered services.
///
/// Holds no state between runs beyond the handles it wrapped, which it
/// unwraps again in after-stop. A single registered service needs no
/// ordering; the hook then installs nothing at all.
///
/// # Example
///
/// ```ignore
/// entrypoint
///     .add_service(database)   // starts first, stops last
///     .add_service(cache)
///     .add_service(http)       // starts last, stops first
///     .register(DependencyChain::default());
/// ```
#[derive(Debug, Default)]
pub struct DependencyChain {
    wrapped: Mutex<Vec<Arc<ServiceHandle>>>,
}

impl DependencyChain {
    /// Creates the hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Hook for DependencyChain {
    async fn before_start(
        &self,
        _entrypoint: &EntrypointHandle,
        services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        if services.len() < 2 {
            return Ok(());
        }

        // One stop flag per service per run, set once that service's own
        // stop operation has completed.
        let stop_flags: Vec<Flag> = services.iter().map(|_| Flag::new()).collect();

        for (index, service) in services.iter().enumerate() {
            let predecessor = index
                .checked_sub(1)
                .map(|i| (services[i].label().to_owned(), services[i].ready()));
            service.wrap_start(move |inner| {
                Arc::new(move || {
                    let inner = Arc::clone(&inner);
                    let predecessor = predecessor.clone();
                    Box::pin(async move {
                        if let Some((label, ready)) = predecessor {
                            ready.wait().await.map_err(|_| ChainError::PredecessorFailed {
                                predecessor: label,
                            })?;
                        }
                        inner().await
                    })
                })
            });

            let own_stopped = stop_flags[index].clone();
            let successor_stopped = stop_flags.get(index + 1).cloned();
            service.wrap_stop(move |inner| {
                Arc::new(move |reason| {
                    let inner = Arc::clone(&inner);
                    let own_stopped = own_stopped.clone();
                    let successor_stopped = successor_stopped.clone();
                    Box::pin(async move {
                        if let Some(stopped) = successor_stopped {
                            // Stop flags are only ever set, never failed.
                            let _ = stopped.wait().await;
                        }
                        let result = inner(reason).await;
                        // Set even when the real stop errored, so the
                        // predecessor is never stranded waiting.
                        own_stopped.set();
                        result
                    })
                })
            });
        }

        *self.wrapped.lock() = services.to_vec();
        tracing::debug!(services = services.len(), "dependency chain installed");
        Ok(())
    }

    async fn after_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
        let wrapped: Vec<_> = self.wrapped.lock().drain(..).collect();
        for service in &wrapped {
            service.restore_start();
            service.restore_stop();
        }
        if !wrapped.is_empty() {
            tracing::debug!(services = wrapped.len(), "dependency chain removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosun_system::context::Context;
    use bosun_system::entrypoint::Entrypoint;
    use bosun_system::service::{Service, StopReason};

    struct Quiet;

    #[async_trait]
    impl Service for Quiet {
        async fn start(&self, _context: &Context) -> Result<(), BoxError> {
            Ok(())
        }

        async fn stop(&self, _reason: StopReason) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct WrapProbe {
        observed: Arc<Mutex<Vec<(bool, bool)>>>,
    }

    #[async_trait]
    impl Hook for WrapProbe {
        async fn after_start(
            &self,
            _entrypoint: &EntrypointHandle,
            services: &[Arc<ServiceHandle>],
        ) -> Result<(), BoxError> {
            *self.observed.lock() = services
                .iter()
                .map(|s| (s.is_start_wrapped(), s.is_stop_wrapped()))
                .collect();
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_service_is_not_wrapped() {
        let observed = Arc::new(Mutex::new(Vec::new()));
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(Quiet)
            .register(DependencyChain::new())
            .register(WrapProbe {
                observed: Arc::clone(&observed),
            });

        entrypoint.run_until_complete(async {}).await.unwrap();
        assert_eq!(observed.lock().as_slice(), &[(false, false)]);
    }

    #[tokio::test]
    async fn two_services_are_wrapped_then_restored() {
        let observed = Arc::new(Mutex::new(Vec::new()));
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(Quiet)
            .add_service(Quiet)
            .register(DependencyChain::new())
            .register(WrapProbe {
                observed: Arc::clone(&observed),
            });

        entrypoint.run_until_complete(async {}).await.unwrap();

        // Wrapped while running...
        assert_eq!(observed.lock().as_slice(), &[(true, true), (true, true)]);
        // ...restored after the run.
        for service in entrypoint.services() {
            assert!(!service.is_start_wrapped());
            assert!(!service.is_stop_wrapped());
        }
    }
}
