//! The hook pipeline.
//!
//! The [`Entrypoint`] is the central runtime that orchestrates service
//! lifecycles. It is intentionally minimal — just a hook pipeline around a
//! concurrent start/stop of a fixed set of services.
//!
//! # Philosophy
//!
//! **Coordination lives in hooks.** A bare entrypoint starts all services
//! concurrently, runs the workload, and stops them concurrently, with no
//! ordering guarantees between services. Everything else — dependency
//! ordering, signal handling, context publication — is installed by
//! registered [`Hook`]s.
//!
//! # Lifecycle
//!
//! One run executes exactly seven steps, each at most once:
//!
//! 1. Every hook's `before_start`, in registration order
//! 2. Concurrent start of all services
//! 3. Every hook's `after_start`, in registration order
//! 4. The workload (a future, or wait-for-shutdown)
//! 5. Every hook's `before_stop`, in registration order
//! 6. Concurrent stop of all services
//! 7. Every hook's `after_stop`, in registration order
//!
//! A hook failure aborts the remaining hooks of its phase and surfaces to
//! the caller; a failure anywhere before step 4 prevents the workload from
//! running. The stop sequence (steps 5-7) is best-effort on every path: a
//! failing before-stop hook or service stop does not skip the remaining
//! teardown phases, so wrappers are removed and background tasks are reaped,
//! and the first error is the one surfaced.
//!
//! # Example
//!
//! ```ignore
//! let mut entrypoint = Entrypoint::new();
//! entrypoint
//!     .add_service(Database::connect(config))
//!     .add_service(HttpServer::new(addr))
//!     .register(DependencyChain::default());
//! entrypoint.run_forever().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future;

use crate::context::Context;
use crate::error::EntrypointError;
use crate::hook::{EntrypointHandle, Hook, Phase};
use crate::logging::LoggingConfig;
use crate::service::{Service, ServiceHandle, StopReason};

/// The runtime that drives the four-phase lifecycle over an ordered set of
/// services and hooks.
///
/// Services and hooks are both kept in registration order; the order of
/// services is what the dependency chain hook derives its linear
/// predecessor/successor relation from.
#[derive(Default)]
pub struct Entrypoint {
    /// One handle per registered service, in registration order.
    services: Vec<Arc<ServiceHandle>>,

    /// Registered hooks, in registration order.
    hooks: Vec<Arc<dyn Hook>>,

    /// The shared context handed to hooks and services.
    context: Context,

    /// Optional logging configuration, applied at the top of a run.
    logging: Option<LoggingConfig>,
}

impl Entrypoint {
    /// Creates an empty entrypoint with a fresh [`Context`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entrypoint over an externally-owned context.
    #[must_use]
    pub fn with_context(context: Context) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a service to the ordered service list.
    pub fn add_service<S: Service>(&mut self, service: S) -> &mut Self {
        self.add_service_arc(Arc::new(service))
    }

    /// Appends an already-shared service to the ordered service list.
    pub fn add_service_arc(&mut self, service: Arc<dyn Service>) -> &mut Self {
        let index = self.services.len();
        self.services
            .push(Arc::new(ServiceHandle::new(index, service, self.context.clone())));
        self
    }

    /// Appends a hook to the ordered hook list.
    pub fn register<H: Hook>(&mut self, hook: H) -> &mut Self {
        self.register_arc(Arc::new(hook))
    }

    /// Appends an already-shared hook to the ordered hook list.
    ///
    /// Useful when the caller needs to keep a handle to the hook, e.g. to
    /// trigger a signal bridge manually.
    pub fn register_arc(&mut self, hook: Arc<dyn Hook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    /// Sets the logging configuration applied at the top of a run.
    pub fn with_logging(&mut self, config: LoggingConfig) -> &mut Self {
        self.logging = Some(config);
        self
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The ordered service list.
    #[must_use]
    pub fn services(&self) -> &[Arc<ServiceHandle>] {
        &self.services
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Running
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs the lifecycle around `workload` and returns its output.
    ///
    /// The workload runs between the after-start and before-stop phases;
    /// once it completes, teardown begins.
    pub async fn run_until_complete<F: Future>(
        &mut self,
        workload: F,
    ) -> Result<F::Output, EntrypointError> {
        let handle = EntrypointHandle::new(self.context.clone());
        self.execute(handle, workload).await
    }

    /// Runs the lifecycle and blocks until a stop is requested.
    ///
    /// A stop is requested through [`EntrypointHandle::request_stop`],
    /// typically by a signal bridge hook reacting to a termination signal.
    pub async fn run_forever(&mut self) -> Result<(), EntrypointError> {
        let handle = EntrypointHandle::new(self.context.clone());
        let stop = handle.stop_requested();
        self.execute(handle, async move {
            // The stop flag is only ever set, never failed.
            let _ = stop.wait().await;
        })
        .await
    }

    async fn execute<F: Future>(
        &mut self,
        handle: EntrypointHandle,
        workload: F,
    ) -> Result<F::Output, EntrypointError> {
        if let Some(config) = &self.logging {
            config.init();
        }

        // A previous run aborted mid-teardown must not leak wrappers into
        // this one.
        for service in &self.services {
            service.reset_for_run();
        }

        if let Err(error) = self.startup(&handle).await {
            tracing::error!(%error, "startup failed, tearing down");
            self.teardown_after_failure(&handle, &error).await;
            return Err(error);
        }

        tracing::debug!("entering workload");
        let output = workload.await;
        tracing::debug!("workload finished");

        self.stop_sequence(&handle, StopReason::Normal).await?;

        Ok(output)
    }

    async fn startup(&self, handle: &EntrypointHandle) -> Result<(), EntrypointError> {
        self.run_hooks(Phase::BeforeStart, handle).await?;
        self.start_services().await?;
        self.run_hooks(Phase::AfterStart, handle).await?;
        Ok(())
    }

    /// Stop sequence after a startup failure.
    ///
    /// Failures here are logged, not surfaced; the caller reports the
    /// original error.
    async fn teardown_after_failure(&self, handle: &EntrypointHandle, cause: &EntrypointError) {
        if let Err(error) = self
            .stop_sequence(handle, StopReason::Failed(cause.to_string()))
            .await
        {
            tracing::error!(%error, "teardown after startup failure reported an error");
        }
    }

    /// Runs the before-stop, stop, and after-stop phases in order.
    ///
    /// Every phase runs even when an earlier one failed, so hooks always get
    /// their after-stop cleanup and background tasks are reaped. The first
    /// error is returned once teardown is complete; later failures are
    /// logged and suppressed.
    async fn stop_sequence(
        &self,
        handle: &EntrypointHandle,
        reason: StopReason,
    ) -> Result<(), EntrypointError> {
        let mut first_error = None;
        if let Err(error) = self.run_hooks(Phase::BeforeStop, handle).await {
            Self::record_stop_error(&mut first_error, error);
        }
        if let Err(error) = self.stop_services(reason).await {
            Self::record_stop_error(&mut first_error, error);
        }
        if let Err(error) = self.run_hooks(Phase::AfterStop, handle).await {
            Self::record_stop_error(&mut first_error, error);
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn record_stop_error(first: &mut Option<EntrypointError>, error: EntrypointError) {
        if first.is_some() {
            tracing::error!(%error, "additional failure during stop sequence");
        } else {
            *first = Some(error);
        }
    }

    async fn run_hooks(
        &self,
        phase: Phase,
        handle: &EntrypointHandle,
    ) -> Result<(), EntrypointError> {
        for hook in &self.hooks {
            tracing::debug!(hook = hook.name(), %phase, "running lifecycle hook");
            let result = match phase {
                Phase::BeforeStart => hook.before_start(handle, &self.services).await,
                Phase::AfterStart => hook.after_start(handle, &self.services).await,
                Phase::BeforeStop => hook.before_stop(handle).await,
                Phase::AfterStop => hook.after_stop(handle).await,
            };
            result.map_err(|source| EntrypointError::Hook {
                hook: hook.name().to_owned(),
                phase,
                source,
            })?;
        }
        Ok(())
    }

    /// Starts all services concurrently.
    ///
    /// Every start operation is awaited to completion even when some fail;
    /// each service's readiness flag is set on success and failed on error,
    /// so chained waiters never hang. The first failure in registration
    /// order is returned.
    async fn start_services(&self) -> Result<(), EntrypointError> {
        let starts = self.services.iter().map(|service| {
            let service = Arc::clone(service);
            let op = service.start_op();
            async move {
                match op().await {
                    Ok(()) => {
                        service.ready().set();
                        tracing::debug!(service = service.label(), "service started");
                        Ok(())
                    }
                    Err(source) => {
                        service.ready().fail();
                        tracing::error!(
                            service = service.label(),
                            error = %source,
                            "service failed to start"
                        );
                        Err(EntrypointError::ServiceStart {
                            service: service.label().to_owned(),
                            source,
                        })
                    }
                }
            }
        });

        for result in future::join_all(starts).await {
            result?;
        }
        Ok(())
    }

    /// Stops all services concurrently.
    ///
    /// Every stop operation is awaited to completion; the first failure in
    /// registration order is returned.
    async fn stop_services(&self, reason: StopReason) -> Result<(), EntrypointError> {
        let stops = self.services.iter().map(|service| {
            let service = Arc::clone(service);
            let op = service.stop_op();
            let reason = reason.clone();
            async move {
                match op(reason).await {
                    Ok(()) => {
                        tracing::debug!(service = service.label(), "service stopped");
                        Ok(())
                    }
                    Err(source) => {
                        tracing::error!(
                            service = service.label(),
                            error = %source,
                            "service failed to stop"
                        );
                        Err(EntrypointError::ServiceStop {
                            service: service.label().to_owned(),
                            source,
                        })
                    }
                }
            }
        });

        for result in future::join_all(stops).await {
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Shared event log for ordering assertions.
    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<String>>>);

    impl EventLog {
        fn push(&self, event: impl Into<String>) {
            self.0.lock().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    struct LoggingService {
        log: EventLog,
    }

    #[async_trait]
    impl Service for LoggingService {
        async fn start(&self, _context: &Context) -> Result<(), BoxError> {
            self.log.push("service start");
            Ok(())
        }

        async fn stop(&self, _reason: StopReason) -> Result<(), BoxError> {
            self.log.push("service stop");
            Ok(())
        }
    }

    struct LoggingHook {
        tag: &'static str,
        log: EventLog,
    }

    #[async_trait]
    impl Hook for LoggingHook {
        fn name(&self) -> &str {
            self.tag
        }

        async fn before_start(
            &self,
            _entrypoint: &EntrypointHandle,
            _services: &[Arc<ServiceHandle>],
        ) -> Result<(), BoxError> {
            self.log.push(format!("{} before-start", self.tag));
            Ok(())
        }

        async fn after_start(
            &self,
            _entrypoint: &EntrypointHandle,
            _services: &[Arc<ServiceHandle>],
        ) -> Result<(), BoxError> {
            self.log.push(format!("{} after-start", self.tag));
            Ok(())
        }

        async fn before_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
            self.log.push(format!("{} before-stop", self.tag));
            Ok(())
        }

        async fn after_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
            self.log.push(format!("{} after-stop", self.tag));
            Ok(())
        }
    }

    #[tokio::test]
    async fn phases_run_in_order() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(LoggingService { log: log.clone() })
            .register(LoggingHook {
                tag: "h1",
                log: log.clone(),
            });

        let workload_log = log.clone();
        entrypoint
            .run_until_complete(async move { workload_log.push("workload") })
            .await
            .unwrap();

        assert_eq!(
            log.events(),
            vec![
                "h1 before-start",
                "service start",
                "h1 after-start",
                "workload",
                "h1 before-stop",
                "service stop",
                "h1 after-stop",
            ]
        );
    }

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        for tag in ["h1", "h2", "h3"] {
            entrypoint.register(LoggingHook {
                tag,
                log: log.clone(),
            });
        }

        entrypoint.run_until_complete(async {}).await.unwrap();

        let events = log.events();
        assert_eq!(
            &events[..3],
            &["h1 before-start", "h2 before-start", "h3 before-start"]
        );
        assert_eq!(
            &events[events.len() - 3..],
            &["h1 after-stop", "h2 after-stop", "h3 after-stop"]
        );
    }

    struct FailingHook;

    #[async_trait]
    impl Hook for FailingHook {
        fn name(&self) -> &str {
            "failing"
        }

        async fn before_start(
            &self,
            _entrypoint: &EntrypointHandle,
            _services: &[Arc<ServiceHandle>],
        ) -> Result<(), BoxError> {
            Err("broken wiring".into())
        }
    }

    #[tokio::test]
    async fn failing_hook_prevents_workload_and_later_hooks() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint.register(FailingHook).register(LoggingHook {
            tag: "h2",
            log: log.clone(),
        });

        let workload_log = log.clone();
        let result = entrypoint
            .run_until_complete(async move { workload_log.push("workload") })
            .await;

        let error = result.unwrap_err();
        assert!(matches!(
            error,
            EntrypointError::Hook {
                phase: Phase::BeforeStart,
                ..
            }
        ));
        // h2's before-start never ran, and neither did the workload. The
        // teardown phases still did.
        assert_eq!(log.events(), vec!["h2 before-stop", "h2 after-stop"]);
    }

    struct FailingService;

    #[async_trait]
    impl Service for FailingService {
        fn name(&self) -> Option<&str> {
            Some("flaky")
        }

        async fn start(&self, _context: &Context) -> Result<(), BoxError> {
            Err("no disk".into())
        }
    }

    #[tokio::test]
    async fn failing_start_surfaces_and_stops_services() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(LoggingService { log: log.clone() })
            .add_service(FailingService);

        let workload_log = log.clone();
        let result = entrypoint
            .run_until_complete(async move { workload_log.push("workload") })
            .await;

        match result.unwrap_err() {
            EntrypointError::ServiceStart { service, .. } => assert_eq!(service, "flaky"),
            other => panic!("unexpected error: {other}"),
        }
        // Started services were still stopped; the workload never ran.
        assert_eq!(log.events(), vec!["service start", "service stop"]);

        // The failing service's readiness flag reached its terminal state.
        assert_eq!(
            entrypoint.services()[1].ready().state(),
            crate::flag::FlagState::Failed
        );
    }

    struct StubbornService;

    #[async_trait]
    impl Service for StubbornService {
        fn name(&self) -> Option<&str> {
            Some("stubborn")
        }

        async fn start(&self, _context: &Context) -> Result<(), BoxError> {
            Ok(())
        }

        async fn stop(&self, _reason: StopReason) -> Result<(), BoxError> {
            Err("drain timed out".into())
        }
    }

    #[tokio::test]
    async fn failed_stop_still_runs_after_stop_hooks() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint.add_service(StubbornService).register(LoggingHook {
            tag: "h1",
            log: log.clone(),
        });

        let result = entrypoint.run_until_complete(async {}).await;

        match result.unwrap_err() {
            EntrypointError::ServiceStop { service, .. } => assert_eq!(service, "stubborn"),
            other => panic!("unexpected error: {other}"),
        }
        // The after-stop phase still ran despite the stop failure.
        assert!(log.events().contains(&"h1 after-stop".to_owned()));
    }

    #[tokio::test]
    async fn failed_before_stop_hook_still_stops_services_and_runs_after_stop() {
        struct FailingBeforeStop;

        #[async_trait]
        impl Hook for FailingBeforeStop {
            fn name(&self) -> &str {
                "grumpy"
            }

            async fn before_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
                Err("flush failed".into())
            }
        }

        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(LoggingService { log: log.clone() })
            .register(FailingBeforeStop)
            .register(LoggingHook {
                tag: "h2",
                log: log.clone(),
            });

        let error = entrypoint.run_until_complete(async {}).await.unwrap_err();
        assert!(matches!(
            error,
            EntrypointError::Hook {
                phase: Phase::BeforeStop,
                ..
            }
        ));
        // h2's before-stop was aborted with its phase, but the services
        // were still stopped and the after-stop phase still ran.
        let events = log.events();
        assert!(!events.contains(&"h2 before-stop".to_owned()));
        assert!(events.contains(&"service stop".to_owned()));
        assert!(events.contains(&"h2 after-stop".to_owned()));
    }

    #[tokio::test]
    async fn run_forever_returns_after_stop_request() {
        struct StopOnStart;

        #[async_trait]
        impl Hook for StopOnStart {
            async fn after_start(
                &self,
                entrypoint: &EntrypointHandle,
                _services: &[Arc<ServiceHandle>],
            ) -> Result<(), BoxError> {
                let handle = entrypoint.clone();
                tokio::spawn(async move {
                    handle.request_stop();
                });
                Ok(())
            }
        }

        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint
            .add_service(LoggingService { log: log.clone() })
            .register(StopOnStart);

        entrypoint.run_forever().await.unwrap();
        assert_eq!(log.events(), vec!["service start", "service stop"]);
    }

    #[tokio::test]
    async fn second_run_starts_clean() {
        let log = EventLog::default();
        let mut entrypoint = Entrypoint::new();
        entrypoint.add_service(LoggingService { log: log.clone() });

        entrypoint.run_until_complete(async {}).await.unwrap();
        entrypoint.run_until_complete(async {}).await.unwrap();

        assert_eq!(
            log.events(),
            vec![
                "service start",
                "service stop",
                "service start",
                "service stop"
            ]
        );
        assert!(!entrypoint.services()[0].is_start_wrapped());
    }

    #[tokio::test]
    async fn context_is_shared_with_services() {
        struct Writer;

        #[async_trait]
        impl Service for Writer {
            async fn start(&self, context: &Context) -> Result<(), BoxError> {
                context.insert("written", true);
                Ok(())
            }
        }

        let mut entrypoint = Entrypoint::new();
        entrypoint.add_service(Writer);
        entrypoint.run_until_complete(async {}).await.unwrap();
        assert_eq!(*entrypoint.context().get::<bool>("written").unwrap(), true);
    }
}
