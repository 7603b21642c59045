//! Signal bridge.
//!
//! [`SignalBridge`] converts OS termination signals into a single internal
//! shutdown request for a `run_forever` workload. One waiter task watches the
//! per-run shutdown flag and requests the entrypoint to stop; one listener
//! task per configured [`TermSignal`] logs the received signal and sets the
//! flag. The flag is set-once, so duplicate signal delivery is idempotently
//! ignored.
//!
//! All tasks the bridge spawns are reaped in after-stop: anything still
//! running is cancelled and awaited, so no background task outlives the run.
//!
//! [`SignalBridge::trigger`] sets the shutdown flag directly, which is how
//! tests (and programmatic shutdown) drive the bridge without raising real
//! OS signals.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use bosun_system::error::BoxError;
use bosun_system::flag::Flag;
use bosun_system::hook::{EntrypointHandle, Hook};
use bosun_system::service::ServiceHandle;

// ─────────────────────────────────────────────────────────────────────────────
// TermSignal
// ─────────────────────────────────────────────────────────────────────────────

/// Termination signal kinds the bridge can listen for.
///
/// An explicit enum rather than raw signal numbers, so the dispatch from an
/// arriving signal to its handler is a direct mapping with no late-binding
/// hazards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    /// Interactive interrupt (SIGINT / Ctrl-C).
    Interrupt,
    /// Termination request (SIGTERM).
    Terminate,
    /// Controlling terminal closed (SIGHUP).
    Hangup,
    /// Quit request (SIGQUIT).
    Quit,
}

impl TermSignal {
    /// The conventional default pair: terminate and interrupt.
    pub const DEFAULT: [TermSignal; 2] = [TermSignal::Terminate, TermSignal::Interrupt];

    #[cfg(unix)]
    fn to_os(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            TermSignal::Interrupt => SignalKind::interrupt(),
            TermSignal::Terminate => SignalKind::terminate(),
            TermSignal::Hangup => SignalKind::hangup(),
            TermSignal::Quit => SignalKind::quit(),
        }
    }
}

impl fmt::Display for TermSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermSignal::Interrupt => "SIGINT",
            TermSignal::Terminate => "SIGTERM",
            TermSignal::Hangup => "SIGHUP",
            TermSignal::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SignalBridge
// ─────────────────────────────────────────────────────────────────────────────

/// Hook translating termination signals into one graceful shutdown request.
///
/// # Example
///
/// ```ignore
/// let mut entrypoint = Entrypoint::new();
/// entrypoint
///     .add_service(server)
///     .register(SignalBridge::default());
/// entrypoint.run_forever().await?;   // returns on SIGTERM or SIGINT
/// ```
pub struct SignalBridge {
    signals: Vec<TermSignal>,
    shutdown: Mutex<Flag>,
    waiter: Mutex<Option<JoinHandle<()>>>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for SignalBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBridge")
            .field("signals", &self.signals)
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

impl Default for SignalBridge {
    fn default() -> Self {
        Self::new(TermSignal::DEFAULT)
    }
}

impl SignalBridge {
    /// Creates a bridge listening for the given signal kinds.
    ///
    /// An empty set falls back to [`TermSignal::DEFAULT`].
    #[must_use]
    pub fn new(signals: impl IntoIterator<Item = TermSignal>) -> Self {
        let mut signals: Vec<TermSignal> = signals.into_iter().collect();
        if signals.is_empty() {
            signals = TermSignal::DEFAULT.to_vec();
        }
        Self {
            signals,
            shutdown: Mutex::new(Flag::new()),
            waiter: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Sets the shutdown flag as if a signal had been received.
    ///
    /// Idempotent; returns `true` if this call performed the transition.
    pub fn trigger(&self) -> bool {
        self.shutdown.lock().set()
    }

    /// Returns `true` if shutdown has been requested this run.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.shutdown.lock().is_set()
    }

    /// Number of background tasks the bridge currently owns.
    ///
    /// Zero outside a run: everything spawned in before-start is reaped in
    /// after-stop.
    #[must_use]
    pub fn task_count(&self) -> usize {
        usize::from(self.waiter.lock().is_some()) + self.listeners.lock().len()
    }

    #[cfg(unix)]
    fn spawn_listeners(&self, shutdown: &Flag) {
        let mut listeners = self.listeners.lock();
        for kind in self.signals.iter().copied() {
            let shutdown = shutdown.clone();
            listeners.push(tokio::spawn(async move {
                let mut stream = match tokio::signal::unix::signal(kind.to_os()) {
                    Ok(stream) => stream,
                    Err(error) => {
                        tracing::error!(signal = %kind, %error, "failed to install signal listener");
                        return;
                    }
                };
                if stream.recv().await.is_some() {
                    tracing::info!(signal = %kind, "received termination signal");
                    if !shutdown.set() {
                        tracing::debug!(signal = %kind, "shutdown already requested");
                    }
                }
            }));
        }
    }

    #[cfg(not(unix))]
    fn spawn_listeners(&self, _shutdown: &Flag) {
        tracing::warn!("OS signal wiring is only supported on unix; use trigger() instead");
    }
}

#[async_trait]
impl Hook for SignalBridge {
    async fn before_start(
        &self,
        entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        // Fresh shutdown flag per run.
        let shutdown = Flag::new();
        *self.shutdown.lock() = shutdown.clone();

        let handle = entrypoint.clone();
        let waited = shutdown.clone();
        *self.waiter.lock() = Some(tokio::spawn(async move {
            // The flag is only ever set, never failed.
            if waited.wait().await.is_ok() {
                // Deferred stop: let already-scheduled tasks run first.
                tokio::task::yield_now().await;
                handle.request_stop();
            }
        }));

        self.spawn_listeners(&shutdown);
        Ok(())
    }

    async fn after_stop(&self, _entrypoint: &EntrypointHandle) -> Result<(), BoxError> {
        let mut tasks: Vec<JoinHandle<()>> = self.listeners.lock().drain(..).collect();
        if let Some(waiter) = self.waiter.lock().take() {
            tasks.push(waiter);
        }
        for task in tasks {
            if !task.is_finished() {
                task.abort();
            }
            match task.await {
                Ok(()) => {}
                // Cancellation during teardown is expected, not an error.
                Err(error) if error.is_cancelled() => {}
                Err(error) => return Err(Box::new(error)),
            }
        }
        tracing::trace!("signal bridge tasks reaped");
        Ok(())
    }
}
