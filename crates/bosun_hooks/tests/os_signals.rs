//! Real OS signal delivery through the bridge.
//!
//! Lives in its own test binary: the process receives a real signal, and
//! the harness must not share that with unrelated tests.

#![cfg(unix)]

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bosun_hooks::prelude::*;
use bosun_system::prelude::*;

/// Sends `signal` to this process shortly after the pipeline is up.
struct RaiseSignal {
    signal: &'static str,
}

#[async_trait]
impl Hook for RaiseSignal {
    async fn after_start(
        &self,
        _entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        let signal = self.signal;
        tokio::spawn(async move {
            // Give the listener tasks time to install their handlers.
            tokio::time::sleep(Duration::from_millis(200)).await;
            let status = Command::new("kill")
                .args([signal, &std::process::id().to_string()])
                .status()
                .expect("kill is runnable");
            assert!(status.success());
        });
        Ok(())
    }
}

#[tokio::test]
async fn sigterm_terminates_run_forever_once() {
    let bridge = Arc::new(SignalBridge::default());

    let mut entrypoint = Entrypoint::new();
    entrypoint
        .register_arc(Arc::clone(&bridge) as Arc<dyn Hook>)
        .register(RaiseSignal { signal: "-TERM" });

    entrypoint.run_forever().await.unwrap();

    // The SIGTERM listener set the shutdown flag; the waiter stopped the
    // run, and after-stop reaped every bridge task (including the SIGINT
    // listener that never fired).
    assert!(bridge.is_triggered());
    assert_eq!(bridge.task_count(), 0);
}
