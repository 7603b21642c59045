//! Environment scrubbing.
//!
//! [`ClearEnviron`] removes selected environment variables before any service
//! starts. Secrets handed to the process via the environment (tokens, DSNs,
//! credentials) are consumed during configuration and should not remain
//! readable by every library and subprocess for the rest of the process
//! lifetime.
//!
//! The set of variables is snapshotted when the hook is constructed, so the
//! decision of *what* to scrub happens in plain synchronous code during
//! setup, not mid-pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use bosun_system::error::BoxError;
use bosun_system::hook::{EntrypointHandle, Hook};
use bosun_system::service::ServiceHandle;

/// Hook removing environment variables in the before-start phase.
///
/// # Example
///
/// ```ignore
/// // Scrub everything carrying credentials before services start.
/// entrypoint.register(ClearEnviron::matching(|key| {
///     key.ends_with("_TOKEN") || key.ends_with("_PASSWORD")
/// }));
/// ```
#[derive(Debug)]
pub struct ClearEnviron {
    keys: Vec<String>,
}

impl ClearEnviron {
    /// Snapshots the environment keys for which `filter` returns `true`.
    ///
    /// Keys that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn matching(filter: impl Fn(&str) -> bool) -> Self {
        let keys = std::env::vars_os()
            .filter_map(|(key, _)| key.into_string().ok())
            .filter(|key| filter(key))
            .collect();
        Self { keys }
    }

    /// Snapshots every environment key.
    #[must_use]
    pub fn all() -> Self {
        Self::matching(|_| true)
    }

    /// The keys that will be removed.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

#[async_trait]
impl Hook for ClearEnviron {
    async fn before_start(
        &self,
        _entrypoint: &EntrypointHandle,
        _services: &[Arc<ServiceHandle>],
    ) -> Result<(), BoxError> {
        for key in &self.keys {
            // SAFETY: this runs in the before-start phase, before any
            // service has started; the process must not have other threads
            // reading the environment concurrently at this point.
            unsafe { std::env::remove_var(key) };
            tracing::debug!(key = %key, "environment variable cleared");
        }
        Ok(())
    }
}
