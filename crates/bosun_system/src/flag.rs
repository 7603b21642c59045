//! Set-once waitable signals.
//!
//! A [`Flag`] is the coordination primitive everything else in Bosun is built
//! on: readiness signals, per-run stop signals, and the shutdown request are
//! all flags. A flag starts out pending and makes exactly one transition, to
//! either [`FlagState::Set`] or [`FlagState::Failed`]; it never resets.
//!
//! Flags are single-writer-many-reader: any number of tasks may wait on the
//! same flag, and all of them are released by the one transition. Waiting on
//! a failed flag returns an error immediately instead of suspending forever —
//! this is how a service whose predecessor failed to start avoids hanging.
//!
//! # Example
//!
//! ```
//! use bosun_system::flag::Flag;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let flag = Flag::new();
//! let waiter = flag.clone();
//!
//! let task = tokio::spawn(async move { waiter.wait().await });
//! assert!(flag.set());
//! assert!(task.await.unwrap().is_ok());
//! # });
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

// ─────────────────────────────────────────────────────────────────────────────
// FlagState
// ─────────────────────────────────────────────────────────────────────────────

/// The observable state of a [`Flag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagState {
    /// The flag has not been set yet.
    #[default]
    Pending,
    /// The flag was set; every waiter is released successfully.
    Set,
    /// The flag can never be set; every waiter is released with an error.
    Failed,
}

/// Error returned when waiting on a flag that can never be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal can never be set")]
pub struct FlagError;

// ─────────────────────────────────────────────────────────────────────────────
// Flag
// ─────────────────────────────────────────────────────────────────────────────

/// A set-once, waitable signal.
///
/// Cloning a `Flag` produces another handle to the same signal; all clones
/// observe the same single transition.
#[derive(Debug, Clone)]
pub struct Flag {
    state: Arc<watch::Sender<FlagState>>,
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

impl Flag {
    /// Creates a new pending flag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::channel(FlagState::Pending).0),
        }
    }

    /// Sets the flag, releasing all waiters.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// flag had already left the pending state. Setting twice is not an
    /// error; the second call is a no-op.
    pub fn set(&self) -> bool {
        self.transition(FlagState::Set)
    }

    /// Marks the flag as impossible to set, releasing all waiters with
    /// [`FlagError`].
    ///
    /// Returns `true` if this call performed the transition.
    pub fn fail(&self) -> bool {
        self.transition(FlagState::Failed)
    }

    fn transition(&self, to: FlagState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == FlagState::Pending {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Returns the current state without waiting.
    #[must_use]
    pub fn state(&self) -> FlagState {
        *self.state.borrow()
    }

    /// Returns `true` if the flag has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state() == FlagState::Set
    }

    /// Waits until the flag leaves the pending state.
    ///
    /// Returns `Ok(())` once the flag is set, or [`FlagError`] if the flag
    /// was marked failed. Completes immediately if the transition has
    /// already happened.
    pub async fn wait(&self) -> Result<(), FlagError> {
        let mut rx = self.state.subscribe();
        let observed = *rx
            .wait_for(|state| *state != FlagState::Pending)
            .await
            // The sender lives inside `self`, so the channel cannot close
            // while we are borrowing it.
            .map_err(|_| FlagError)?;
        match observed {
            FlagState::Failed => Err(FlagError),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending() {
        let flag = Flag::new();
        assert_eq!(flag.state(), FlagState::Pending);
        assert!(!flag.is_set());
    }

    #[test]
    fn set_is_idempotent() {
        let flag = Flag::new();
        assert!(flag.set());
        assert!(!flag.set());
        assert!(flag.is_set());
    }

    #[test]
    fn fail_wins_over_later_set() {
        let flag = Flag::new();
        assert!(flag.fail());
        assert!(!flag.set());
        assert_eq!(flag.state(), FlagState::Failed);
    }

    #[tokio::test]
    async fn wait_completes_after_set() {
        let flag = Flag::new();
        let waiter = flag.clone();
        let task = tokio::spawn(async move { waiter.wait().await });
        tokio::task::yield_now().await;
        flag.set();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn wait_on_already_set_flag_is_immediate() {
        let flag = Flag::new();
        flag.set();
        assert!(flag.wait().await.is_ok());
    }

    #[tokio::test]
    async fn wait_errors_on_failed_flag() {
        let flag = Flag::new();
        flag.fail();
        assert_eq!(flag.wait().await, Err(FlagError));
    }

    #[tokio::test]
    async fn many_waiters_released_by_one_set() {
        let flag = Flag::new();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let waiter = flag.clone();
                tokio::spawn(async move { waiter.wait().await })
            })
            .collect();
        tokio::task::yield_now().await;
        flag.set();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
    }
}
