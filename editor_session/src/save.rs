//! Serialization of save requests.

use crate::error::WriteError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Result of a save request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The content reached the backing store.
    Saved,
    /// Another save was already in flight; this request was collapsed into it.
    AlreadySaving,
}

/// Admits at most one write at a time.
#[derive(Debug, Default)]
pub struct SaveArbiter {
    in_flight: AtomicBool,
    idle: Notify,
}

/// Clears the in-flight flag on every exit path, including panics and
/// the save future being dropped.
struct InFlightGuard<'a> {
    arbiter: &'a SaveArbiter,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.arbiter.in_flight.store(false, Ordering::SeqCst);
        self.arbiter.idle.notify_waiters();
    }
}

impl SaveArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a write is in flight.
    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs `write` unless another write is in flight.
    ///
    /// `write` resolves to `Ok(true)` on success and `Ok(false)` when the
    /// store refused the content. The flag is cleared before this returns.
    pub async fn try_save<F, Fut>(&self, write: F) -> Result<SaveOutcome, WriteError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, WriteError>>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Save already in flight, collapsing request");
            return Ok(SaveOutcome::AlreadySaving);
        }
        let guard = InFlightGuard { arbiter: self };
        let result = write().await;
        drop(guard);

        match result {
            Ok(true) => Ok(SaveOutcome::Saved),
            Ok(false) => Err(WriteError::Rejected),
            Err(e) => Err(e),
        }
    }

    /// Resolves once no write is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent clear is not missed
            notified.as_mut().enable();
            if !self.is_saving() {
                return;
            }
            notified.await;
        }
    }
}
