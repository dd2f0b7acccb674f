//! Bound on concurrently running classifier processes.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of classifier processes allowed at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// The limiter was closed and hands out no more permits.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("process limiter closed")]
pub struct LimiterClosed;

/// Shared semaphore capping how many classifier processes exist at once.
///
/// Clones share the same budget.
#[derive(Debug, Clone)]
pub struct ProcessLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: NonZeroUsize,
}

impl ProcessLimiter {
    /// Creates a limiter allowing `max_concurrent` processes.
    #[must_use]
    pub fn new(max_concurrent: NonZeroUsize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.get())),
            max_concurrent,
        }
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn max_concurrent(&self) -> NonZeroUsize {
        self.max_concurrent
    }

    /// Returns the number of processes that could start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a slot. The slot is released when the permit drops.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterClosed`] once [`ProcessLimiter::close`] was called.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, LimiterClosed> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| LimiterClosed)
    }

    /// Stops handing out permits; pending and future waits fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for ProcessLimiter {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_MAX_CONCURRENT).expect("non-zero"))
    }
}
