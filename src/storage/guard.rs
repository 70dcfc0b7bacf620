//! Write guard serializing mutations against one store
//!
//! A single-permit semaphore owned by the store. Mutations hold a
//! [`WritePermit`] for the whole load-mutate-save cycle; the permit is
//! returned when it is dropped, on every exit path.

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use super::StoreError;

/// Single-writer guard for a store instance
#[derive(Debug)]
pub struct WriteGuard {
    permits: Semaphore,
}

/// Exclusive write access, released on drop
#[derive(Debug)]
pub struct WritePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl Default for WriteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteGuard {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
        }
    }

    /// Waits for exclusive write access.
    ///
    /// Returns [`StoreError::Cancelled`] if `cancel` fires before the permit
    /// is granted.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<WritePermit<'_>, StoreError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            permit = self.permits.acquire() => {
                // The semaphore is never closed while the guard is alive
                let permit = permit.map_err(|_| StoreError::Cancelled)?;
                Ok(WritePermit { _permit: permit })
            }
        }
    }

    /// Returns true if no writer currently holds the guard
    pub fn is_idle(&self) -> bool {
        self.permits.available_permits() == 1
    }
}
