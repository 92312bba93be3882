//! Byte-budget backpressure for the data buffer.
//!
//! Every chunk held by the data path owns a [`BudgetPermit`] for its length.
//! The permit returns its bytes to the [`BufferBudget`] when dropped, i.e.
//! when the combiner has handed the chunk downstream. When the budget is
//! exhausted the producer is held back; nothing is dropped or reordered.
//!
//! # Usage
//!
//! The sequential [`Router`](crate::Router) uses [`BufferBudget::try_reserve`]
//! and reports a full budget to its caller. The staged
//! [`Pipeline`](crate::Pipeline) awaits [`BufferBudget::reserve`] in its
//! fan-out task.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Result, RouterError};

/// Default data buffer size in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Shared byte budget.
///
/// Clones share the same budget.
#[derive(Debug, Clone)]
pub struct BufferBudget {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BufferBudget {
    /// Create a budget of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Total budget in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently free.
    #[inline]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Bytes currently held by permits.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Check whether `bytes` could be reserved right now.
    #[inline]
    pub fn can_accept(&self, bytes: usize) -> bool {
        bytes <= self.available()
    }

    /// Reserve `bytes` without waiting.
    ///
    /// Returns `None` when the budget cannot cover the request.
    pub fn try_reserve(&self, bytes: usize) -> Option<BudgetPermit> {
        if bytes == 0 {
            return Some(BudgetPermit::empty());
        }
        let n = u32::try_from(bytes).ok()?;
        self.permits
            .clone()
            .try_acquire_many_owned(n)
            .ok()
            .map(|permit| BudgetPermit::new(permit, bytes))
    }

    /// Reserve `bytes`, waiting for the combiner to release space.
    ///
    /// Fails immediately if the request can never fit, and with
    /// `ChannelClosed` once the budget has been closed.
    pub async fn reserve(&self, bytes: usize) -> Result<BudgetPermit> {
        if bytes == 0 {
            return Ok(BudgetPermit::empty());
        }
        if bytes > self.capacity {
            return Err(RouterError::ChunkTooLarge {
                len: bytes,
                max: self.capacity,
            });
        }
        let n = u32::try_from(bytes).map_err(|_| RouterError::ChunkTooLarge {
            len: bytes,
            max: self.capacity,
        })?;

        let permit = self
            .permits
            .clone()
            .acquire_many_owned(n)
            .await
            .map_err(|_| RouterError::ChannelClosed)?;
        Ok(BudgetPermit::new(permit, bytes))
    }

    /// Wake all waiters with an error; no further reservations succeed.
    pub fn close(&self) {
        self.permits.close();
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

impl Default for BufferBudget {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// Bytes reserved from a [`BufferBudget`], released on drop.
#[derive(Debug)]
pub struct BudgetPermit {
    permit: Option<OwnedSemaphorePermit>,
    bytes: usize,
}

impl BudgetPermit {
    fn new(permit: OwnedSemaphorePermit, bytes: usize) -> Self {
        Self {
            permit: Some(permit),
            bytes,
        }
    }

    fn empty() -> Self {
        Self {
            permit: None,
            bytes: 0,
        }
    }

    /// Bytes held.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Return the bytes to the budget now.
    pub fn release(mut self) {
        self.permit.take();
    }
}
