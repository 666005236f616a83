//! Free lists for payload buffers and frames.
//!
//! Values come out of a [`Pool`] wrapped in a [`Pooled`] guard and go back
//! when the guard drops, on success and error paths alike. A value is reset
//! through [`Recycle`] before it is stored, so nothing from one call is
//! visible to the next.

use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use framerelay_frame::Frame;

/// Reset a value to its freshly-constructed state, keeping allocations.
pub trait Recycle {
    fn recycle(&mut self);
}

impl Recycle for BytesMut {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl Recycle for Frame {
    fn recycle(&mut self) {
        self.reset();
    }
}

/// A thread-safe free list. Every released value is kept; the list grows
/// to the peak number of values on loan at once.
#[derive(Debug)]
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
}

impl<T: Recycle + Default> Pool<T> {
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Take an idle value, or a new one if the pool is empty.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let value = self.lock().pop().unwrap_or_default();
        self.adopt(value)
    }

    /// Reset `value` and store it for reuse.
    pub fn release(&self, mut value: T) {
        value.recycle();
        self.lock().push(value);
    }

    /// Wrap an owned value so it returns to this pool when dropped.
    pub fn adopt(&self, value: T) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            value: ManuallyDrop::new(value),
        }
    }

    /// Number of values waiting for reuse.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    // Idle values are always recycled, so a poisoned list is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Recycle + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value on loan from a [`Pool`].
pub struct Pooled<'a, T: Recycle + Default> {
    pool: &'a Pool<T>,
    value: ManuallyDrop<T>,
}

impl<T: Recycle + Default> Pooled<'_, T> {
    /// Keep the value instead of returning it to the pool.
    pub fn detach(self) -> T {
        let mut this = ManuallyDrop::new(self);
        mem::take(&mut *this.value)
    }
}

impl<T: Recycle + Default> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Recycle + Default> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Recycle + Default> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let value = mem::take(&mut *self.value);
        self.pool.release(value);
    }
}

impl<T: Recycle + Default + std::fmt::Debug> std::fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.value, f)
    }
}
