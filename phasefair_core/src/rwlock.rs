//! Data-owning phase-fair read-write lock with RAII guards.

use crate::errors::AcquireError;
use crate::raw_lock::RawPhaseFairLock;
use crate::types::LockSnapshot;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// A read-write lock around a `T`, scheduled by [`RawPhaseFairLock`].
///
/// Readers share the value; a writer gets it exclusively. Writers are served
/// in arrival order and are never starved by later readers.
///
/// ```
/// use phasefair_core::PhaseFairRwLock;
///
/// let lock = PhaseFairRwLock::new(5);
/// {
///     let r1 = lock.read();
///     let r2 = lock.read();
///     assert_eq!(*r1 + *r2, 10);
/// }
/// *lock.write() += 1;
/// assert_eq!(lock.into_inner(), 6);
/// ```
pub struct PhaseFairRwLock<T: ?Sized> {
    raw: RawPhaseFairLock,
    data: UnsafeCell<T>,
}

// `T: Send` is enough to hand the whole lock (and thus `into_inner`) over.
unsafe impl<T: ?Sized + Send> Send for PhaseFairRwLock<T> {}
// Readers on several threads see `&T` at once, writers move `T` across threads.
unsafe impl<T: ?Sized + Send + Sync> Sync for PhaseFairRwLock<T> {}

/// Shared access; the read lock is released when this guard is dropped.
#[must_use = "if unused the lock will immediately unlock"]
pub struct ReadGuard<'a, T: ?Sized> {
    lock: &'a PhaseFairRwLock<T>,
}

unsafe impl<T: ?Sized + Sync> Sync for ReadGuard<'_, T> {}

/// Exclusive access; the write lock is released when this guard is dropped.
#[must_use = "if unused the lock will immediately unlock"]
pub struct WriteGuard<'a, T: ?Sized> {
    lock: &'a PhaseFairRwLock<T>,
}

unsafe impl<T: ?Sized + Sync> Sync for WriteGuard<'_, T> {}

impl<T> PhaseFairRwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            raw: RawPhaseFairLock::new(),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> PhaseFairRwLock<T> {
    // Only called once the matching lock is held.
    fn read_guard(&self) -> ReadGuard<'_, T> {
        ReadGuard { lock: self }
    }

    fn write_guard(&self) -> WriteGuard<'_, T> {
        WriteGuard { lock: self }
    }

    /// Lock for reading, blocking while a writer holds or awaits the lock.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.raw.read_lock();
        self.read_guard()
    }

    /// # Errors
    /// [`AcquireError::WouldBlock`] unless the lock is in its pure reading phase.
    pub fn try_read(&self) -> Result<ReadGuard<'_, T>, AcquireError> {
        if self.raw.try_read_lock() {
            Ok(self.read_guard())
        } else {
            Err(AcquireError::WouldBlock)
        }
    }

    /// # Errors
    /// [`AcquireError::TimedOut`] if no reading phase began within `timeout`.
    pub fn try_read_for(&self, timeout: Duration) -> Result<ReadGuard<'_, T>, AcquireError> {
        if self.raw.try_read_lock_for(timeout) {
            Ok(self.read_guard())
        } else {
            Err(AcquireError::TimedOut)
        }
    }

    /// Lock for writing, queueing behind earlier writers.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.raw.write_lock();
        self.write_guard()
    }

    /// # Errors
    /// [`AcquireError::WouldBlock`] if the lock is held or another writer is queued.
    pub fn try_write(&self) -> Result<WriteGuard<'_, T>, AcquireError> {
        if self.raw.try_write_lock() {
            Ok(self.write_guard())
        } else {
            Err(AcquireError::WouldBlock)
        }
    }

    /// # Errors
    /// [`AcquireError::TimedOut`] if the lock could not be taken within `timeout`.
    pub fn try_write_for(&self, timeout: Duration) -> Result<WriteGuard<'_, T>, AcquireError> {
        if self.raw.try_write_lock_for(timeout) {
            Ok(self.write_guard())
        } else {
            Err(AcquireError::TimedOut)
        }
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn snapshot(&self) -> LockSnapshot {
        self.raw.snapshot()
    }
}

impl<T: Default> Default for PhaseFairRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for PhaseFairRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseFairRwLock")
            .field("state", &self.raw.snapshot())
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a read lock is held, so no writer can alias the value.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.read_unlock();
    }
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write lock is held exclusively.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write lock is held exclusively.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.write_unlock();
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for WriteGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
