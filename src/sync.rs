//! Bounded-wait lock shared by the sampler and the request path.
//!
//! # Rules
//!
//! - Nobody blocks forever: every acquire has a tick budget
//! - The sampler gives up and skips its cycle rather than wait
//! - Guards are RAII, release happens on drop

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::hal::clock::{elapsed, Clock, Tick};

/// Mutual exclusion with try-acquire-with-timeout semantics.
pub struct TimedLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` only through a guard, and at most one guard
// exists at a time (enforced by the `locked` compare-exchange).
unsafe impl<T: Send> Sync for TimedLock<T> {}
unsafe impl<T: Send> Send for TimedLock<T> {}

impl<T> TimedLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Single attempt, never waits.
    #[inline]
    pub fn try_lock(&self) -> Option<TimedLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TimedLockGuard { lock: self })
    }

    /// Retry once per tick until `timeout` ticks have passed.
    ///
    /// A zero timeout is a single attempt.
    pub fn lock_within<C: Clock + ?Sized>(
        &self,
        clock: &C,
        timeout: Tick,
    ) -> Option<TimedLockGuard<'_, T>> {
        let start = clock.now();
        loop {
            if let Some(guard) = self.try_lock() {
                return Some(guard);
            }
            if elapsed(clock.now(), start) >= timeout {
                return None;
            }
            clock.delay(1);
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl<T: Default> Default for TimedLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Proof of exclusive access. Unlocks on drop.
pub struct TimedLockGuard<'a, T> {
    lock: &'a TimedLock<T>,
}

impl<T> Deref for TimedLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for TimedLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the lock, &mut self keeps it unique
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for TimedLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
