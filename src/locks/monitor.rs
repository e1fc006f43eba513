//! # Monitor
//!
//! A value behind a [Mutex] paired with the [Condvar] that announces its changes.
//! It's the `while (!ready) wait(cond, lock)` idiom packed into a type,
//! so the predicate can't be forgotten.

use super::{Condvar, Mutex, MutexGuard};

pub struct Monitor<T> {
    value: Mutex<T>,
    changed: Condvar,
}

impl<T> Monitor<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            changed: Condvar::new(),
        }
    }

    /// Locks the value without waiting on anything. Changes made through the guard
    /// aren't announced, use [Monitor::update] for that.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock()
    }

    /// Mutates the value under the lock, then wakes every waiter to re-check.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let r = {
            let mut guard = self.value.lock();
            f(&mut guard)
        };
        self.changed.notify_all();
        r
    }

    /// Blocks until `ready` holds, returns the still-locked value.
    pub fn wait_until<F>(&self, ready: F) -> MutexGuard<'_, T>
    where
        F: FnMut(&T) -> bool,
    {
        self.changed.wait_until(self.value.lock(), ready)
    }

    /// Wakes the waiters without touching the value.
    /// They re-check their predicates and go back to sleep.
    pub fn notify_all(&self) {
        self.changed.notify_all();
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
