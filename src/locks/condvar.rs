//! # Condition variable
//!
//! Waiting unlocks the mutex, waits for a signal then locks the mutex again.
//! Two notification modes: "notify one" / signal and "notify all" / broadcast.
//!
//! The futex's atomic is used as a notification counter so a signal sent between
//! unlocking the mutex and going to sleep isn't missed: the wait only blocks
//! if the counter still holds the value seen before the unlock.
//!
//! Notifications are skipped entirely when nobody is waiting. The waiter count is
//! bumped while the mutex is still held, so a notifier that changed the data under
//! the same mutex is guaranteed to see it.
//!
//! ## Memory ordering
//!
//! All the counters are Relaxed, the mutex provides the ordering for the data.
//! Speaking from the waiter's perspective:
//! - a notification sent before the waiter unlocked can't matter, its sender couldn't
//!   have touched the data yet (the mutex was locked)
//! - a notifier that locks after the unlock has a happens-before with it, so the
//!   counter value loaded before the unlock is older than its increment
//!
//! The futex wait then either sees the new counter and doesn't block, or blocks and is
//! guaranteed to get the following wake.
//!
//! The wait can go to sleep unintentionally if it misses exactly 2^32 notifications.
//! That's considered negligible.
//!
//! Wake-ups can be spurious, and a notification can arrive while the data still
//! doesn't satisfy the waiter. That's why the bare wait is private: the only way
//! to wait is [Condvar::wait_until], which re-checks the predicate in a loop.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering::Relaxed};

use atomic_wait::{wait, wake_all, wake_one};

use super::mutex::MutexGuard;

pub struct Condvar {
    counter: AtomicU32,
    num_waiters: AtomicUsize, // counts threads, so it can't realistically overflow
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            num_waiters: AtomicUsize::new(0),
        }
    }

    pub fn notify_one(&self) {
        if self.num_waiters.load(Relaxed) > 0 {
            self.counter.fetch_add(1, Relaxed);
            wake_one(&self.counter);
        }
    }

    pub fn notify_all(&self) {
        if self.num_waiters.load(Relaxed) > 0 {
            self.counter.fetch_add(1, Relaxed);
            wake_all(&self.counter);
        }
    }

    /// Blocks until `ready` holds for the guarded value.
    ///
    /// The predicate is checked before the first wait and after every wake-up,
    /// always with the mutex locked. The returned guard is a proof it held.
    pub fn wait_until<'a, T, F>(
        &self,
        mut guard: MutexGuard<'a, T>,
        mut ready: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&T) -> bool,
    {
        while !ready(&*guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// One round of sleeping, the guard comes back locked whatever woke us up.
    /// Both the waiter count and the counter snapshot are taken before the unlock.
    fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let mutex = guard.mutex;
        self.num_waiters.fetch_add(1, Relaxed);
        let seen = self.counter.load(Relaxed);
        drop(guard);

        wait(&self.counter, seen);

        self.num_waiters.fetch_sub(1, Relaxed);
        mutex.lock()
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
