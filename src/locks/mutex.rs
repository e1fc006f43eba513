//! # Mutex
//!
//! The state is a u32 rather than a boolean so it works with wait & wake.
//! Wait and wake take no part in the mutex correctness, they only save processor cycles.
//!
//! Syscalls are slow, so both are skipped when there's no contention:
//! - `lock` spins for a short while before going to sleep
//! - the guard only wakes somebody up if the state says there are waiters (value `2`)
//!
//! There's no poisoning. A panicking holder unlocks the mutex while unwinding,
//! so a failed task never leaves the other tasks with a dead lock.

use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::{
        AtomicU32,
        Ordering::{Acquire, Relaxed, Release},
    },
};

use atomic_wait::{wait, wake_one};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

pub struct Mutex<T> {
    /// 0 - unlocked
    /// 1 - locked, no other threads
    /// 2 - locked, other threads are waiting
    state: AtomicU32,
    value: UnsafeCell<T>,
}

/// Sharing the mutex hands the value from thread to thread, one at a time
unsafe impl<T> Sync for Mutex<T> where T: Send {}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            value: UnsafeCell::new(value),
        }
    }

    /// Blocks until the calling thread is the only holder.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_err()
        {
            lock_contended(&self.state);
        }
        MutexGuard { mutex: self }
    }

    /// Takes the lock only if nobody holds it right now, never blocks.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .ok()
            .map(|_| MutexGuard { mutex: self })
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// - spin for some cycles, the lock is usually held for brief moments
/// - fall back to the wait syscall if it's still locked
#[cold]
fn lock_contended(state: &AtomicU32) {
    let mut spin_count = 0;

    // load instead of compare_exchange to keep the cache line shared while spinning
    // only spin on 1, 2 means other threads have given up already
    while state.load(Relaxed) == LOCKED && spin_count < 100 {
        spin_count += 1;
        std::hint::spin_loop();
    }

    if state
        .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
        .is_ok()
    {
        return;
    }

    // leaves 2 in the state so the potential other waiters aren't lost
    while state.swap(CONTENDED, Acquire) != UNLOCKED {
        wait(state, CONTENDED);
    }
}

/// The only way to reach the value and the only way to unlock.
/// Whoever holds the guard is the holder, so nobody else can release the mutex.
pub struct MutexGuard<'a, T> {
    pub(super) mutex: &'a Mutex<T>,
}

/// Shared guards give out `&T` to several threads
unsafe impl<T> Sync for MutexGuard<'_, T> where T: Sync {}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard exists only while the mutex is locked
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard exists only while the mutex is locked
        unsafe { &mut *self.mutex.value.get() }
    }
}

/// There are no guarantees the woken thread gets the lock, any other thread may be faster.
impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        if self.mutex.state.swap(UNLOCKED, Release) == CONTENDED {
            wake_one(&self.mutex.state);
        }
    }
}
