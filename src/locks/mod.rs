//! # Locks
//!
//! Blocking primitives the tasks share state through. They're built on futex-like
//! `wait` / `wake` from the [atomic-wait](https://crates.io/crates/atomic-wait) crate:
//! - `wait(&AtomicU32, u32)` - blocks only if the atomic still holds the value, may wake up spuriously
//! - `wake_one(&AtomicU32)` - wakes a single thread waiting on the atomic
//! - `wake_all(&AtomicU32)` - wakes all of them
//!
//! Spurious wake-ups are part of the contract, so nothing here hands out a bare "wait" to the user.
//! Waiting always goes together with a predicate that gets re-checked after every wake-up,
//! see [Condvar::wait_until] and [Monitor::wait_until].

mod condvar;
mod monitor;
mod mutex;

pub use condvar::Condvar;
pub use monitor::Monitor;
pub use mutex::{Mutex, MutexGuard};
