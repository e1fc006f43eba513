//! # Shared counters
//!
//! Two tasks bumping the same number is the classic way to show uncontrolled scheduling.
//! `counter++` is a load, an add and a store. Two threads interleaving those steps lose updates.
//!
//! [SharedCounter] does every increment under a [Mutex], so the final value is always
//! the sum of all increments.
//!
//! [RacyCounter] is the negative example. Its cell is atomic so there's no UB, but the
//! increment is a separate load and store, exactly like the unsynchronized `counter++`.
//! Its final value can be anything up to the sum, never above it.

use std::sync::{
    atomic::{AtomicU64, Ordering::Relaxed},
    Arc,
};

use crate::locks::Mutex;

/// A cheap-to-clone handle, every clone points to the same value.
#[derive(Clone, Default)]
pub struct SharedCounter {
    value: Arc<Mutex<u64>>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        *self.value.lock() += n;
    }

    pub fn get(&self) -> u64 {
        *self.value.lock()
    }
}

#[derive(Clone, Default)]
pub struct RacyCounter {
    value: Arc<AtomicU64>,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliberately not a `fetch_add`: another thread may store in between.
    pub fn increment(&self) {
        let v = self.value.load(Relaxed);
        self.value.store(v + 1, Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Relaxed)
    }
}
