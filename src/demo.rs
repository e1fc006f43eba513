//! Demonstrations behind the binary's selector. Each returns what it observed
//! so the binary can report it and the tests can check it.

use std::{convert::Infallible, sync::Arc, thread::sleep, time::Duration};

use tracing::info;

use crate::{
    counter::{RacyCounter, SharedCounter},
    locks::Monitor,
    task::{TaskBuilder, TaskError},
};

/// How many times each of the two counting tasks bumps the counter
pub const INCREMENTS: u64 = 10_000_000;

pub type DemoResult<T> = Result<T, TaskError<Infallible>>;

/// Two tasks, "A" and "B", bump one mutex-guarded counter `increments` times each.
/// The result is always `2 * increments`.
pub fn counter(increments: u64) -> DemoResult<u64> {
    let counter = SharedCounter::new();
    info!(counter = counter.get(), "main: begin");

    let mut tasks = ["A", "B"]
        .into_iter()
        .map(|name| {
            TaskBuilder::new().name(name).spawn(
                move |counter: SharedCounter| {
                    info!("{name}: begin");
                    for _ in 0..increments {
                        counter.increment();
                    }
                    info!("{name}: done");
                    Ok::<_, Infallible>(())
                },
                counter.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    for t in tasks.iter_mut() {
        t.join()?;
    }

    let total = counter.get();
    info!(counter = total, "main: done with both tasks");
    Ok(total)
}

/// Same as [counter] but without the lock. Returns the final value, which is
/// usually less than `2 * increments` when both tasks actually overlap.
pub fn racy_counter(increments: u64) -> DemoResult<u64> {
    let counter = RacyCounter::new();

    let mut tasks = ["A", "B"]
        .into_iter()
        .map(|name| {
            TaskBuilder::new().name(name).spawn(
                move |counter: RacyCounter| {
                    for _ in 0..increments {
                        counter.increment();
                    }
                    Ok::<_, Infallible>(())
                },
                counter.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    for t in tasks.iter_mut() {
        t.join()?;
    }

    let total = counter.get();
    info!(
        counter = total,
        lost = 2 * increments - total,
        "main: done, the scheduler isn't under control"
    );
    Ok(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntPair {
    pub x: i32,
    pub y: i32,
}

/// The input goes in on the heap and a fresh heap value comes out,
/// nothing on either thread's stack crosses over.
pub fn round_trip(args: IntPair) -> DemoResult<IntPair> {
    let mut t = TaskBuilder::new().name("pair").spawn(
        |args: Box<IntPair>| {
            Ok::<_, Infallible>(Box::new(IntPair {
                x: args.x / 10,
                y: args.y / 10,
            }))
        },
        Box::new(args),
    )?;
    let values = t.join()?;
    info!(x = values.x, y = values.y, "returned");
    Ok(*values)
}

/// What the waiter saw when it came out of the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
    pub ready: bool,
    /// at least once, plus once for every wake-up
    pub checks: usize,
}

/// A task pokes the waiter `nudges` times without setting the flag, then sets it.
pub fn ready_flag(nudges: usize) -> DemoResult<ReadyReport> {
    let ready = Arc::new(Monitor::new(false));

    let mut signaller = TaskBuilder::new().name("signaller").spawn(
        move |ready: Arc<Monitor<bool>>| {
            for _ in 0..nudges {
                sleep(Duration::from_millis(10));
                ready.notify_all();
            }
            ready.update(|r| *r = true);
            Ok::<_, Infallible>(())
        },
        Arc::clone(&ready),
    )?;

    let mut checks = 0;
    let flag = ready.wait_until(|r| {
        checks += 1;
        *r
    });
    let observed = *flag;
    drop(flag);
    signaller.join()?;

    info!(ready = observed, checks, "main: ready");
    Ok(ReadyReport {
        ready: observed,
        checks,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_counter() {
        assert_eq!(200_000, counter(100_000).unwrap());
    }

    #[test]
    fn test_counter_full_size() {
        assert_eq!(2 * INCREMENTS, counter(INCREMENTS).unwrap());
    }

    #[test]
    fn test_racy_counter_bounded() {
        let total = racy_counter(100_000).unwrap();
        assert!(total <= 200_000);
    }

    #[test]
    fn test_round_trip() {
        let out = round_trip(IntPair { x: 10, y: 20 }).unwrap();
        assert_eq!(IntPair { x: 1, y: 2 }, out);
    }

    #[test]
    fn test_ready_flag_only_returns_when_set() {
        let report = ready_flag(5).unwrap();
        assert!(report.ready);
        assert!(report.checks >= 1);
    }

    #[test]
    fn test_ready_flag_rechecks_after_nudges() {
        // the waiter is asleep long before the signaller's first nudge
        let report = ready_flag(20).unwrap();
        assert!(report.ready);
        assert!(report.checks >= 2);
    }
}
