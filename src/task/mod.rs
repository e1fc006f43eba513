//! # Tasks
//!
//! A task is a unit of work on its own thread: it takes an input, produces an output or fails,
//! and somebody joins it to get the outcome.
//!
//! Ownership does the heavy lifting:
//! - the input is moved into the task, the caller can't touch it while the task runs
//! - the output stays inside the task until [Task::join] moves it out, exactly once
//! - both must be `'static`, so a task can't borrow from the caller's stack
//!   nor hand back something that lived on its own
//!
//! A body can end in 3 ways, and [Task::join] reports each of them:
//! - returns `Ok(output)` => `Ok(output)`
//! - returns `Err(e)` => [TaskError::Failed]
//! - panics => [TaskError::TaskPanicked], the other tasks keep running
//!
//! Joining establishes happens-before between everything the task did and the joiner.
//!
//! A task that's dropped without a join gets detached: the thread runs to the end
//! and its output is dropped there.

mod builder;
mod error;

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU8, Ordering::Acquire},
        Arc,
    },
    thread::{JoinHandle, ThreadId},
};

use strum_macros::Display;
use tracing::{debug, warn};

pub use builder::TaskBuilder;
pub use error::TaskError;

/// Spawns an unnamed task with default settings, see [TaskBuilder::spawn].
pub fn spawn<I, O, E, F>(body: F, input: I) -> Result<Task<O, E>, TaskError<E>>
where
    F: FnOnce(I) -> Result<O, E> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    TaskBuilder::new().spawn(body, input)
}

/// Opaque identity of the thread behind a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(ThreadId);

/// `Created -> Running -> Completed` or `Created -> Running -> Failed`.
/// A panic counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    Created,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The state is shared between the handle and the thread as a single byte
mod state {
    use std::sync::atomic::{
        AtomicU8,
        Ordering::{Relaxed, Release},
    };

    pub const CREATED: u8 = 0;
    pub const RUNNING: u8 = 1;
    pub const COMPLETED: u8 = 2;
    pub const FAILED: u8 = 3;

    /// Both the spawner and the thread call it, whoever is first wins.
    /// A terminal state is never overwritten.
    pub fn start(cell: &AtomicU8) {
        let _ = cell.compare_exchange(CREATED, RUNNING, Release, Relaxed);
    }
}

pub struct Task<O, E> {
    id: TaskId,
    name: Option<String>,
    state: Arc<AtomicU8>,
    // None once joined
    handle: Option<JoinHandle<Result<O, E>>>,
}

impl<O, E> Task<O, E> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> TaskState {
        match self.state.load(Acquire) {
            state::CREATED => TaskState::Created,
            state::RUNNING => TaskState::Running,
            state::COMPLETED => TaskState::Completed,
            _ => TaskState::Failed,
        }
    }

    /// Doesn't block. True once the thread is gone, or after a join.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn is_joined(&self) -> bool {
        self.handle.is_none()
    }

    /// Blocks until the task is done and moves its output out.
    ///
    /// The second and every further call fail with [TaskError::AlreadyJoined].
    pub fn join(&mut self) -> Result<O, TaskError<E>> {
        let Some(handle) = self.handle.take() else {
            warn!(task = ?self.id, name = self.label(), "task joined twice");
            return Err(TaskError::AlreadyJoined);
        };

        let outcome = match handle.join() {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(TaskError::Failed(e)),
            Err(payload) => Err(TaskError::TaskPanicked(panic_message(payload.as_ref()))),
        };

        match &outcome {
            Ok(_) => debug!(task = ?self.id, name = self.label(), "task joined"),
            Err(TaskError::TaskPanicked(msg)) => {
                warn!(task = ?self.id, name = self.label(), panic = %msg, "task panicked")
            }
            Err(_) => debug!(task = ?self.id, name = self.label(), "task failed"),
        }
        outcome
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }
}

impl<O, E> Drop for Task<O, E> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!(task = ?self.id, name = self.label(), "task dropped unjoined, detaching");
        }
    }
}

/// panic! with a literal gives `&str`, with formatting - `String`
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod test {
    use std::{
        convert::Infallible,
        sync::Arc,
        thread::sleep,
        time::Duration,
    };

    use crate::locks::Monitor;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct IntPair {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_round_trip() {
        let input = Box::new(IntPair { x: 10, y: 20 });
        let mut t = spawn(
            |p: Box<IntPair>| {
                Ok::<_, Infallible>(Box::new(IntPair {
                    x: p.x + 1,
                    y: p.y + 2,
                }))
            },
            input,
        )
        .unwrap();
        let out = t.join().unwrap();
        assert_eq!(IntPair { x: 11, y: 22 }, *out);
    }

    #[test]
    fn test_no_input_no_output() {
        let mut t = spawn(|()| Ok::<(), Infallible>(()), ()).unwrap();
        assert!(t.join().is_ok());
        assert_eq!(TaskState::Completed, t.state());
    }

    #[test]
    fn test_double_join() {
        let mut t = spawn(|v: Vec<u8>| Ok::<_, Infallible>(v.len()), vec![1, 2, 3]).unwrap();
        assert_eq!(3, t.join().unwrap());
        assert!(t.is_joined());
        for _ in 0..3 {
            assert!(matches!(t.join(), Err(TaskError::AlreadyJoined)));
        }
    }

    #[test]
    fn test_failure_is_surfaced() {
        let mut t = spawn(
            |n: i32| if n < 0 { Err(format!("{n} is negative")) } else { Ok(n) },
            -5,
        )
        .unwrap();
        let err = t.join().unwrap_err();
        assert_eq!("task failed: -5 is negative", err.to_string());
        assert_eq!(Some("-5 is negative".to_string()), err.into_failure());
        assert_eq!(TaskState::Failed, t.state());
    }

    #[test]
    fn test_panic_is_surfaced() {
        let mut t = spawn(
            |n: u32| -> Result<u32, Infallible> { panic!("boom at {n}") },
            7,
        )
        .unwrap();
        match t.join() {
            Err(TaskError::TaskPanicked(msg)) => assert_eq!("boom at 7", msg),
            other => panic!("unexpected outcome {:?}", other.map_err(|e| e.to_string())),
        }
        assert_eq!(TaskState::Failed, t.state());
        assert!(matches!(t.join(), Err(TaskError::AlreadyJoined)));
    }

    #[test]
    fn test_panic_doesnt_affect_siblings() {
        let mut bad = spawn(
            |()| -> Result<(), Infallible> { panic!("bad task") },
            (),
        )
        .unwrap();
        let mut good = spawn(
            |n: u64| Ok::<_, Infallible>((0..=n).sum::<u64>()),
            100,
        )
        .unwrap();
        assert!(matches!(bad.join(), Err(TaskError::TaskPanicked(_))));
        assert_eq!(5050, good.join().unwrap());
    }

    #[test]
    fn test_state_transitions() {
        let gate = Arc::new(Monitor::new(false));
        let mut t = spawn(
            |gate: Arc<Monitor<bool>>| {
                let _open = gate.wait_until(|open| *open);
                Ok::<_, Infallible>("done")
            },
            Arc::clone(&gate),
        )
        .unwrap();

        // spawn returns a running task, it can't finish while the gate is closed
        assert_eq!(TaskState::Running, t.state());
        assert!(!t.state().is_terminal());
        sleep(Duration::from_millis(50));
        assert!(!t.is_finished());

        gate.update(|open| *open = true);
        assert_eq!("done", t.join().unwrap());
        assert_eq!(TaskState::Completed, t.state());
        assert!(t.is_finished());
    }

    #[test]
    fn test_named_task() {
        let mut t = TaskBuilder::new()
            .name("A")
            .stack_size(64 * 1024)
            .spawn(
                |()| Ok::<_, Infallible>(std::thread::current().name().map(str::to_string)),
                (),
            )
            .unwrap();
        assert_eq!(Some("A"), t.name());
        assert_eq!(Some("A".to_string()), t.join().unwrap());
    }

    #[test]
    fn test_thread_creation_failure() {
        // 64 TiB of stack, the OS won't hand that out
        let r = TaskBuilder::new()
            .stack_size(1 << 46)
            .spawn(|()| Ok::<_, Infallible>(()), ());
        match r {
            Err(e @ TaskError::ResourceExhausted(_)) => {
                assert!(e.to_string().starts_with("can't start a thread"));
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("a 64 TiB stack was granted"),
        }
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut a = spawn(|()| Ok::<_, Infallible>(()), ()).unwrap();
        let mut b = spawn(|()| Ok::<_, Infallible>(()), ()).unwrap();
        assert_ne!(a.id(), b.id());
        a.join().unwrap();
        b.join().unwrap();
    }

    #[test]
    fn test_state_display() {
        assert_eq!("running", TaskState::Running.to_string());
        assert_eq!("completed", TaskState::Completed.to_string());
    }
}
