//! # Tasks and locks
//!
//! A unit of work on its own thread ([Task]) plus the blocking primitives tasks
//! synchronize through ([locks]) and the shared counters that show why they're needed ([counter]).

pub mod counter;
pub mod demo;
pub mod locks;
pub mod task;

pub use task::{spawn, Task, TaskBuilder, TaskError, TaskId, TaskState};
