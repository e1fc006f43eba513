use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering::Release},
        Arc,
    },
    thread,
};

use tracing::debug;

use super::{state, Task, TaskError, TaskId};

/// Per-task settings, handed over to [thread::Builder].
///
/// ```
/// use tasks_n_locks::TaskBuilder;
///
/// let mut t = TaskBuilder::new()
///     .name("doubler")
///     .spawn(|x: u32| Ok::<_, ()>(x * 2), 21)
///     .unwrap();
/// assert_eq!(42, t.join().unwrap());
/// ```
#[derive(Debug, Default, Clone)]
pub struct TaskBuilder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread gets the name too => it shows up in panic messages
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Starts `body(input)` on a new thread.
    ///
    /// The `'static` bounds are what keeps caller-stack data out: the input is moved
    /// into the task and the output is moved out of it, nothing is borrowed across.
    pub fn spawn<I, O, E, F>(self, body: F, input: I) -> Result<Task<O, E>, TaskError<E>>
    where
        F: FnOnce(I) -> Result<O, E> + Send + 'static,
        I: Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
    {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let cell = Arc::new(AtomicU8::new(state::CREATED));
        let thread_cell = Arc::clone(&cell);

        let handle = builder
            .spawn(move || {
                state::start(&thread_cell);
                match panic::catch_unwind(AssertUnwindSafe(move || body(input))) {
                    Ok(Ok(output)) => {
                        thread_cell.store(state::COMPLETED, Release);
                        Ok(output)
                    }
                    Ok(Err(e)) => {
                        thread_cell.store(state::FAILED, Release);
                        Err(e)
                    }
                    Err(payload) => {
                        thread_cell.store(state::FAILED, Release);
                        // no second panic message, the hook has already reported it
                        panic::resume_unwind(payload)
                    }
                }
            })
            .map_err(TaskError::ResourceExhausted)?;

        // the thread may have flipped it already
        state::start(&cell);

        let id = TaskId(handle.thread().id());
        debug!(task = ?id, name = self.name.as_deref().unwrap_or("-"), "task spawned");

        Ok(Task {
            id,
            name: self.name,
            state: cell,
            handle: Some(handle),
        })
    }
}
