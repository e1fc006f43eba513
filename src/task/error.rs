use std::io;

/// Everything that can go wrong between [spawn](super::spawn) and [join](super::Task::join).
///
/// `E` is the task body's own error type.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// The OS refused to create the thread, e.g. out of memory for its stack
    #[error("can't start a thread for the task: {0}")]
    ResourceExhausted(#[source] io::Error),

    #[error("task was already joined")]
    AlreadyJoined,

    /// The body terminated abnormally, carries the panic message
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("task failed: {0}")]
    Failed(E),
}

impl<E> TaskError<E> {
    /// The body's own error, if that's what happened
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}
