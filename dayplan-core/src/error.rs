//! Error taxonomy for task preparation, scoring and the priority container.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// `peek_max`/`pop_max` on a container with no elements.
    #[error("{op} on an empty priority container")]
    EmptyContainer { op: &'static str },

    #[error("new key at index {index} is smaller than the current key")]
    HeapOrderingViolation { index: usize },

    #[error("task {task} depends on unknown task {dependency}")]
    MissingDependency { task: TaskId, dependency: TaskId },

    #[error("circular dependency detected at task {task}")]
    CyclicDependency { task: TaskId },

    #[error("task id {0} appears more than once")]
    DuplicateTaskId(TaskId),

    /// A zero-minute task would have an undefined utility.
    #[error("task {0} has a zero duration")]
    InvalidDuration(TaskId),

    #[error("task {task} has fixed time {hour}, expected an hour in 0..=23")]
    InvalidFixedTime { task: TaskId, hour: u8 },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
