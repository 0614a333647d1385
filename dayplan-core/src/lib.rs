//! dayplan-core: single-day task scheduling.
//!
//! Tasks are scored by how much they depend on (unimportance), split into a
//! fixed-time queue and a flexible queue, and ordered inside a bounded time
//! window by either a greedy pass or a slot-based knapsack pass.

pub mod error;
pub mod heap;
pub mod knapsack;
pub mod queue;
pub mod scheduler;
pub mod scoring;
pub mod task;
pub mod time;

pub use error::ScheduleError;
pub use heap::MaxHeap;
pub use knapsack::{KnapsackItem, KnapsackTable};
pub use queue::{PriorityKey, QueueEntry};
pub use scheduler::{
    FreeBlock, ScheduleOutcome, ScheduledTask, Scheduler, Strategy, DEFAULT_SLOT_MINUTES,
    DEFAULT_WINDOW_MINUTES,
};
pub use scoring::{utility_of, ScoreTable, SENTINEL_UNIMPORTANCE};
pub use task::{prepare_tasks, RawTask, TaskId, TaskList, TaskRecord, TaskStatus};
pub use time::{format_clock, parse_clock};
