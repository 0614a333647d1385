//! Heap entries and the comparison rule shared by both task queues.

use std::cmp::Ordering;

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriorityKey {
    /// Fixed start hour; earlier is greater.
    Fixed { hour: u8 },
    /// Utility; larger is greater.
    Flexible { utility: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct QueueEntry {
    /// Position in the owning task list.
    pub position: usize,
    pub id: TaskId,
    pub key: PriorityKey,
}

impl QueueEntry {
    pub fn fixed(position: usize, id: TaskId, hour: u8) -> Self {
        Self {
            position,
            id,
            key: PriorityKey::Fixed { hour },
        }
    }

    pub fn flexible(position: usize, id: TaskId, utility: f64) -> Self {
        Self {
            position,
            id,
            key: PriorityKey::Flexible { utility },
        }
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // MaxHeap surfaces the greatest entry. Equal keys fall back to the
        // lower task id so a run is reproducible.
        let by_key = match (self.key, other.key) {
            (PriorityKey::Fixed { hour: a }, PriorityKey::Fixed { hour: b }) => b.cmp(&a),
            (PriorityKey::Flexible { utility: a }, PriorityKey::Flexible { utility: b }) => {
                a.total_cmp(&b)
            }
            // The scheduler keeps the two kinds in separate queues.
            (PriorityKey::Fixed { .. }, PriorityKey::Flexible { .. }) => Ordering::Greater,
            (PriorityKey::Flexible { .. }, PriorityKey::Fixed { .. }) => Ordering::Less,
        };
        by_key.then_with(|| other.id.cmp(&self.id))
    }
}
