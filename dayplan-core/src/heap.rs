//! Array-backed binary max-heap.
//!
//! Ordering comes from the element type's `Ord` impl, so the same container
//! serves both the fixed-time queue (earliest hour first) and the flexible
//! queue (highest utility first); see [`crate::queue::QueueEntry`].

use std::cmp::Ordering;

use crate::error::{Result, ScheduleError};

/// One array cell. `Empty` is the placeholder a push starts from and sorts
/// below every real value; it never survives past the end of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot<T> {
    Empty,
    Filled(T),
}

impl<T> Slot<T> {
    fn as_value(&self) -> Option<&T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Empty => None,
        }
    }

    fn into_value(self) -> Option<T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Empty => None,
        }
    }
}

impl<T: Ord> Slot<T> {
    fn cmp_slot(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Slot::Empty, Slot::Empty) => Ordering::Equal,
            (Slot::Empty, Slot::Filled(_)) => Ordering::Less,
            (Slot::Filled(_), Slot::Empty) => Ordering::Greater,
            (Slot::Filled(a), Slot::Filled(b)) => a.cmp(b),
        }
    }

    fn lt(&self, other: &Self) -> bool {
        self.cmp_slot(other) == Ordering::Less
    }
}

#[derive(Debug, Clone)]
pub struct MaxHeap<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for MaxHeap<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

fn parent(i: usize) -> usize {
    (i - 1) / 2
}

fn left(i: usize) -> usize {
    2 * i + 1
}

fn right(i: usize) -> usize {
    2 * i + 2
}

impl<T: Ord> MaxHeap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Elements in array order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::as_value)
    }

    pub fn push(&mut self, value: T) {
        self.slots.push(Slot::Empty);
        let last = self.slots.len() - 1;
        self.sift_up(last, value);
    }

    /// Replace the element at `index` with a value that is not smaller, then
    /// restore the heap property upwards. An `index` past the end is rejected
    /// the same way as a smaller value.
    pub fn increase_key(&mut self, index: usize, value: T) -> Result<()> {
        let candidate = Slot::Filled(value);
        let Some(current) = self.slots.get(index) else {
            return Err(ScheduleError::HeapOrderingViolation { index });
        };
        if candidate.lt(current) {
            return Err(ScheduleError::HeapOrderingViolation { index });
        }
        if let Slot::Filled(value) = candidate {
            self.sift_up(index, value);
        }
        Ok(())
    }

    pub fn peek_max(&self) -> Result<&T> {
        self.slots
            .first()
            .and_then(Slot::as_value)
            .ok_or(ScheduleError::EmptyContainer { op: "peek_max" })
    }

    pub fn pop_max(&mut self) -> Result<T> {
        if self.slots.is_empty() {
            return Err(ScheduleError::EmptyContainer { op: "pop_max" });
        }
        let max = self.slots.swap_remove(0);
        self.sift_down(0);
        max.into_value()
            .ok_or(ScheduleError::EmptyContainer { op: "pop_max" })
    }

    fn sift_up(&mut self, mut i: usize, value: T) {
        self.slots[i] = Slot::Filled(value);
        while i > 0 && self.slots[parent(i)].lt(&self.slots[i]) {
            let p = parent(i);
            self.slots.swap(p, i);
            i = p;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.slots.len();
        loop {
            let (l, r) = (left(i), right(i));
            let mut largest = i;
            if l < n && self.slots[largest].lt(&self.slots[l]) {
                largest = l;
            }
            if r < n && self.slots[largest].lt(&self.slots[r]) {
                largest = r;
            }
            if largest == i {
                return;
            }
            self.slots.swap(i, largest);
            i = largest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Reverse;

    #[test]
    fn test_pop_order_is_non_increasing() {
        let mut heap = MaxHeap::new();
        for v in [5, 1, 9, 3, 9, 7, 2, 8] {
            heap.push(v);
        }
        let mut out = Vec::new();
        while let Ok(v) = heap.pop_max() {
            out.push(v);
        }
        assert_eq!(out, vec![9, 9, 8, 7, 5, 3, 2, 1]);
    }

    #[test]
    fn test_size_tracks_pushes_and_pops() {
        let mut heap = MaxHeap::new();
        for v in 0..10 {
            heap.push(v);
        }
        for _ in 0..4 {
            heap.pop_max().unwrap();
        }
        assert_eq!(heap.len(), 6);
        assert_eq!(*heap.peek_max().unwrap(), 5);
        assert_eq!(heap.len(), 6);
    }

    #[test]
    fn test_empty_heap_errors() {
        let mut heap: MaxHeap<i32> = MaxHeap::new();
        assert_eq!(
            heap.peek_max().unwrap_err(),
            ScheduleError::EmptyContainer { op: "peek_max" }
        );
        assert_eq!(
            heap.pop_max().unwrap_err(),
            ScheduleError::EmptyContainer { op: "pop_max" }
        );
    }

    #[test]
    fn test_increase_key_rejects_smaller_value() {
        let mut heap = MaxHeap::new();
        heap.push(4);
        heap.push(10);
        heap.push(6);
        // array is [10, 4, 6]
        let err = heap.increase_key(1, 3).unwrap_err();
        assert_eq!(err, ScheduleError::HeapOrderingViolation { index: 1 });

        heap.increase_key(1, 12).unwrap();
        assert_eq!(*heap.peek_max().unwrap(), 12);
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn test_increase_key_past_end_is_an_error() {
        let mut heap = MaxHeap::new();
        heap.push(4);
        assert_eq!(
            heap.increase_key(1, 9).unwrap_err(),
            ScheduleError::HeapOrderingViolation { index: 1 }
        );
        assert_eq!(heap.len(), 1);
        assert_eq!(*heap.peek_max().unwrap(), 4);
    }

    #[test]
    fn test_injected_ordering_via_reverse() {
        let mut heap = MaxHeap::new();
        for hour in [16, 5, 11] {
            heap.push(Reverse(hour));
        }
        assert_eq!(heap.pop_max().unwrap().0, 5);
        assert_eq!(heap.pop_max().unwrap().0, 11);
        assert_eq!(heap.pop_max().unwrap().0, 16);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_iter_sees_every_element() {
        let mut heap = MaxHeap::new();
        for v in [3, 1, 2] {
            heap.push(v);
        }
        let mut seen: Vec<_> = heap.iter().copied().collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
