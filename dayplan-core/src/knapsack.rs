//! Bounded 0/1 knapsack over time slots.
//!
//! `dp[i][c]` is the best utility reachable with the first `i` items inside
//! `c` slots. Row 0 is all zero. An item fits at `c` only if its real
//! duration fits in `c` slots; its weight is the duration truncated to
//! whole slots.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnapsackItem {
    pub duration: u32,
    pub utility: f64,
}

#[derive(Debug, Clone)]
pub struct KnapsackTable {
    items: Vec<KnapsackItem>,
    slot_minutes: u32,
    capacity: usize,
    dp: Vec<Vec<f64>>,
}

impl KnapsackTable {
    /// A zero `slot_minutes` is clamped to one minute.
    pub fn build(items: &[KnapsackItem], capacity: usize, slot_minutes: u32) -> Self {
        let slot_minutes = slot_minutes.max(1);
        let n = items.len();
        let mut dp = vec![vec![0.0; capacity + 1]; n + 1];

        for (i, item) in items.iter().enumerate() {
            let row = i + 1;
            let weight = (item.duration / slot_minutes) as usize;
            for c in 0..=capacity {
                let exclude = dp[row - 1][c];
                let fits = item.duration as u64 <= c as u64 * slot_minutes as u64;
                dp[row][c] = if fits {
                    let include = dp[row - 1][c - weight] + item.utility;
                    if include > exclude { include } else { exclude }
                } else {
                    exclude
                };
            }
        }

        Self {
            items: items.to_vec(),
            slot_minutes,
            capacity,
            dp,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    pub fn value(&self, items: usize, capacity: usize) -> f64 {
        self.dp[items][capacity]
    }

    /// Bottom-right cell.
    pub fn best(&self) -> f64 {
        self.dp[self.items.len()][self.capacity]
    }

    /// Indices of the chosen items, last item first.
    pub fn backtrack(&self) -> Vec<usize> {
        let mut chosen = Vec::new();
        let mut c = self.capacity;
        for row in (1..=self.items.len()).rev() {
            if self.dp[row][c] != self.dp[row - 1][c] {
                chosen.push(row - 1);
                c -= (self.items[row - 1].duration / self.slot_minutes) as usize;
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(duration: u32, utility: f64) -> KnapsackItem {
        KnapsackItem { duration, utility }
    }

    #[test]
    fn test_picks_best_subset() {
        // 4 slots: {60, 60} = 3.0 beats {120} = 2.5
        let items = [item(60, 1.5), item(120, 2.5), item(60, 1.5)];
        let table = KnapsackTable::build(&items, 4, 30);
        assert!((table.best() - 3.0).abs() < 1e-9);
        let mut chosen = table.backtrack();
        chosen.sort();
        assert_eq!(chosen, vec![0, 2]);
    }

    #[test]
    fn test_zero_capacity_selects_nothing() {
        let table = KnapsackTable::build(&[item(30, 2.0)], 0, 30);
        assert_eq!(table.best(), 0.0);
        assert!(table.backtrack().is_empty());
    }

    #[test]
    fn test_item_longer_than_capacity_never_fits() {
        let table = KnapsackTable::build(&[item(150, 9.0), item(30, 0.1)], 4, 30);
        assert!((table.best() - 0.1).abs() < 1e-9);
        assert_eq!(table.backtrack(), vec![1]);
    }

    #[test]
    fn test_uneven_duration_needs_real_minutes() {
        // 45 minutes weighs one slot but does not fit in one 30-minute slot.
        let table = KnapsackTable::build(&[item(45, 1.0)], 1, 30);
        assert_eq!(table.best(), 0.0);
        let table = KnapsackTable::build(&[item(45, 1.0)], 2, 30);
        assert_eq!(table.value(1, 2), 1.0);
    }

    #[test]
    fn test_zero_slot_is_one_minute() {
        let table = KnapsackTable::build(&[item(3, 1.0), item(2, 0.5)], 4, 0);
        assert_eq!(table.slot_minutes(), 1);
        assert_eq!(table.best(), 1.0);
        assert_eq!(table.backtrack(), vec![0]);
    }
}
