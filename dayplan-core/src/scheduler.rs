//! Scheduler engine: greedy and dynamic-programming passes over one day.
//!
//! Both passes work on a simulated clock (minutes after midnight) bounded by
//! `start + window`. A task that would finish after the window closes is never
//! started; it lands in [`ScheduleOutcome::skipped`] instead of the order.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::heap::MaxHeap;
use crate::knapsack::{KnapsackItem, KnapsackTable};
use crate::queue::QueueEntry;
use crate::scoring::ScoreTable;
use crate::task::{TaskId, TaskList, TaskStatus};
use crate::time::format_clock;

pub const DEFAULT_WINDOW_MINUTES: u32 = 7 * 60;
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Greedy,
    #[serde(alias = "dp")]
    DynamicProgramming,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Greedy => write!(f, "greedy"),
            Strategy::DynamicProgramming => write!(f, "dynamic programming"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub description: String,
    pub start: u32,
    pub end: u32,
    pub utility: f64,
    pub fixed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeBlock {
    pub start: u32,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleOutcome {
    pub strategy: Strategy,
    pub start: u32,
    pub window_end: u32,
    pub order: Vec<ScheduledTask>,
    pub free_time: Vec<FreeBlock>,
    pub skipped: Vec<TaskId>,
    pub total_utility: f64,
    pub finished_at: u32,
}

impl ScheduleOutcome {
    pub fn ids(&self) -> Vec<TaskId> {
        self.order.iter().map(|t| t.id).collect()
    }

    pub fn total_minutes(&self) -> u32 {
        self.finished_at - self.start
    }
}

/// One scheduling pass in progress: clock, window and what has been emitted.
struct Run<'a> {
    tasks: &'a mut TaskList,
    scores: &'a ScoreTable,
    verbose: bool,
    clock: u32,
    window_end: u32,
    order: Vec<ScheduledTask>,
    free_time: Vec<FreeBlock>,
    skipped: Vec<TaskId>,
}

impl Run<'_> {
    fn narrate(&self, msg: fmt::Arguments<'_>) {
        if self.verbose {
            info!("{msg}");
        } else {
            debug!("{msg}");
        }
    }

    /// Simulate `position` from the current clock. Returns false (clock
    /// untouched) when it would overrun the window.
    fn execute(&mut self, position: usize) -> bool {
        let utility = self.scores.utility(position);
        let task = self.tasks.get_mut(position);
        let start = self.clock;
        let end = start.saturating_add(task.duration);

        if end > self.window_end {
            task.status = TaskStatus::NotStarted;
            let id = task.id;
            self.skipped.push(id);
            self.narrate(format_args!(
                "t={} skipped {id}: would end at {}, window closes at {}",
                format_clock(start),
                format_clock(end),
                format_clock(self.window_end)
            ));
            return false;
        }

        task.status = TaskStatus::InProgress;
        let scheduled = ScheduledTask {
            id: task.id,
            description: task.description.clone(),
            start,
            end,
            utility,
            fixed: task.is_fixed(),
        };
        task.status = TaskStatus::Completed;

        self.narrate(format_args!(
            "t={} started '{}' for {} mins",
            format_clock(start),
            scheduled.description,
            end - start
        ));
        self.narrate(format_args!(
            "t={} completed '{}' with utility {:.2}",
            format_clock(end),
            scheduled.description,
            utility
        ));

        self.order.push(scheduled);
        self.clock = end;
        true
    }

    /// Idle until `until` if the gap stays inside the window.
    fn rest_until(&mut self, until: u32) {
        if until <= self.clock || until > self.window_end {
            return;
        }
        let minutes = until - self.clock;
        self.narrate(format_args!(
            "t={} free time for {minutes} mins",
            format_clock(self.clock)
        ));
        self.free_time.push(FreeBlock {
            start: self.clock,
            minutes,
        });
        self.clock = until;
    }

    /// Run a fixed-time task at `max(clock, its hour)`, or skip it when it
    /// cannot finish inside the window from there.
    fn execute_fixed(&mut self, position: usize) -> bool {
        let task = self.tasks.get(position);
        let at = task.fixed_start().unwrap_or(self.clock).max(self.clock);
        if at.saturating_add(task.duration) > self.window_end {
            let task = self.tasks.get_mut(position);
            task.status = TaskStatus::NotStarted;
            let id = task.id;
            self.skipped.push(id);
            self.narrate(format_args!(
                "skipped fixed task {id}: its slot at {} does not fit the window",
                format_clock(at)
            ));
            return false;
        }
        self.rest_until(at);
        self.execute(position)
    }

    fn finish(mut self, strategy: Strategy, start: u32) -> ScheduleOutcome {
        let total_utility: f64 = self.order.iter().map(|t| t.utility).sum();
        self.narrate(format_args!(
            "completed all planned tasks in {} (total utility {:.2})",
            format_clock(self.clock - start),
            total_utility
        ));
        self.skipped.sort();
        self.skipped.dedup();
        ScheduleOutcome {
            strategy,
            start,
            window_end: self.window_end,
            order: self.order,
            free_time: self.free_time,
            skipped: self.skipped,
            total_utility,
            finished_at: self.clock,
        }
    }
}

/// Owns one day's tasks and the two priority queues built from them.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tasks: TaskList,
    window_minutes: u32,
    slot_minutes: u32,
    flexible: MaxHeap<QueueEntry>,
    fixed: MaxHeap<QueueEntry>,
}

impl Scheduler {
    pub fn new(tasks: TaskList) -> Self {
        Self {
            tasks,
            window_minutes: DEFAULT_WINDOW_MINUTES,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            flexible: MaxHeap::new(),
            fixed: MaxHeap::new(),
        }
    }

    pub fn with_window(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    /// Slot size for the DP capacity dimension. Zero is clamped to one minute.
    pub fn with_slot_minutes(mut self, minutes: u32) -> Self {
        self.slot_minutes = minutes.max(1);
        self
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    pub fn flexible_queue(&self) -> &MaxHeap<QueueEntry> {
        &self.flexible
    }

    pub fn fixed_queue(&self) -> &MaxHeap<QueueEntry> {
        &self.fixed
    }

    /// Put every task back to `NotStarted` and empty both queues.
    pub fn reset(&mut self) {
        self.tasks.reset_statuses();
        self.flexible.clear();
        self.fixed.clear();
    }

    /// Rebuild both queues from every task that has not completed yet.
    ///
    /// # Panics
    /// If the queues do not partition the remaining tasks by fixed time.
    pub fn get_tasks_ready(&mut self, scores: &ScoreTable) {
        self.flexible.clear();
        self.fixed.clear();

        let mut completed = 0;
        for pos in 0..self.tasks.len() {
            let task = self.tasks.get_mut(pos);
            if task.status == TaskStatus::Completed {
                completed += 1;
                continue;
            }
            match task.fixed_time {
                Some(hour) => self.fixed.push(QueueEntry::fixed(pos, task.id, hour)),
                None => self
                    .flexible
                    .push(QueueEntry::flexible(pos, task.id, scores.utility(pos))),
            }
            task.status = TaskStatus::InQueue;
        }

        assert_eq!(
            self.fixed.len() + self.flexible.len() + completed,
            self.tasks.len(),
            "every task must be queued or already completed"
        );
        assert!(self.fixed.iter().all(|e| self.tasks.get(e.position).is_fixed()));
        assert!(self.flexible.iter().all(|e| !self.tasks.get(e.position).is_fixed()));
    }

    pub fn run(&mut self, strategy: Strategy, start: u32, verbose: bool) -> Result<ScheduleOutcome> {
        match strategy {
            Strategy::Greedy => self.run_greedy(start, verbose),
            Strategy::DynamicProgramming => self.run_dynamic_programming(start, verbose),
        }
    }

    /// Interleave the flexible queue (by utility) with the fixed queue (by
    /// hour): the best flexible task runs now unless it would eat into the
    /// next fixed task's start, in which case the fixed task goes first.
    pub fn run_greedy(&mut self, start: u32, verbose: bool) -> Result<ScheduleOutcome> {
        let scores = ScoreTable::compute(&self.tasks)?;
        self.get_tasks_ready(&scores);

        let mut run = Run {
            tasks: &mut self.tasks,
            scores: &scores,
            verbose,
            clock: start,
            window_end: start.saturating_add(self.window_minutes),
            order: Vec::new(),
            free_time: Vec::new(),
            skipped: Vec::new(),
        };
        run.narrate(format_args!("running greedy scheduler from {}", format_clock(start)));

        while !self.flexible.is_empty() && !self.fixed.is_empty() {
            let flexible = *self.flexible.peek_max()?;
            let fixed = *self.fixed.peek_max()?;

            let flexible_end = run
                .clock
                .saturating_add(run.tasks.get(flexible.position).duration);
            let fixed_start = run.tasks.get(fixed.position).fixed_start().unwrap_or(run.clock);

            if flexible_end > fixed_start {
                let next = self.fixed.pop_max()?;
                run.execute_fixed(next.position);
            } else {
                let next = self.flexible.pop_max()?;
                run.execute(next.position);
            }
        }

        while !self.fixed.is_empty() {
            let next = self.fixed.pop_max()?;
            run.execute_fixed(next.position);
        }

        while !self.flexible.is_empty() {
            let next = self.flexible.pop_max()?;
            run.execute(next.position);
        }

        Ok(run.finish(Strategy::Greedy, start))
    }

    /// Between consecutive fixed-time anchors, pick the flexible subset with
    /// the best total utility that fits the gap (a slot-based knapsack), run it
    /// by utility, then run the anchor.
    pub fn run_dynamic_programming(&mut self, start: u32, verbose: bool) -> Result<ScheduleOutcome> {
        let scores = ScoreTable::compute(&self.tasks)?;
        self.get_tasks_ready(&scores);

        let slot = self.slot_minutes;
        let window_end = start.saturating_add(self.window_minutes);

        // Working copy of the flexible tasks; entries leave it as they run.
        let mut working: Vec<QueueEntry> = self.flexible.iter().copied().collect();
        self.flexible.clear();

        let mut run = Run {
            tasks: &mut self.tasks,
            scores: &scores,
            verbose,
            clock: start,
            window_end,
            order: Vec::new(),
            free_time: Vec::new(),
            skipped: Vec::new(),
        };
        run.narrate(format_args!(
            "running dynamic programming scheduler from {}",
            format_clock(start)
        ));

        while !self.fixed.is_empty() && run.clock < window_end {
            working.sort_by_key(|e| (run.tasks.get(e.position).duration, e.id));

            let anchor = self.fixed.pop_max()?;
            let anchor_start = run
                .tasks
                .get(anchor.position)
                .fixed_start()
                .unwrap_or(run.clock);
            let boundary = anchor_start.min(window_end);
            let capacity = (boundary.saturating_sub(run.clock) / slot) as usize;

            run_segment(&mut run, &mut working, capacity, slot, boundary)?;

            if anchor_start < window_end {
                run.execute_fixed(anchor.position);
            } else {
                run.skipped.push(anchor.id);
                run.tasks.get_mut(anchor.position).status = TaskStatus::NotStarted;
            }
        }

        // Anchors the window never reached.
        while let Ok(anchor) = self.fixed.pop_max() {
            run.skipped.push(anchor.id);
            run.tasks.get_mut(anchor.position).status = TaskStatus::NotStarted;
        }

        if run.clock < window_end && !working.is_empty() {
            working.sort_by_key(|e| (run.tasks.get(e.position).duration, e.id));
            let capacity = ((window_end - run.clock) / slot) as usize;
            run_segment(&mut run, &mut working, capacity, slot, window_end)?;
        }

        for entry in working {
            run.skipped.push(entry.id);
            run.tasks.get_mut(entry.position).status = TaskStatus::NotStarted;
        }

        Ok(run.finish(Strategy::DynamicProgramming, start))
    }
}

/// Choose the best-utility subset of `working` for `capacity` slots and run it
/// highest utility first. A chosen task that would run past `boundary` stays in
/// `working` for a later segment.
fn run_segment(
    run: &mut Run<'_>,
    working: &mut Vec<QueueEntry>,
    capacity: usize,
    slot_minutes: u32,
    boundary: u32,
) -> Result<()> {
    if capacity == 0 || working.is_empty() {
        return Ok(());
    }

    // Enough slots for every candidate at once.
    let needed: usize = working
        .iter()
        .map(|e| run.tasks.get(e.position).duration.div_ceil(slot_minutes) as usize)
        .sum();
    let capacity = capacity.min(needed);

    let items: Vec<KnapsackItem> = working
        .iter()
        .map(|e| KnapsackItem {
            duration: run.tasks.get(e.position).duration,
            utility: run.scores.utility(e.position),
        })
        .collect();
    let table = KnapsackTable::build(&items, capacity, slot_minutes);
    debug!(
        capacity,
        candidates = items.len(),
        best = table.best(),
        "built knapsack table"
    );

    let mut chosen = MaxHeap::new();
    for i in table.backtrack() {
        chosen.push(working[i]);
    }

    while !chosen.is_empty() {
        let entry = chosen.pop_max()?;
        let duration = run.tasks.get(entry.position).duration;
        if run.clock.saturating_add(duration) > boundary {
            run.narrate(format_args!(
                "t={} deferred {}: would run past {}",
                format_clock(run.clock),
                entry.id,
                format_clock(boundary)
            ));
            continue;
        }
        working.retain(|e| e.position != entry.position);
        run.execute(entry.position);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{prepare_tasks, RawTask};

    fn scheduler(raw: &[RawTask]) -> Scheduler {
        Scheduler::new(prepare_tasks(raw).unwrap())
    }

    fn ids(outcome: &ScheduleOutcome) -> Vec<u32> {
        outcome.order.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn test_get_tasks_ready_partitions_tasks() {
        let mut s = scheduler(&[
            RawTask::new(1, "class", 90).at_hour(11),
            RawTask::new(2, "nap", 90),
            RawTask::new(3, "lunch", 30),
        ]);
        let scores = ScoreTable::compute(s.tasks()).unwrap();
        s.get_tasks_ready(&scores);

        assert_eq!(s.fixed_queue().len(), 1);
        assert_eq!(s.flexible_queue().len(), 2);
        assert!(s.tasks().iter().all(|t| t.status == TaskStatus::InQueue));
    }

    #[test]
    fn test_greedy_flexible_only_runs_by_utility() {
        let mut s = scheduler(&[
            RawTask::new(1, "long", 120),
            RawTask::new(2, "short", 30),
            RawTask::new(3, "medium", 60),
        ]);
        let out = s.run_greedy(480, false).unwrap();
        assert_eq!(ids(&out), vec![2, 3, 1]);
        assert_eq!(out.finished_at, 480 + 210);
        assert!(out.skipped.is_empty());
        assert!(s.tasks().iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[test]
    fn test_greedy_inserts_free_time_before_fixed_task() {
        let mut s = scheduler(&[
            RawTask::new(1, "standup", 30).at_hour(10),
            RawTask::new(2, "deep work", 120),
        ]);
        let out = s.run_greedy(540, false).unwrap();
        assert_eq!(ids(&out), vec![1, 2]);
        assert_eq!(
            out.free_time,
            vec![FreeBlock {
                start: 540,
                minutes: 60
            }]
        );
        assert_eq!(out.order[0].start, 600);
        assert_eq!(out.order[1].start, 630);
    }

    #[test]
    fn test_greedy_skips_task_past_window_without_advancing_clock() {
        let mut s = scheduler(&[RawTask::new(1, "short", 30), RawTask::new(2, "marathon", 300)])
            .with_window(120);
        let out = s.run_greedy(0, false).unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(out.skipped, vec![TaskId(2)]);
        assert_eq!(out.finished_at, 30);
        assert_eq!(
            s.tasks().by_id(TaskId(2)).unwrap().status,
            TaskStatus::NotStarted
        );
    }

    #[test]
    fn test_dp_without_fixed_tasks_uses_whole_window() {
        // 3 slots: {60, 30} beats {90}
        let mut s = scheduler(&[
            RawTask::new(1, "ninety", 90),
            RawTask::new(2, "sixty", 60),
            RawTask::new(3, "thirty", 30),
        ])
        .with_window(90);
        let out = s.run_dynamic_programming(0, false).unwrap();
        assert_eq!(ids(&out), vec![3, 2]);
        assert_eq!(out.skipped, vec![TaskId(1)]);
        let expected = 2.0 + 1.0;
        assert!((out.total_utility - expected).abs() < 1e-9);
    }

    #[test]
    fn test_dp_runs_anchor_at_its_hour_and_fills_after() {
        let mut s = scheduler(&[
            RawTask::new(1, "meeting", 60).at_hour(9),
            RawTask::new(2, "email", 30),
            RawTask::new(3, "report", 60),
        ])
        .with_window(240);
        let out = s.run_dynamic_programming(480, false).unwrap();

        assert_eq!(ids(&out), vec![2, 1, 3]);
        assert_eq!(out.order[1].start, 540);
        assert_eq!(out.free_time, vec![FreeBlock { start: 510, minutes: 30 }]);
        assert_eq!(out.order[2].start, 600);
        assert!(out.order[1].fixed);
    }

    #[test]
    fn test_dp_skips_anchor_outside_window() {
        let mut s = scheduler(&[
            RawTask::new(1, "evening class", 60).at_hour(20),
            RawTask::new(2, "email", 30),
        ])
        .with_window(120);
        let out = s.run_dynamic_programming(480, false).unwrap();
        assert_eq!(ids(&out), vec![2]);
        assert_eq!(out.skipped, vec![TaskId(1)]);
    }

    #[test]
    fn test_completed_tasks_stay_out_of_second_pass() {
        let mut s = scheduler(&[RawTask::new(1, "short", 30), RawTask::new(2, "long", 240)])
            .with_window(60);
        let first = s.run_greedy(0, false).unwrap();
        assert_eq!(ids(&first), vec![1]);

        let second = s.with_window(300).run_greedy(0, false).unwrap();
        assert_eq!(ids(&second), vec![2]);
    }

    #[test]
    fn test_dp_defers_task_that_would_delay_anchor() {
        // 50-minute tasks weigh one slot each, so both are chosen for the
        // 7:30-9:00 gap even though only one fits.
        let mut s = scheduler(&[
            RawTask::new(1, "a", 50),
            RawTask::new(2, "b", 50),
            RawTask::new(3, "f", 30).at_hour(9),
            RawTask::new(4, "g", 30).at_hour(10),
        ])
        .with_window(240);
        let out = s.run_dynamic_programming(450, false).unwrap();

        for t in out.order.iter().filter(|t| t.fixed) {
            let hour = s.tasks().by_id(t.id).unwrap().fixed_time.unwrap();
            assert_eq!(t.start, u32::from(hour) * 60, "{} started off its hour", t.id);
        }
        // b waits out both anchors and runs in the trailing segment.
        assert_eq!(ids(&out), vec![1, 3, 4, 2]);
        assert_eq!(out.order[3].start, 630);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_huge_window_saturates() {
        let raw = [
            RawTask::new(1, "standup", 30).at_hour(9),
            RawTask::new(2, "deep work", 120),
        ];
        for strategy in [Strategy::Greedy, Strategy::DynamicProgramming] {
            let mut s = scheduler(&raw).with_window(u32::MAX);
            let out = s.run(strategy, 240, false).unwrap();
            assert_eq!(out.window_end, u32::MAX);
            assert_eq!(out.order.len(), 2, "{strategy}");
            assert!(out.skipped.is_empty(), "{strategy}");
        }
    }

    #[test]
    fn test_strategy_serde_names() {
        let s: Strategy = serde_json::from_str("\"dp\"").unwrap();
        assert_eq!(s, Strategy::DynamicProgramming);
        let s: Strategy = serde_json::from_str("\"greedy\"").unwrap();
        assert_eq!(s, Strategy::Greedy);
    }
}
