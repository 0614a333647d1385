//! Unimportance scoring.
//!
//! `unimportance = deps + duration/60 + sum(unimportance(dep))`, and
//! `utility = 1 / unimportance`. Lower unimportance means a task matters more.
//!
//! Dependencies only feed the score; they do not constrain execution order.

use crate::error::{Result, ScheduleError};
use crate::task::TaskList;

/// Unimportance of the container's empty-slot sentinel.
pub const SENTINEL_UNIMPORTANCE: f64 = f64::INFINITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Unimportance of every task in a list, computed once per scheduling run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    unimportance: Vec<f64>,
}

impl ScoreTable {
    pub fn compute(tasks: &TaskList) -> Result<Self> {
        let mut unimportance = vec![0.0; tasks.len()];
        let mut marks = vec![Mark::Unvisited; tasks.len()];

        for pos in 0..tasks.len() {
            score(tasks, pos, &mut marks, &mut unimportance)?;
        }

        Ok(Self { unimportance })
    }

    pub fn unimportance(&self, position: usize) -> f64 {
        self.unimportance[position]
    }

    pub fn utility(&self, position: usize) -> f64 {
        utility_of(self.unimportance[position])
    }

    pub fn len(&self) -> usize {
        self.unimportance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unimportance.is_empty()
    }
}

/// Reciprocal of an unimportance score. The sentinel maps to zero.
pub fn utility_of(unimportance: f64) -> f64 {
    1.0 / unimportance
}

fn score(tasks: &TaskList, pos: usize, marks: &mut [Mark], out: &mut [f64]) -> Result<f64> {
    match marks[pos] {
        Mark::Done => return Ok(out[pos]),
        Mark::Visiting => {
            return Err(ScheduleError::CyclicDependency {
                task: tasks.get(pos).id,
            });
        }
        Mark::Unvisited => {}
    }

    marks[pos] = Mark::Visiting;
    let task = tasks.get(pos);
    let mut total = task.dependencies.len() as f64 + task.duration as f64 / 60.0;
    for &dep in &task.dependencies {
        total += score(tasks, dep, marks, out)?;
    }
    marks[pos] = Mark::Done;
    out[pos] = total;
    Ok(total)
}
