//! Task model: raw task definitions, the resolved task record, and the task list
//! that owns records and their dependency references.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::scoring::ScoreTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InQueue,
    InProgress,
    Completed,
}

/// A task as it appears in a task file, with dependencies given by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: TaskId,
    pub description: String,

    /// Minutes.
    pub duration: u32,

    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Fixed start hour (0-23); absent for flexible tasks.
    #[serde(default, alias = "fixed_time", skip_serializing_if = "Option::is_none")]
    pub time: Option<u8>,
}

impl RawTask {
    pub fn new(id: u32, description: impl Into<String>, duration: u32) -> Self {
        Self {
            id: TaskId(id),
            description: description.into(),
            duration,
            dependencies: Vec::new(),
            time: None,
        }
    }

    pub fn with_dependencies(mut self, ids: &[u32]) -> Self {
        self.dependencies = ids.iter().copied().map(TaskId).collect();
        self
    }

    pub fn at_hour(mut self, hour: u8) -> Self {
        self.time = Some(hour);
        self
    }
}

/// A prepared task. `dependencies` hold positions in the owning [`TaskList`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub description: String,
    pub duration: u32,
    pub dependencies: Vec<usize>,
    pub status: TaskStatus,
    pub fixed_time: Option<u8>,
}

impl TaskRecord {
    pub fn is_fixed(&self) -> bool {
        self.fixed_time.is_some()
    }

    /// Scheduled start in minutes after midnight, for fixed-time tasks.
    pub fn fixed_start(&self) -> Option<u32> {
        self.fixed_time.map(crate::time::hour_to_minutes)
    }
}

/// Owns every record of one day's task set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskList {
    records: Vec<TaskRecord>,
    by_id: HashMap<TaskId, usize>,
}

impl TaskList {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> &TaskRecord {
        &self.records[position]
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> &mut TaskRecord {
        &mut self.records[position]
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn by_id(&self, id: TaskId) -> Option<&TaskRecord> {
        self.position(id).map(|p| &self.records[p])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn dependencies_of(&self, position: usize) -> impl Iterator<Item = &TaskRecord> {
        self.records[position]
            .dependencies
            .iter()
            .map(|&p| &self.records[p])
    }

    pub fn fixed(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|t| t.is_fixed())
    }

    pub fn flexible(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|t| !t.is_fixed())
    }

    pub fn reset_statuses(&mut self) {
        for t in self.records.iter_mut() {
            t.status = TaskStatus::NotStarted;
        }
    }
}

/// Turn raw task definitions into a [`TaskList`], resolving dependency ids.
///
/// The dependency graph is scored once here so that cycles are rejected before
/// any scheduling pass runs.
pub fn prepare_tasks(raw: &[RawTask]) -> Result<TaskList> {
    let mut by_id = HashMap::with_capacity(raw.len());
    for (pos, t) in raw.iter().enumerate() {
        if by_id.insert(t.id, pos).is_some() {
            return Err(ScheduleError::DuplicateTaskId(t.id));
        }
        if t.duration == 0 {
            return Err(ScheduleError::InvalidDuration(t.id));
        }
        if let Some(hour) = t.time {
            if hour > 23 {
                return Err(ScheduleError::InvalidFixedTime { task: t.id, hour });
            }
        }
    }

    let mut records = Vec::with_capacity(raw.len());
    for t in raw {
        let dependencies = t
            .dependencies
            .iter()
            .map(|dep| {
                by_id
                    .get(dep)
                    .copied()
                    .ok_or(ScheduleError::MissingDependency {
                        task: t.id,
                        dependency: *dep,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        records.push(TaskRecord {
            id: t.id,
            description: t.description.clone(),
            duration: t.duration,
            dependencies,
            status: TaskStatus::NotStarted,
            fixed_time: t.time,
        });
    }

    let list = TaskList { records, by_id };
    ScoreTable::compute(&list)?;
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_resolve_to_positions() {
        let raw = vec![
            RawTask::new(10, "wake up", 30),
            RawTask::new(20, "brush teeth", 30).with_dependencies(&[10]),
        ];
        let list = prepare_tasks(&raw).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).dependencies, vec![0]);
        assert_eq!(list.dependencies_of(1).next().unwrap().id, TaskId(10));
        assert_eq!(list.position(TaskId(20)), Some(1));
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let raw = vec![RawTask::new(1, "lunch", 30).with_dependencies(&[7])];
        let err = prepare_tasks(&raw).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::MissingDependency {
                task: TaskId(1),
                dependency: TaskId(7)
            }
        );
    }

    #[test]
    fn test_duplicate_and_zero_duration_rejected() {
        let dup = vec![RawTask::new(1, "a", 30), RawTask::new(1, "b", 30)];
        assert_eq!(
            prepare_tasks(&dup).unwrap_err(),
            ScheduleError::DuplicateTaskId(TaskId(1))
        );

        let zero = vec![RawTask::new(3, "nothing", 0)];
        assert_eq!(
            prepare_tasks(&zero).unwrap_err(),
            ScheduleError::InvalidDuration(TaskId(3))
        );
    }

    #[test]
    fn test_invalid_hour_rejected() {
        let raw = vec![RawTask::new(1, "late class", 60).at_hour(24)];
        assert!(matches!(
            prepare_tasks(&raw),
            Err(ScheduleError::InvalidFixedTime { hour: 24, .. })
        ));
    }

    #[test]
    fn test_cycle_rejected_at_preparation() {
        let raw = vec![
            RawTask::new(1, "a", 30).with_dependencies(&[2]),
            RawTask::new(2, "b", 30).with_dependencies(&[1]),
        ];
        assert!(matches!(
            prepare_tasks(&raw),
            Err(ScheduleError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_partition_views_are_exclusive() {
        let raw = vec![
            RawTask::new(1, "class", 90).at_hour(11),
            RawTask::new(2, "nap", 90),
            RawTask::new(3, "midnight call", 30).at_hour(0),
        ];
        let list = prepare_tasks(&raw).unwrap();
        let fixed: Vec<_> = list.fixed().map(|t| t.id.0).collect();
        let flexible: Vec<_> = list.flexible().map(|t| t.id.0).collect();
        assert_eq!(fixed, vec![1, 3]);
        assert_eq!(flexible, vec![2]);
        assert_eq!(list.get(0).fixed_start(), Some(660));
    }

    #[test]
    fn test_raw_task_from_json() {
        let json = r#"[
            {"id": 1, "description": "CS110 @ 5AM", "duration": 120, "dependencies": [], "time": 5},
            {"id": 2, "description": "Eat cereal", "duration": 30, "dependencies": [1]},
            {"id": 3, "description": "Wake up", "duration": 30, "fixed_time": 4}
        ]"#;
        let raw: Vec<RawTask> = serde_json::from_str(json).unwrap();
        assert_eq!(raw[0].time, Some(5));
        assert_eq!(raw[1].dependencies, vec![TaskId(1)]);
        assert_eq!(raw[2].time, Some(4));
        assert!(raw[2].dependencies.is_empty());
    }
}
