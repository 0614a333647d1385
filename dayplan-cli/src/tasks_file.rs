use anyhow::{Context, Result};
use dayplan_core::{format_clock, prepare_tasks, RawTask, ScoreTable, TaskList};
use std::fs;
use std::path::Path;

const SAMPLE_DAY: &str = include_str!("../../data/sample_day.json");

/// Read a JSON task file, or the built-in sample day when `path` is `None`.
pub fn load_raw_tasks(path: Option<&Path>) -> Result<Vec<RawTask>> {
    match path {
        Some(p) => {
            let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
            serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
        }
        None => serde_json::from_str(SAMPLE_DAY).context("parse built-in sample day"),
    }
}

pub fn load_tasks(path: Option<&Path>) -> Result<TaskList> {
    let raw = load_raw_tasks(path)?;
    Ok(prepare_tasks(&raw)?)
}

/// Table of every task followed by its dependencies.
pub fn render_task_table(tasks: &TaskList) -> Result<String> {
    let scores = ScoreTable::compute(tasks)?;
    let width = tasks
        .iter()
        .map(|t| t.description.chars().count())
        .max()
        .unwrap_or(0)
        .max("description".len());

    let mut s = String::new();
    s.push_str(&format!(
        "{:>4}  {:<width$}  {:>8}  {:>6}  {:>12}  {:>7}\n",
        "id", "description", "duration", "fixed", "unimportance", "utility"
    ));
    s.push_str(&format!("{}\n", "-".repeat(width + 47)));

    for (pos, t) in tasks.iter().enumerate() {
        let fixed = t
            .fixed_start()
            .map(format_clock)
            .unwrap_or_else(|| "-".to_string());
        s.push_str(&format!(
            "{:>4}  {:<width$}  {:>8}  {:>6}  {:>12.2}  {:>7.3}\n",
            t.id.0,
            t.description,
            t.duration,
            fixed,
            scores.unimportance(pos),
            scores.utility(pos),
        ));
    }

    s.push_str("\nGet these done today!\n");
    for (pos, t) in tasks.iter().enumerate() {
        s.push_str(&format!(
            "-> '{}', duration = {} minutes.\n",
            t.description, t.duration
        ));
        let deps: Vec<_> = tasks.dependencies_of(pos).collect();
        if !deps.is_empty() {
            s.push_str("\tThis task depends on:\n");
            for d in deps {
                s.push_str(&format!(
                    "\t\t-> '{}', duration = {} minutes.\n",
                    d.description, d.duration
                ));
            }
        }
    }

    Ok(s)
}
