use anyhow::{Context, Result};
use dayplan_core::{Strategy, DEFAULT_SLOT_MINUTES, DEFAULT_WINDOW_MINUTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::state::{config_path, ensure_dayplan_home};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleSection,
    pub calendar: CalendarSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// "HH:MM", 24h.
    pub start: String,
    pub window_minutes: u32,
    pub slot_minutes: u32,
    pub strategy: Strategy,
    /// JSON task file; the built-in sample day when unset.
    pub tasks_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// "YYYY-MM-DD"; today in `timezone` when unset.
    pub date: Option<String>,
    pub timezone: String,
    pub title_prefix: String,
    pub attendees: Vec<String>,
    pub reminders: Vec<ReminderOverride>,
    /// Target calendar for `gcalcli import`.
    pub calendar_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// "email" or "popup".
    pub method: String,
    pub minutes: u32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            start: "04:00".to_string(),
            window_minutes: DEFAULT_WINDOW_MINUTES,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            strategy: Strategy::DynamicProgramming,
            tasks_file: None,
        }
    }
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            date: None,
            timezone: "America/Los_Angeles".to_string(),
            title_prefix: String::new(),
            attendees: Vec::new(),
            reminders: vec![
                ReminderOverride {
                    method: "email".to_string(),
                    minutes: 24 * 60,
                },
                ReminderOverride {
                    method: "popup".to_string(),
                    minutes: 10,
                },
            ],
            calendar_name: None,
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    ensure_dayplan_home()?;
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
