//! Turns a schedule into calendar events and hands them to a sink.
//!
//! The scheduler itself never talks to a calendar; this module is the caller
//! that composes its output with one.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use dayplan_core::time::minutes_to_naive_time;
use dayplan_core::ScheduleOutcome;
use std::io::Write;

use crate::config::ReminderOverride;

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub attendees: Vec<String>,
    pub reminders: Vec<ReminderOverride>,
}

/// Accepts events and returns an opaque link or id for each.
pub trait CalendarSink {
    fn insert(&mut self, event: &CalendarEvent) -> Result<String>;
}

pub struct EventOptions<'a> {
    pub date: NaiveDate,
    pub tz: Tz,
    pub prefix: &'a str,
    pub attendees: &'a [String],
    pub reminders: &'a [ReminderOverride],
}

fn local_to_utc(date: NaiveDate, minutes: u32, tz: Tz) -> Result<DateTime<Utc>> {
    let Some(t) = minutes_to_naive_time(minutes) else {
        bail!("schedule runs past midnight ({minutes} minutes)");
    };
    let local = tz
        .from_local_datetime(&date.and_time(t))
        .single()
        .with_context(|| format!("ambiguous or invalid local time (DST?): {date} {t} {tz}"))?;
    Ok(local.with_timezone(&Utc))
}

/// One event per scheduled task, summaries numbered in run order.
pub fn plan_to_events(outcome: &ScheduleOutcome, opts: &EventOptions<'_>) -> Result<Vec<CalendarEvent>> {
    outcome
        .order
        .iter()
        .enumerate()
        .map(|(i, t)| -> Result<CalendarEvent> {
            Ok(CalendarEvent {
                uid: format!("dayplan-{}-{}@dayplan", opts.date.format("%Y%m%d"), t.id.0),
                start_utc: local_to_utc(opts.date, t.start, opts.tz)?,
                end_utc: local_to_utc(opts.date, t.end, opts.tz)?,
                summary: format!("{}{}: {}", opts.prefix, i + 1, t.description),
                description: format!(
                    "{}\nTaskId: {}\nUtility: {:.2}\nFixed: {}\n",
                    t.description, t.id.0, t.utility, t.fixed
                ),
                attendees: opts.attendees.to_vec(),
                reminders: opts.reminders.to_vec(),
            })
        })
        .collect()
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

fn vevent(e: &CalendarEvent) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VEVENT\n");
    s.push_str(&format!("UID:{}\n", e.uid));
    s.push_str(&format!("DTSTART:{}\n", e.start_utc.format("%Y%m%dT%H%M%SZ")));
    s.push_str(&format!("DTEND:{}\n", e.end_utc.format("%Y%m%dT%H%M%SZ")));
    s.push_str(&format!("SUMMARY:{}\n", escape_ics(&e.summary)));
    s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.description)));
    for a in &e.attendees {
        s.push_str(&format!("ATTENDEE;RSVP=TRUE:mailto:{a}\n"));
    }
    for r in &e.reminders {
        let action = match r.method.as_str() {
            "email" => "EMAIL",
            _ => "DISPLAY",
        };
        s.push_str("BEGIN:VALARM\n");
        s.push_str(&format!("ACTION:{action}\n"));
        s.push_str(&format!("TRIGGER:-PT{}M\n", r.minutes));
        s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.summary)));
        if action == "EMAIL" {
            s.push_str(&format!("SUMMARY:{}\n", escape_ics(&e.summary)));
            for a in &e.attendees {
                s.push_str(&format!("ATTENDEE:mailto:{a}\n"));
            }
        }
        s.push_str("END:VALARM\n");
    }
    s.push_str("END:VEVENT\n");
    s
}

pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//Dayplan//EN\n");
    for e in events {
        s.push_str(&vevent(e));
    }
    s.push_str("END:VCALENDAR\n");
    s
}

/// Collects events into one ICS document.
#[derive(Debug, Default)]
pub struct IcsSink {
    events: Vec<CalendarEvent>,
}

impl IcsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_ics(&self) -> String {
        events_to_ics(&self.events)
    }
}

impl CalendarSink for IcsSink {
    fn insert(&mut self, event: &CalendarEvent) -> Result<String> {
        self.events.push(event.clone());
        Ok(event.uid.clone())
    }
}

/// Imports each event into Google Calendar through `gcalcli import`.
///
/// Requires `gcalcli` installed and authenticated on the machine.
pub struct GcalcliSink {
    calendar: Option<String>,
}

impl GcalcliSink {
    pub fn new(calendar: Option<String>) -> Result<Self> {
        if which::which("gcalcli").is_err() {
            bail!(
                "gcalcli is not installed. Install it, authenticate, then retry.\n\nmacOS (brew):  brew install gcalcli\nUbuntu (pipx): pipx install gcalcli\n\nOr use: dayplan calendar export-ics --out schedule.ics"
            );
        }
        Ok(Self { calendar })
    }
}

impl CalendarSink for GcalcliSink {
    fn insert(&mut self, event: &CalendarEvent) -> Result<String> {
        let ics = events_to_ics(std::slice::from_ref(event));

        let mut cmd = std::process::Command::new("gcalcli");
        cmd.arg("import");
        if let Some(cal) = &self.calendar {
            cmd.args(["--calendar", cal]);
        }

        let mut child = cmd
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .context("spawning gcalcli import")?;

        {
            let stdin = child.stdin.as_mut().context("no stdin")?;
            stdin
                .write_all(ics.as_bytes())
                .context("writing ICS to gcalcli")?;
        }

        let status = child.wait().context("waiting on gcalcli")?;
        if !status.success() {
            bail!("gcalcli import failed for {}: {status}", event.summary);
        }

        Ok(format!("gcalcli:{}", event.uid))
    }
}

/// Push every event into `sink`, returning the ids it hands back.
pub fn publish(sink: &mut dyn CalendarSink, events: &[CalendarEvent]) -> Result<Vec<String>> {
    events.iter().map(|e| sink.insert(e)).collect()
}
