use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dayplan_core::{format_clock, parse_clock, ScheduleOutcome, Scheduler, Strategy, TaskList};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod calendar;
mod config;
mod state;
mod tasks_file;

use calendar::{plan_to_events, publish, EventOptions, GcalcliSink, IcsSink};
use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "dayplan",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DAYPLAN_BUILD_SHA"), ")"),
    about = "Single-day task scheduler (greedy and dynamic programming)"
)]
struct Cli {
    /// JSON task file (defaults to config, then the built-in sample day)
    #[arg(long, global = true)]
    tasks: Option<PathBuf>,

    /// Only print results; no step-by-step narration
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tasks with their scores and dependencies
    Tasks,

    /// Schedule the day with one strategy
    Plan {
        #[command(flatten)]
        run: RunArgs,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run both strategies on the same tasks and compare utilities
    Compare {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Turn the plan into calendar events
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },

    /// Manage ~/.dayplan/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Write the plan as an ICS file (stdout when --out is omitted)
    ExportIcs {
        #[command(flatten)]
        run: RunArgs,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import the plan into Google Calendar via gcalcli
    Push {
        #[command(flatten)]
        run: RunArgs,

        /// Target calendar name
        #[arg(long)]
        calendar: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Greedy,
    Dp,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Greedy => Strategy::Greedy,
            StrategyArg::Dp => Strategy::DynamicProgramming,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Start of the day, "HH:MM"
    #[arg(long)]
    start: Option<String>,

    /// Length of the scheduling window in minutes
    #[arg(long)]
    window: Option<u32>,

    /// DP slot size in minutes
    #[arg(long)]
    slot: Option<u32>,
}

/// Config values with command-line overrides applied.
#[derive(Debug, Clone)]
struct RunSettings {
    strategy: Strategy,
    start: u32,
    window: u32,
    slot: u32,
}

impl RunSettings {
    fn resolve(cfg: &Config, args: &RunArgs) -> Result<Self> {
        let start_text = args.start.as_deref().unwrap_or(&cfg.schedule.start);
        let Some(start) = parse_clock(start_text) else {
            bail!("invalid start time '{start_text}', expected HH:MM");
        };
        Ok(Self {
            strategy: args.strategy.map(Strategy::from).unwrap_or(cfg.schedule.strategy),
            start,
            window: args.window.unwrap_or(cfg.schedule.window_minutes),
            slot: args.slot.unwrap_or(cfg.schedule.slot_minutes),
        })
    }

    fn scheduler(&self, tasks: TaskList) -> Scheduler {
        Scheduler::new(tasks)
            .with_window(self.window)
            .with_slot_minutes(self.slot)
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet {
        "dayplan=warn,dayplan_core=warn"
    } else {
        "dayplan=info,dayplan_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let cfg = config::load_config()?;
    let tasks_path = cli
        .tasks
        .clone()
        .or_else(|| cfg.schedule.tasks_file.as_ref().map(PathBuf::from));

    match cli.command {
        Command::Tasks => {
            let tasks = tasks_file::load_tasks(tasks_path.as_deref())?;
            print!("{}", tasks_file::render_task_table(&tasks)?);
        }

        Command::Plan { run, json } => {
            let settings = RunSettings::resolve(&cfg, &run)?;
            let tasks = tasks_file::load_tasks(tasks_path.as_deref())?;
            let outcome = settings
                .scheduler(tasks)
                .run(settings.strategy, settings.start, !json)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
        }

        Command::Compare { run } => {
            let settings = RunSettings::resolve(&cfg, &run)?;
            let tasks = tasks_file::load_tasks(tasks_path.as_deref())?;
            let mut outcomes = Vec::new();
            for strategy in [Strategy::Greedy, Strategy::DynamicProgramming] {
                let outcome = settings
                    .scheduler(tasks.clone())
                    .run(strategy, settings.start, false)?;
                outcomes.push(outcome);
            }
            print_comparison(&outcomes);
        }

        Command::Calendar { command } => match command {
            CalendarCommand::ExportIcs { run, out } => {
                let settings = RunSettings::resolve(&cfg, &run)?;
                let tasks = tasks_file::load_tasks(tasks_path.as_deref())?;
                let outcome = settings
                    .scheduler(tasks)
                    .run(settings.strategy, settings.start, false)?;

                let mut sink = IcsSink::new();
                let ids = publish(&mut sink, &build_events(&cfg, &outcome)?)?;
                let ics = sink.to_ics();
                match out {
                    Some(p) => {
                        fs::write(&p, ics).with_context(|| format!("write {}", p.display()))?;
                        info!("wrote {} events to {}", ids.len(), p.display());
                    }
                    None => print!("{ics}"),
                }
            }
            CalendarCommand::Push { run, calendar } => {
                let settings = RunSettings::resolve(&cfg, &run)?;
                let tasks = tasks_file::load_tasks(tasks_path.as_deref())?;
                let outcome = settings
                    .scheduler(tasks)
                    .run(settings.strategy, settings.start, false)?;

                let events = build_events(&cfg, &outcome)?;
                let mut sink = GcalcliSink::new(calendar.or_else(|| cfg.calendar.calendar_name.clone()))?;
                for id in publish(&mut sink, &events)? {
                    println!("Event created: {id}");
                }
            }
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", state::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn build_events(cfg: &Config, outcome: &ScheduleOutcome) -> Result<Vec<calendar::CalendarEvent>> {
    let tz: Tz = cfg
        .calendar
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {}", cfg.calendar.timezone))?;
    let date = match &cfg.calendar.date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("invalid calendar date '{d}'"))?,
        None => Utc::now().with_timezone(&tz).date_naive(),
    };

    plan_to_events(
        outcome,
        &EventOptions {
            date,
            tz,
            prefix: &cfg.calendar.title_prefix,
            attendees: &cfg.calendar.attendees,
            reminders: &cfg.calendar.reminders,
        },
    )
}

fn print_outcome(outcome: &ScheduleOutcome) {
    println!(
        "# {} plan, {} - {}\n",
        outcome.strategy,
        format_clock(outcome.start),
        format_clock(outcome.window_end)
    );

    let mut free = outcome.free_time.iter().peekable();
    for t in &outcome.order {
        while let Some(f) = free.next_if(|f| f.start < t.start) {
            println!(
                "{:>6} - {:<6}  (free time, {} mins)",
                format_clock(f.start),
                format_clock(f.start + f.minutes),
                f.minutes
            );
        }
        println!(
            "{:>6} - {:<6}  {}{}  [utility {:.2}]",
            format_clock(t.start),
            format_clock(t.end),
            t.description,
            if t.fixed { " (fixed)" } else { "" },
            t.utility
        );
    }

    println!(
        "\nCompleted {} tasks in {}; total utility {:.2}",
        outcome.order.len(),
        format_clock(outcome.total_minutes()),
        outcome.total_utility
    );
    if !outcome.skipped.is_empty() {
        let skipped: Vec<String> = outcome.skipped.iter().map(|id| id.to_string()).collect();
        println!("Did not fit the window: {}", skipped.join(", "));
    }
}

fn print_comparison(outcomes: &[ScheduleOutcome]) {
    println!("{:<20}  {:>5}  {:>7}  {:>8}", "strategy", "tasks", "skipped", "utility");
    for o in outcomes {
        println!(
            "{:<20}  {:>5}  {:>7}  {:>8.2}",
            o.strategy.to_string(),
            o.order.len(),
            o.skipped.len(),
            o.total_utility
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cfg = Config::default();
        let args = RunArgs {
            strategy: Some(StrategyArg::Greedy),
            start: Some("08:30".to_string()),
            window: None,
            slot: Some(15),
        };
        let s = RunSettings::resolve(&cfg, &args).unwrap();
        assert_eq!(s.strategy, Strategy::Greedy);
        assert_eq!(s.start, 510);
        assert_eq!(s.window, 420);
        assert_eq!(s.slot, 15);
    }

    #[test]
    fn test_bad_start_is_rejected() {
        let args = RunArgs {
            start: Some("half past".to_string()),
            ..RunArgs::default()
        };
        assert!(RunSettings::resolve(&Config::default(), &args).is_err());
    }

    #[test]
    fn test_cli_parses_plan() {
        let cli = Cli::try_parse_from(["dayplan", "plan", "--strategy", "dp", "--start", "04:00", "-q"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Plan { run, json } => {
                assert_eq!(run.strategy, Some(StrategyArg::Dp));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
