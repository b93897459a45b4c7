//! HabitLoop terminal driver.
//!
//! # Responsibility
//! - Wire SQLite-backed collaborators into one `HabitListCoordinator`.
//! - Route each subcommand to a single coordinator intent.
//! - Drain background completions before exiting.

mod terminal_screen;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use habitloop_core::db::{open_db, SharedConnection};
use habitloop_core::{
    default_log_level, init_logging, CoordinatorContext, CsvHabitsExporter, Entry,
    FileBugReporter, FixedDirFinder, Habit, HabitList, HabitListCoordinator,
    HistoryCommandRunner, SqliteHabitList, SqlitePreferences, ThreadTaskRunner, Timestamp,
};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use terminal_screen::{value_on, TerminalScreen};

#[derive(Parser, Debug)]
#[command(name = "habitloop", version, about = "Track habits from the terminal")]
struct Cli {
    /// SQLite database file (defaults to `<data-dir>/habits.db`).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Root for exports, bug reports and logs.
    #[arg(long, default_value = "habitloop-data")]
    data_dir: PathBuf,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count a launch and show the introduction on first run.
    Startup,
    /// List habits in order with today's value.
    List,
    /// Add a habit at the end of the list.
    Add {
        name: String,
        /// Makes the habit numerical, measured in this unit.
        #[arg(long)]
        unit: Option<String>,
    },
    /// Show one habit and its recent entries.
    Open { habit: String },
    /// Edit a numerical value through the number picker.
    Edit {
        habit: String,
        /// Day to edit, YYYY-MM-DD (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// New value in display units; without it the current value is shown.
        #[arg(long)]
        value: Option<f64>,
    },
    /// Record a raw entry value for a day.
    Toggle {
        habit: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Raw value (-1 unknown, 0 no, 1 auto, 2 yes, 3 skip).
        #[arg(long, default_value_t = Entry::YES_MANUAL, allow_negative_numbers = true)]
        value: i32,
    },
    /// Move a habit into the slot of another one.
    Reorder { from: String, to: String },
    /// Export all habits as CSV into `<data-dir>/exports`.
    Export,
    /// Renumber positions and drop orphan entries.
    Repair,
    /// Generate a bug report and print it.
    BugReport,
    /// Offer a sync key pair received from another device.
    SyncKey {
        sync_key: String,
        encryption_key: String,
        /// Confirm the installation without asking.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = absolute_dir(&cli.data_dir)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let log_dir = data_dir.join("logs");
    init_logging(&level, &log_dir.to_string_lossy())?;

    let db_path = cli.db.clone().unwrap_or_else(|| data_dir.join("habits.db"));
    let conn = SharedConnection::new(
        open_db(&db_path).with_context(|| format!("cannot open {}", db_path.display()))?,
    );
    let habits: Arc<dyn HabitList> = Arc::new(SqliteHabitList::new(conn.clone()));
    let task_runner = Arc::new(ThreadTaskRunner::new());

    let (picker_answer, confirm) = match &cli.command {
        Command::Edit { value, .. } => (*value, false),
        Command::SyncKey { yes, .. } => (None, *yes),
        _ => (None, false),
    };

    let coordinator = HabitListCoordinator::new(CoordinatorContext {
        habits: Arc::clone(&habits),
        dir_finder: Arc::new(FixedDirFinder::new(data_dir.join("exports"))),
        task_runner: task_runner.clone(),
        screen: Arc::new(TerminalScreen::new(picker_answer, confirm)),
        command_runner: Arc::new(HistoryCommandRunner::new(Arc::clone(&habits))),
        prefs: Arc::new(SqlitePreferences::load(conn)?),
        bug_reporter: Arc::new(FileBugReporter::new(
            data_dir.join("reports"),
            Arc::clone(&habits),
        )),
        exporter: Arc::new(CsvHabitsExporter::new()),
    });

    info!("event=cli_command module=cli status=start");
    run(cli.command, &coordinator, habits.as_ref())?;
    task_runner.wait_until_idle();
    info!("event=cli_command module=cli status=ok");
    Ok(())
}

fn run(command: Command, coordinator: &HabitListCoordinator, habits: &dyn HabitList) -> Result<()> {
    match command {
        Command::Startup => coordinator.on_startup(),
        Command::List => {
            let today = Timestamp::today();
            let all = habits.habits()?;
            if all.is_empty() {
                println!("no habits yet");
            }
            for habit in &all {
                println!("{:>3}  {:<24} {}", habit.position, habit.name, value_on(habit, today));
            }
        }
        Command::Add { name, unit } => {
            let habit = match unit {
                Some(unit) => Habit::numerical(name, unit),
                None => Habit::new(name),
            };
            habits.add(&habit)?;
            println!("added {} ({})", habit.name, habit.id);
        }
        Command::Open { habit } => coordinator.on_click_habit(&find_habit(habits, &habit)?),
        Command::Edit { habit, date, .. } => {
            let habit = find_habit(habits, &habit)?;
            if !habit.is_numerical {
                bail!("`{}` is a yes/no habit; use `toggle`", habit.name);
            }
            coordinator.on_edit(&habit, day_or_today(date));
        }
        Command::Toggle { habit, date, value } => {
            let habit = find_habit(habits, &habit)?;
            coordinator.on_toggle(&habit, day_or_today(date), value);
        }
        Command::Reorder { from, to } => {
            let from = find_habit(habits, &from)?;
            let to = find_habit(habits, &to)?;
            coordinator.on_reorder_habit(&from, &to);
        }
        Command::Export => coordinator.on_export_csv(),
        Command::Repair => coordinator.on_repair_db(),
        Command::BugReport => coordinator.on_send_bug_report(),
        Command::SyncKey {
            sync_key,
            encryption_key,
            ..
        } => coordinator.on_sync_key_offer(&sync_key, &encryption_key),
    }
    Ok(())
}

/// Resolves a habit by id, list position or case-insensitive name.
fn find_habit(habits: &dyn HabitList, query: &str) -> Result<Habit> {
    let all = habits.habits()?;
    if let Some(habit) = all
        .iter()
        .find(|habit| habit.id.to_string().eq_ignore_ascii_case(query))
    {
        return Ok(habit.clone());
    }
    if let Ok(position) = query.parse::<u32>() {
        if let Some(habit) = all.iter().find(|habit| habit.position == position) {
            return Ok(habit.clone());
        }
    }
    all.into_iter()
        .find(|habit| habit.name.eq_ignore_ascii_case(query))
        .ok_or_else(|| anyhow!("no habit matches `{query}`"))
}

fn day_or_today(date: Option<NaiveDate>) -> Timestamp {
    date.map_or_else(Timestamp::today, Timestamp::from_date)
}

fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot resolve working directory")?;
    Ok(cwd.join(dir))
}
