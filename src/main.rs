//! # Habitust
//!
//! Habit tracking for the terminal. Track anything as a tally, a timer or
//! a checkbox, set up weekly routines as templates, and see how each day
//! went.
//!
//! ## Usage
//!
//! Run without arguments to open the daily board:
//!
//! ```bash
//! habitust
//! # or explicitly
//! habitust ui
//! ```
//!
//! **Board keys**: `j`/`k` move, `h`/`l` previous/next day, `t` today,
//! `+` increment, `Space` check, `s` start/stop timer, `g` generate the
//! day's tasks from templates, `d` delete, `q` quit.
//!
//! **Tasks and events**
//! ```bash
//! habitust add "Read" --metric timer --goal 1800
//! habitust list --date 2024-06-03
//! habitust log <ID> increment --value 10
//! habitust start <ID>; habitust stop <ID>
//! habitust summary <ID>
//! ```
//!
//! **Routines**
//! ```bash
//! habitust template add "Pushups" --days mon,tue,wed,thu,fri --goal 50
//! habitust generate --date 2024-06-03
//! habitust report --date 2024-06-03
//! ```
//!
//! ## Data Storage
//!
//! Records are JSON files in your local data directory
//! (`~/.local/share/habitust` on Linux). Override with `HABITUST_DIR`.
//! Set `RUST_LOG=habitust=debug` for diagnostics on stderr.

use std::io;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use habitust::commands::*;
use habitust::config::Config;
use habitust::error::TrackerError;
use habitust::models::{EventType, MetricType};
use habitust::storage::Store;
use habitust::templates::parse_day;
use habitust::tui::run_tui;

#[derive(Parser)]
#[command(name = "habitust", version)]
#[command(about = "Habit and task tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Tile color as #RRGGBB
        #[arg(short, long)]
        color: Option<String>,
        /// How progress is measured: count, timer or check
        #[arg(short, long, default_value = "count")]
        metric: MetricType,
        /// Goal units (taps, seconds, checks)
        #[arg(short, long)]
        goal: Option<u32>,
    },
    /// List tasks with their progress
    List {
        /// Only tasks scheduled on this date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Remove a task and its events
    Remove {
        id: String,
    },
    /// Log an event against a task
    Log {
        id: String,
        /// increment, timer_start, timer_stop or check
        kind: EventType,
        /// Increment amount or elapsed seconds
        #[arg(short, long)]
        value: Option<u32>,
    },
    /// Start a timer session
    Start {
        id: String,
    },
    /// Stop the running timer session
    Stop {
        id: String,
    },
    /// Show the events of a task
    Events {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the progress summary of a task
    Summary {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Create the day's tasks from templates
    Generate {
        /// Date in YYYY-MM-DD, defaults to today
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Completion report for a day
    Report {
        /// Date in YYYY-MM-DD, defaults to today
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Manage templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Check that the data directory is usable
    Health,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
    /// Open the interactive daily board
    Ui,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add a new template
    Add {
        /// Template name
        name: String,
        /// Active weekdays, e.g. 0,1,2 or mon,wed,fri (Monday = 0)
        #[arg(short, long, required = true, value_delimiter = ',', value_parser = parse_day_arg)]
        days: Vec<u8>,
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long, default_value = "count")]
        metric: MetricType,
        #[arg(short, long)]
        goal: Option<u32>,
    },
    /// List templates
    List {
        #[arg(long)]
        json: bool,
    },
    /// Remove a template
    Remove {
        id: String,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    habitust::scheduler::parse_date(s).map_err(|e| e.to_string())
}

fn parse_day_arg(s: &str) -> Result<u8, String> {
    parse_day(s).map_err(|e| e.to_string())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The board owns the terminal, so it stays quiet unless RUST_LOG asks otherwise.
    let interactive = matches!(cli.command, Some(Commands::Ui) | None);
    init_tracing(if interactive { "off" } else { "habitust=warn" });

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "habitust", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let store = match Store::open(&Config::from_env()) {
        Ok(store) => store,
        Err(e) => return fail(e),
    };

    let result = match cli.command {
        Some(Commands::Add { name, color, metric, goal }) => {
            cmd_add(&store, name, color, metric, goal)
        }
        Some(Commands::List { date, json }) => cmd_list(&store, date, json),
        Some(Commands::Remove { id }) => cmd_remove(&store, &id),
        Some(Commands::Log { id, kind, value }) => cmd_log(&store, &id, kind, value),
        Some(Commands::Start { id }) => cmd_start(&store, &id),
        Some(Commands::Stop { id }) => cmd_stop(&store, &id),
        Some(Commands::Events { id, json }) => cmd_events(&store, &id, json),
        Some(Commands::Summary { id, json }) => cmd_summary(&store, &id, json),
        Some(Commands::Generate { date, json }) => {
            cmd_generate(&store, date.unwrap_or_else(today), json)
        }
        Some(Commands::Report { date, json }) => {
            cmd_report(&store, date.unwrap_or_else(today), json)
        }
        Some(Commands::Template { command }) => match command {
            TemplateCommands::Add { name, days, color, metric, goal } => {
                cmd_template_add(&store, name, days, color, metric, goal)
            }
            TemplateCommands::List { json } => cmd_template_list(&store, json),
            TemplateCommands::Remove { id } => cmd_template_remove(&store, &id),
        },
        Some(Commands::Health) => cmd_health(&store),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(&store) {
                eprintln!("Error running TUI: {}", e);
                return ExitCode::FAILURE;
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn fail(e: TrackerError) -> ExitCode {
    if let TrackerError::Storage(source) = &e {
        tracing::error!(error = %source, "storage failure");
    }
    eprintln!("Error: {}", e);
    ExitCode::FAILURE
}
