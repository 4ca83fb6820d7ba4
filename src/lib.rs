//! # Habitust
//!
//! Habit and task tracking in the terminal. Tasks are tallied through a
//! stream of events (increments, timer sessions, checkbox completions) and
//! recurring templates are expanded onto calendar days by weekday.
//!
//! The library holds the core; the `habitust` binary wraps it in a CLI and
//! an interactive daily board.
//!
//! ```no_run
//! use habitust::{config::Config, metrics, scheduler, storage::Store};
//!
//! # fn main() -> habitust::error::Result<()> {
//! let store = Store::open(&Config::from_env())?;
//! let day = scheduler::parse_date("2024-06-03")?;
//! let generated = scheduler::generate_for_date(&store, day)?;
//! for task in &generated.tasks {
//!     println!("{}: {:?}", task.name, metrics::summarize(&store, &task.id)?);
//! }
//! println!("{:?}", scheduler::daily_report(&store, day)?);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod storage;
pub mod tasks;
pub mod templates;
pub mod tui;
