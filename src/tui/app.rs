use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::today;
use crate::error::Result;
use crate::metrics::{goal_reached, summarize_task, Summary};
use crate::models::{EventType, MetricType, Task};
use crate::scheduler::{daily_report, generate_for_date, Report};
use crate::storage::Store;
use crate::tasks::{self, NewEvent};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    /// Typing a custom increment amount.
    Amount,
}

/// One board line: a task and its current progress.
pub struct Row {
    pub task: Task,
    pub summary: Summary,
    pub timer_running: bool,
}

pub struct App<'a> {
    store: &'a Store,
    pub date: NaiveDate,
    pub rows: Vec<Row>,
    pub report: Option<Report>,
    pub state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    /// Last status or error line shown under the board.
    pub status: Option<String>,
}

impl<'a> App<'a> {
    /// Creates the board for today and loads its tasks.
    pub fn new(store: &'a Store) -> App<'a> {
        let mut app = App {
            store,
            date: today(),
            rows: Vec::new(),
            report: None,
            state: TableState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status: None,
        };
        app.reload();
        app
    }

    /// Reloads the tasks, summaries and report for the current date.
    pub fn reload(&mut self) {
        match self.load_rows() {
            Ok((rows, report)) => {
                self.rows = rows;
                self.report = Some(report);
            }
            Err(e) => {
                self.rows.clear();
                self.report = None;
                self.status = Some(e.to_string());
            }
        }
        let selected = match self.state.selected() {
            _ if self.rows.is_empty() => None,
            Some(i) => Some(i.min(self.rows.len() - 1)),
            None => Some(0),
        };
        self.state.select(selected);
    }

    fn load_rows(&self) -> Result<(Vec<Row>, Report)> {
        let tasks = tasks::list_tasks(self.store, Some(self.date))?;
        let open: HashSet<String> = tasks
            .iter()
            .filter(|t| t.metric == MetricType::Timer)
            .map(|t| tasks::open_timer(self.store, &t.id).map(|e| e.map(|_| t.id.clone())))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let mut rows = tasks
            .into_iter()
            .map(|task| {
                let summary = summarize_task(self.store, &task)?;
                let timer_running = open.contains(&task.id);
                Ok(Row { task, summary, timer_running })
            })
            .collect::<Result<Vec<_>>>()?;
        // Unfinished first, then alphabetical.
        rows.sort_by(|a, b| {
            goal_reached(&a.summary)
                .cmp(&goal_reached(&b.summary))
                .then_with(|| a.task.name.to_lowercase().cmp(&b.task.name.to_lowercase()))
        });
        Ok((rows, daily_report(self.store, self.date)?))
    }

    pub fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Moves the board by `days`, negative for the past.
    pub fn shift_date(&mut self, days: i64) {
        self.date += Duration::days(days);
        self.status = None;
        self.state.select(None);
        self.reload();
    }

    pub fn jump_to_today(&mut self) {
        self.date = today();
        self.status = None;
        self.state.select(None);
        self.reload();
    }

    fn selected(&self) -> Option<&Row> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    /// Adds one to the selected counter.
    pub fn increment_selected(&mut self) {
        self.log_selected(EventType::Increment, None);
    }

    /// Checks off the selected task.
    pub fn check_selected(&mut self) {
        self.log_selected(EventType::Check, None);
    }

    /// Starts the selected timer, or stops it if it is running.
    pub fn toggle_timer(&mut self) {
        let Some(row) = self.selected() else { return };
        let id = row.task.id.clone();
        let result = if row.timer_running {
            tasks::stop_timer(self.store, &id).map(|_| "Timer stopped.")
        } else {
            tasks::start_timer(self.store, &id).map(|_| "Timer started.")
        };
        self.finish(result.map(String::from));
    }

    /// Opens the amount prompt for a custom increment.
    pub fn start_amount(&mut self) {
        if self.selected().map(|r| &r.task.metric) == Some(&MetricType::Count) {
            self.input_mode = InputMode::Amount;
            self.input_buffer.clear();
        }
    }

    pub fn submit_amount(&mut self) {
        self.input_mode = InputMode::Normal;
        let buffer = std::mem::take(&mut self.input_buffer);
        match buffer.trim().parse::<u32>() {
            Ok(v) => self.log_selected(EventType::Increment, Some(v)),
            Err(_) => self.status = Some(format!("'{}' is not a whole number.", buffer.trim())),
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Expands the templates for the shown date.
    pub fn generate(&mut self) {
        let result = generate_for_date(self.store, self.date).map(|r| match r.message {
            Some(message) => message,
            None => format!("Created {} task(s).", r.created),
        });
        self.finish(result);
    }

    /// Deletes the selected task and its events.
    pub fn delete_selected(&mut self) {
        let Some(row) = self.selected() else { return };
        let id = row.task.id.clone();
        let name = row.task.name.clone();
        let result = tasks::delete_task(self.store, &id).map(|_| format!("Deleted '{}'.", name));
        self.finish(result);
    }

    fn log_selected(&mut self, kind: EventType, value: Option<u32>) {
        let Some(row) = self.selected() else { return };
        let id = row.task.id.clone();
        let result = tasks::log_event(self.store, &id, NewEvent { kind, value })
            .map(|e| format!("Logged {}.", e.kind));
        self.finish(result);
    }

    fn finish(&mut self, result: Result<String>) {
        self.status = Some(match result {
            Ok(msg) => msg,
            Err(e) => e.to_string(),
        });
        self.reload();
    }
}
