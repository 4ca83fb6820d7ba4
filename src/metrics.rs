use serde::Serialize;

use crate::error::{Result, TrackerError};
use crate::models::{Event, EventType, MetricType, Task};
use crate::storage::Store;

/// Progress of one task, shaped by its metric.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Summary {
    Count { total: u64, goal: Option<u32> },
    Timer { total_sec: u64, goal: Option<u32> },
    Check { done: bool },
    /// The stored metric is not one this build understands.
    Unknown { message: String },
}

/// Summarizes the task with the given id.
///
/// Fails with `NotFound` before touching any events if the task is missing.
pub fn summarize(store: &Store, task_id: &str) -> Result<Summary> {
    let task = store
        .find_task(task_id)?
        .ok_or_else(|| TrackerError::task_not_found(task_id))?;
    summarize_task(store, &task)
}

/// Folds the events of an already loaded task into its summary.
///
/// - **count**: sum of `increment` values, a missing value counting as 1.
/// - **timer**: sum of `timer_stop` values. `timer_start` is never paired
///   up; the stop value already holds the elapsed seconds.
/// - **check**: done once any `check` event exists.
pub fn summarize_task(store: &Store, task: &Task) -> Result<Summary> {
    let summary = match &task.metric {
        MetricType::Count => {
            let total = store.fold_events(of_kind(task, EventType::Increment), 0u64, |acc, e| {
                acc + u64::from(e.value.unwrap_or(1))
            })?;
            Summary::Count { total, goal: task.goal }
        }
        MetricType::Timer => {
            let total_sec = store.fold_events(of_kind(task, EventType::TimerStop), 0u64, |acc, e| {
                acc + u64::from(e.value.unwrap_or(0))
            })?;
            Summary::Timer { total_sec, goal: task.goal }
        }
        MetricType::Check => {
            let done = store.fold_events(of_kind(task, EventType::Check), false, |_, _| true)?;
            Summary::Check { done }
        }
        MetricType::Unknown(raw) => {
            tracing::warn!(task_id = %task.id, metric = %raw, "task has an unknown metric");
            Summary::Unknown { message: "Unknown metric".to_string() }
        }
    };
    tracing::debug!(task_id = %task.id, ?summary, "task summarized");
    Ok(summary)
}

fn of_kind(task: &Task, kind: EventType) -> impl Fn(&Event) -> bool + '_ {
    move |e| e.task_id == task.id && e.kind == kind
}

/// Short human readable progress, e.g. `30/50`, `12m 5s`, `done`.
pub fn progress_label(summary: &Summary) -> String {
    match summary {
        Summary::Count { total, goal: Some(goal) } => format!("{}/{}", total, goal),
        Summary::Count { total, goal: None } => total.to_string(),
        Summary::Timer { total_sec, goal: Some(goal) } => {
            format!("{} / {}", format_duration(*total_sec), format_duration(u64::from(*goal)))
        }
        Summary::Timer { total_sec, goal: None } => format_duration(*total_sec),
        Summary::Check { done: true } => "done".to_string(),
        Summary::Check { done: false } => "pending".to_string(),
        Summary::Unknown { message } => message.clone(),
    }
}

/// Whether the summary has reached its goal. Tasks without a goal never do,
/// except checks which are reached once done.
pub fn goal_reached(summary: &Summary) -> bool {
    match summary {
        Summary::Count { total, goal: Some(goal) } => *total >= u64::from(*goal),
        Summary::Timer { total_sec, goal: Some(goal) } => *total_sec >= u64::from(*goal),
        Summary::Check { done } => *done,
        _ => false,
    }
}

/// Formats seconds as `1h 2m 3s`, dropping leading zero units.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
