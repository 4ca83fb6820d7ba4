use std::collections::BTreeMap;
use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, StorageError, TrackerError};
use crate::models::{MetricType, Task};
use crate::storage::Store;

/// Message returned when a date has already been expanded.
pub const ALREADY_GENERATED: &str = "Tasks already generated for this date";

/// Outcome of expanding templates onto a date.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub date: NaiveDate,
    pub created: usize,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Completion of the tasks scheduled on one date.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub date: NaiveDate,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Percentage with one decimal place.
    pub completion_rate: f64,
    /// Completed tasks per metric type.
    pub metrics: BTreeMap<String, usize>,
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// Only the zero-padded 10 character form is accepted; chrono alone would
/// also take `2024-6-3` or `+2024-06-03`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let invalid = |reason: String| {
        TrackerError::invalid(format!("invalid date '{}': {}. Use YYYY-MM-DD.", s, reason))
    };
    if s.len() != 10 {
        return Err(invalid("expected 10 characters".to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| invalid(e.to_string()))
}

/// Weekday index with Monday = 0 .. Sunday = 6, as used by `active_days`.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Expands every template active on `date`'s weekday into a task for that date.
///
/// Generation is one-shot: once any task is scheduled on `date`, later calls
/// create nothing, even if templates changed in between. The check and the
/// insert run under the store's per-date lock.
pub fn generate_for_date(store: &Store, date: NaiveDate) -> Result<GenerationResult> {
    let lock = store.generation_lock(date)?;
    let result = match lock.lock() {
        Ok(_guard) => generate_locked(store, date),
        Err(_) => Err(StorageError::Poisoned.into()),
    };
    store.release_generation_lock(date, lock)?;
    result
}

fn generate_locked(store: &Store, date: NaiveDate) -> Result<GenerationResult> {
    let existing = store.find_tasks(|t| t.scheduled_date == Some(date))?;
    if !existing.is_empty() {
        tracing::info!(
            %date,
            existing = existing.len(),
            "generation skipped, date already has tasks"
        );
        return Ok(GenerationResult {
            date,
            created: 0,
            tasks: Vec::new(),
            message: Some(ALREADY_GENERATED.to_string()),
        });
    }

    let weekday = weekday_index(date);
    let mut templates = store.find_templates(|t| t.active_days.contains(&weekday))?;
    templates.sort_by_key(|t| t.created_at);

    let now = Utc::now();
    let tasks: Vec<Task> = templates
        .into_iter()
        .map(|tmpl| Task {
            id: Uuid::new_v4().to_string(),
            name: tmpl.name,
            color: tmpl.color,
            metric: tmpl.metric,
            goal: tmpl.goal,
            template_id: Some(tmpl.id),
            scheduled_date: Some(date),
            created_at: now,
        })
        .collect();

    if !tasks.is_empty() {
        store.insert_tasks(tasks.clone())?;
    }
    tracing::info!(%date, weekday, created = tasks.len(), "tasks generated");
    Ok(GenerationResult { date, created: tasks.len(), tasks, message: None })
}

/// Reports how many of `date`'s tasks have been worked on.
///
/// A task counts as completed as soon as it has any event at all; goals
/// are not consulted.
pub fn daily_report(store: &Store, date: NaiveDate) -> Result<Report> {
    let tasks = store.find_tasks(|t| t.scheduled_date == Some(date))?;
    if tasks.is_empty() {
        return Ok(Report {
            date,
            total_tasks: 0,
            completed_tasks: 0,
            completion_rate: 0.0,
            metrics: BTreeMap::new(),
        });
    }

    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let with_events = store.fold_events(
        |e| ids.contains(e.task_id.as_str()),
        HashSet::new(),
        |mut seen, e| {
            seen.insert(e.task_id.clone());
            seen
        },
    )?;

    let known = [MetricType::Count, MetricType::Timer, MetricType::Check];
    let mut metrics: BTreeMap<String, usize> = known
        .iter()
        .map(|m| (m.as_str().to_string(), 0))
        .collect();
    let mut completed_tasks = 0;
    for task in tasks.iter().filter(|t| with_events.contains(&t.id)) {
        completed_tasks += 1;
        *metrics.entry(task.metric.as_str().to_string()).or_insert(0) += 1;
    }

    let completion_rate = completion_rate(completed_tasks, tasks.len());
    tracing::debug!(%date, total = tasks.len(), completed_tasks, completion_rate, "daily report");
    Ok(Report {
        date,
        total_tasks: tasks.len(),
        completed_tasks,
        completion_rate,
        metrics,
    })
}

/// `completed / total` as a percentage rounded to one decimal place.
fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}
