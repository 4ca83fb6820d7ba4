use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{Event, EventType, MetricType, Task, DEFAULT_COLOR, MAX_EVENT_VALUE};
use crate::storage::Store;

/// Maximum number of records returned by a listing.
pub const LIST_CAP: usize = 500;

/// Fields a caller supplies when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub color: Option<String>,
    pub metric: MetricType,
    pub goal: Option<u32>,
}

/// Fields a caller supplies when logging an event.
#[derive(Debug, Clone, Copy)]
pub struct NewEvent {
    pub kind: EventType,
    pub value: Option<u32>,
}

/// Validates and stores a new ad-hoc task.
pub fn create_task(store: &Store, new: NewTask) -> Result<Task> {
    let name = validate_name(&new.name)?;
    let color = validate_color(new.color.as_deref())?;
    validate_metric(&new.metric)?;
    validate_goal(new.goal)?;

    let task = Task {
        id: Uuid::new_v4().to_string(),
        name,
        color,
        metric: new.metric,
        goal: new.goal,
        template_id: None,
        scheduled_date: None,
        created_at: Utc::now(),
    };
    store.insert_tasks(vec![task.clone()])?;
    tracing::info!(task_id = %task.id, metric = %task.metric, "task created");
    Ok(task)
}

/// Lists tasks, optionally only those scheduled on `date`, oldest first.
pub fn list_tasks(store: &Store, date: Option<NaiveDate>) -> Result<Vec<Task>> {
    let mut tasks = store.find_tasks(|t| date.is_none() || t.scheduled_date == date)?;
    tasks.sort_by_key(|t| t.created_at);
    tasks.truncate(LIST_CAP);
    Ok(tasks)
}

pub fn get_task(store: &Store, id: &str) -> Result<Task> {
    store
        .find_task(id)?
        .ok_or_else(|| TrackerError::task_not_found(id))
}

/// Deletes a task together with all of its events.
pub fn delete_task(store: &Store, id: &str) -> Result<()> {
    let removed = store
        .delete_task(id)?
        .ok_or_else(|| TrackerError::task_not_found(id))?;
    tracing::info!(task_id = %id, events_removed = removed, "task deleted");
    Ok(())
}

/// Records an event against a task after checking it fits the task's metric.
pub fn log_event(store: &Store, task_id: &str, new: NewEvent) -> Result<Event> {
    let task = get_task(store, task_id)?;
    validate_event(&task.metric, new)?;

    let event = Event {
        id: Uuid::new_v4().to_string(),
        task_id: task.id,
        kind: new.kind,
        value: new.value,
        at: Utc::now(),
    };
    store.insert_event(event.clone())?;
    tracing::debug!(
        task_id = %event.task_id,
        kind = %event.kind,
        value = ?event.value,
        "event logged"
    );
    Ok(event)
}

/// Events of a task in the order they happened.
pub fn list_events(store: &Store, task_id: &str) -> Result<Vec<Event>> {
    get_task(store, task_id)?;
    let mut events = store.find_events(|e| e.task_id == task_id)?;
    events.sort_by_key(|e| e.at);
    events.truncate(LIST_CAP);
    Ok(events)
}

/// Most recent `timer_start` of a task that has no later `timer_stop`.
pub fn open_timer(store: &Store, task_id: &str) -> Result<Option<Event>> {
    let mut events = store.find_events(|e| {
        e.task_id == task_id && matches!(e.kind, EventType::TimerStart | EventType::TimerStop)
    })?;
    events.sort_by_key(|e| e.at);
    Ok(events.pop().filter(|e| e.kind == EventType::TimerStart))
}

/// Logs a `timer_start`, refusing if a session is already running.
pub fn start_timer(store: &Store, task_id: &str) -> Result<Event> {
    if open_timer(store, task_id)?.is_some() {
        return Err(TrackerError::invalid("timer is already running; stop it first"));
    }
    log_event(store, task_id, NewEvent { kind: EventType::TimerStart, value: None })
}

/// Closes the running session with a `timer_stop` carrying the elapsed seconds.
pub fn stop_timer(store: &Store, task_id: &str) -> Result<Event> {
    get_task(store, task_id)?;
    let start = open_timer(store, task_id)?
        .ok_or_else(|| TrackerError::invalid("no running timer for this task"))?;
    let elapsed = (Utc::now() - start.at).num_seconds().clamp(0, i64::from(MAX_EVENT_VALUE));
    log_event(
        store,
        task_id,
        NewEvent { kind: EventType::TimerStop, value: Some(elapsed as u32) },
    )
}

fn validate_event(metric: &MetricType, new: NewEvent) -> Result<()> {
    if !metric.accepts(new.kind) {
        return Err(TrackerError::invalid(format!(
            "event '{}' does not apply to a '{}' task",
            new.kind, metric
        )));
    }
    match (new.kind, new.value) {
        (EventType::TimerStop, None) => {
            return Err(TrackerError::invalid("timer_stop requires a value in seconds"));
        }
        (EventType::TimerStart | EventType::Check, Some(_)) => {
            return Err(TrackerError::invalid(format!("{} does not take a value", new.kind)));
        }
        _ => {}
    }
    if let Some(v) = new.value {
        if v > MAX_EVENT_VALUE {
            return Err(TrackerError::invalid(format!(
                "value {} exceeds the maximum of {}",
                v, MAX_EVENT_VALUE
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::invalid("name must not be empty"));
    }
    Ok(name.to_string())
}

/// Accepts `#RRGGBB`; `None` yields the default color.
pub(crate) fn validate_color(color: Option<&str>) -> Result<String> {
    let Some(color) = color else {
        return Ok(DEFAULT_COLOR.to_string());
    };
    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TrackerError::invalid(format!("invalid color '{}'. Use #RRGGBB.", color)));
    }
    Ok(color.to_string())
}

pub(crate) fn validate_metric(metric: &MetricType) -> Result<()> {
    if let MetricType::Unknown(raw) = metric {
        return Err(TrackerError::invalid(format!(
            "unknown metric '{}'. Use count, timer or check.",
            raw
        )));
    }
    Ok(())
}

pub(crate) fn validate_goal(goal: Option<u32>) -> Result<()> {
    if goal == Some(0) {
        return Err(TrackerError::invalid("goal must be a positive integer"));
    }
    Ok(())
}
