use chrono::{Local, NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use crate::error::{Result, StorageError};
use crate::metrics::{
    format_duration, goal_reached, progress_label, summarize, summarize_task, Summary,
};
use crate::models::{EventType, MetricType};
use crate::scheduler::{daily_report, generate_for_date};
use crate::storage::Store;
use crate::tasks::{self, NewEvent, NewTask};
use crate::templates::{self, NewTemplate};

/// Today's date in local time, the default for date-taking commands.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Adds a new ad-hoc task.
pub fn cmd_add(
    store: &Store,
    name: String,
    color: Option<String>,
    metric: MetricType,
    goal: Option<u32>,
) -> Result<()> {
    let task = tasks::create_task(store, NewTask { name, color, metric, goal })?;
    println!("Task added (id = {})", task.id);
    Ok(())
}

/// Lists tasks with their current progress.
///
/// With `date`, only the tasks scheduled on that day are shown.
pub fn cmd_list(store: &Store, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let tasks = tasks::list_tasks(store, date)?;
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Date").add_attribute(Attribute::Bold),
            Cell::new("Progress").add_attribute(Attribute::Bold),
        ]);

    for t in &tasks {
        let summary = summarize_task(store, t)?;
        let progress_color = if goal_reached(&summary) { Color::Green } else { Color::Yellow };
        table.add_row(vec![
            Cell::new(&t.id),
            Cell::new(&t.name).fg(tile_color(&t.color)),
            Cell::new(&t.metric),
            Cell::new(t.scheduled_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(progress_label(&summary)).fg(progress_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Removes a task and its events.
pub fn cmd_remove(store: &Store, id: &str) -> Result<()> {
    tasks::delete_task(store, id)?;
    println!("Task {} removed.", id);
    Ok(())
}

/// Logs a raw event against a task.
pub fn cmd_log(store: &Store, id: &str, kind: EventType, value: Option<u32>) -> Result<()> {
    let event = tasks::log_event(store, id, NewEvent { kind, value })?;
    match event.value {
        Some(v) => println!("Logged {} ({}) for task {}.", event.kind, v, id),
        None => println!("Logged {} for task {}.", event.kind, id),
    }
    Ok(())
}

pub fn cmd_start(store: &Store, id: &str) -> Result<()> {
    tasks::start_timer(store, id)?;
    println!("Timer started for task {}.", id);
    Ok(())
}

pub fn cmd_stop(store: &Store, id: &str) -> Result<()> {
    let event = tasks::stop_timer(store, id)?;
    println!(
        "Timer stopped for task {} after {}.",
        id,
        format_duration(u64::from(event.value.unwrap_or(0)))
    );
    Ok(())
}

/// Lists the events of a task, oldest first.
pub fn cmd_events(store: &Store, id: &str, json: bool) -> Result<()> {
    let events = tasks::list_events(store, id)?;
    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No events for task {}.", id);
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["At", "Type", "Value"]);
    for e in events {
        table.add_row(vec![
            e.at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            e.kind.to_string(),
            e.value.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Prints the progress summary of one task.
pub fn cmd_summary(store: &Store, id: &str, json: bool) -> Result<()> {
    let summary = summarize(store, id)?;
    if json {
        return print_json(&summary);
    }
    let task = tasks::get_task(store, id)?;
    let detail = match &summary {
        Summary::Count { total, .. } => format!("{} total", total),
        Summary::Timer { total_sec, .. } => format!("{} tracked", format_duration(*total_sec)),
        Summary::Check { done } => if *done { "done".into() } else { "not done".into() },
        Summary::Unknown { message } => message.clone(),
    };
    println!("{} [{}]: {} ({})", task.name, task.metric, progress_label(&summary), detail);
    Ok(())
}

/// Expands the templates active on `date` into tasks.
pub fn cmd_generate(store: &Store, date: NaiveDate, json: bool) -> Result<()> {
    let result = generate_for_date(store, date)?;
    if json {
        return print_json(&result);
    }
    if let Some(message) = &result.message {
        println!("{} ({}).", message, date);
        return Ok(());
    }
    println!("Created {} task(s) for {}.", result.created, date);
    for t in &result.tasks {
        println!("  {}  {}", t.id, t.name);
    }
    Ok(())
}

/// Prints the completion report for `date`.
pub fn cmd_report(store: &Store, date: NaiveDate, json: bool) -> Result<()> {
    let report = daily_report(store, date)?;
    if json {
        return print_json(&report);
    }
    println!(
        "{}: {}/{} tasks completed ({:.1}%)",
        report.date, report.completed_tasks, report.total_tasks, report.completion_rate
    );
    if !report.metrics.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Completed"]);
        for (metric, n) in &report.metrics {
            table.add_row(vec![metric.clone(), n.to_string()]);
        }
        println!("{table}");
    }
    Ok(())
}

/// Adds a new recurring template.
pub fn cmd_template_add(
    store: &Store,
    name: String,
    active_days: Vec<u8>,
    color: Option<String>,
    metric: MetricType,
    goal: Option<u32>,
) -> Result<()> {
    let template = templates::create_template(
        store,
        NewTemplate { name, color, metric, goal, active_days },
    )?;
    println!("Template '{}' added (id = {}).", template.name, template.id);
    Ok(())
}

/// Lists all available templates.
pub fn cmd_template_list(store: &Store, json: bool) -> Result<()> {
    let templates = templates::list_templates(store)?;
    if json {
        return print_json(&templates);
    }
    if templates.is_empty() {
        println!("No templates found.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Metric", "Goal", "Days"]);
    for t in templates {
        table.add_row(vec![
            Cell::new(&t.id),
            Cell::new(&t.name).fg(tile_color(&t.color)),
            Cell::new(&t.metric),
            Cell::new(t.goal.map(|g| g.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(day_names(&t.active_days)),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Removes a template. Tasks already generated from it are kept.
pub fn cmd_template_remove(store: &Store, id: &str) -> Result<()> {
    templates::delete_template(store, id)?;
    println!("Template {} removed.", id);
    Ok(())
}

#[derive(Serialize)]
struct Health<'a> {
    status: &'a str,
    time: String,
    data_dir: String,
}

/// Confirms the store is readable.
pub fn cmd_health(store: &Store) -> Result<()> {
    store.find_tasks(|_| false)?;
    print_json(&Health {
        status: "ok",
        time: Utc::now().to_rfc3339(),
        data_dir: store.data_dir().display().to_string(),
    })
}

/// `Mon,Wed,Fri` style rendering of weekday indices.
pub fn day_names(days: &[u8]) -> String {
    const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    days.iter()
        .filter_map(|&d| NAMES.get(d as usize).copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Maps a `#RRGGBB` tile color to a terminal color.
fn tile_color(hex: &str) -> Color {
    parse_hex(hex)
        .map(|(r, g, b)| Color::Rgb { r, g, b })
        .unwrap_or(Color::Reset)
}

pub(crate) fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| {
        tracing::error!(error = %e, "failed to render JSON");
        StorageError::Render(e)
    })?;
    println!("{}", s);
    Ok(())
}
