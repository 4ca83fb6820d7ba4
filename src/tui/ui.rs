use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::commands::parse_hex;
use crate::metrics::{goal_reached, progress_label};
use super::app::{App, InputMode};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Board
            Constraint::Length(3), // Report
            Constraint::Length(3), // Help
        ].as_ref())
        .split(f.area());

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|r| {
            let done = goal_reached(&r.summary);
            let marker = if r.timer_running { "●" } else if done { "✓" } else { " " };
            let style = if done {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(r.task.name.clone())
                    .style(Style::default().fg(tile_color(&r.task.color))),
                Cell::from(r.task.metric.to_string()),
                Cell::from(progress_label(&r.summary)),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(20),
    ];

    let title = format!("Habitust - {} ({})", app.date, app.date.format("%A"));
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Name", "Metric", "Progress"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[0], &mut app.state);

    let report_text = match &app.report {
        Some(r) if r.total_tasks > 0 => format!(
            "{}/{} completed ({:.1}%)  count: {}  timer: {}  check: {}",
            r.completed_tasks,
            r.total_tasks,
            r.completion_rate,
            r.metrics.get("count").copied().unwrap_or(0),
            r.metrics.get("timer").copied().unwrap_or(0),
            r.metrics.get("check").copied().unwrap_or(0),
        ),
        Some(_) => "No tasks for this day. Press g to generate them from templates.".to_string(),
        None => String::new(),
    };
    let report_text = match &app.status {
        Some(status) => format!("{}  | {}", report_text, status),
        None => report_text,
    };
    let report = Paragraph::new(report_text)
        .block(Block::default().borders(Borders::ALL).title("Report"));
    f.render_widget(report, chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => concat!(
            "q: Quit | j/k: Move | h/l: Day | t: Today | +: Inc | i: Inc by | ",
            "Space: Check | s: Timer | g: Generate | d: Del"
        ),
        InputMode::Amount => "Enter: Save | Esc: Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if app.input_mode == InputMode::Amount {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Increment by"));
        f.render_widget(input, area);
    }
}

fn tile_color(hex: &str) -> Color {
    parse_hex(hex)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Reset)
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
