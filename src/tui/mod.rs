pub mod app;
pub mod ui;

use std::{error::Error, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use crate::storage::Store;
use app::{App, InputMode};
use ui::ui;

/// Runs the interactive daily board until the user quits.
pub fn run_tui(store: &Store) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.input_mode {
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Left | KeyCode::Char('h') => app.shift_date(-1),
                    KeyCode::Right | KeyCode::Char('l') => app.shift_date(1),
                    KeyCode::Char('t') => app.jump_to_today(),
                    KeyCode::Char('+') => app.increment_selected(),
                    KeyCode::Char('i') => app.start_amount(),
                    KeyCode::Char(' ') => app.check_selected(),
                    KeyCode::Char('s') => app.toggle_timer(),
                    KeyCode::Char('g') => app.generate(),
                    KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                    _ => {}
                },
                InputMode::Amount => match key.code {
                    KeyCode::Enter => app.submit_amount(),
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        app.input_buffer.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    _ => {}
                },
            }
        }
    }
}
