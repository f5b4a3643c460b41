//! Post-run wait: keep the log on screen until the user presses Esc.

use std::io;

use console::Term;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Whether to wait for a key at all. Never in containers or pipes.
pub fn should_wait() -> bool {
    // Check environment variable to force TUI off (useful for containers)
    if std::env::var("NO_TUI").is_ok() || std::env::var("EVHARVEST_NO_TUI").is_ok() {
        return false;
    }

    // Term::stdout() can fail in Docker without TTY
    let is_terminal = std::panic::catch_unwind(|| Term::stdout().is_term()).unwrap_or(false);
    is_terminal
        && crossterm::tty::IsTty::is_tty(&io::stdin())
        && crossterm::tty::IsTty::is_tty(&io::stdout())
}

/// Block until Esc, `q` or Ctrl-C. The terminal leaves raw mode on every path.
pub fn wait_for_exit() -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let result = read_until_exit();
    if let Err(e) = terminal::disable_raw_mode() {
        tracing::debug!("Failed to restore terminal: {}", e);
    }
    result
}

fn read_until_exit() -> io::Result<()> {
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            _ => {}
        }
    }
}
