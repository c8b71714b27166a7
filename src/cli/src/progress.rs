//! Terminal progress bar.
//!
//! Draws a single redrawn line on stderr. Drawing errors are ignored and
//! nothing is drawn when stderr is not a terminal.

use std::io::{IsTerminal, Write};

use crossterm::{cursor, execute, queue, style, terminal};
use parking_lot::Mutex;
use soldexer_core::progress::{bytes_to_mb, ProgressSink, TransferState};

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// Byte transfer with a known total.
    Transfer(&'static str),
    /// Time-based indicator while the total is unknown.
    Searching,
}

#[derive(Debug, Default)]
struct BarState {
    total: u64,
    active: bool,
    last_line: Option<String>,
}

/// [`ProgressSink`] rendering `Label |████░░░░| 45% || 1.20/2.67 MB`.
pub struct TerminalProgress {
    style: Style,
    enabled: bool,
    state: Mutex<BarState>,
}

impl TerminalProgress {
    pub fn upload() -> Self {
        Self::new(Style::Transfer("Upload Progress"))
    }

    pub fn download() -> Self {
        Self::new(Style::Transfer("Download Progress"))
    }

    /// Indicator for the package lookup, before any size is known.
    pub fn searching() -> Self {
        Self::new(Style::Searching)
    }

    fn new(style: Style) -> Self {
        Self {
            style,
            enabled: std::io::stderr().is_terminal(),
            state: Mutex::new(BarState::default()),
        }
    }

    fn line(&self, current: u64, total: u64) -> String {
        render_line(self.style, current, total)
    }

    fn draw(&self, line: &str) {
        if !self.enabled {
            return;
        }
        let mut err = std::io::stderr();
        let _ = queue!(
            err,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(line)
        );
        let _ = err.flush();
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        let mut state = self.state.lock();
        state.total = total;
        state.active = true;
        if self.enabled {
            let _ = execute!(std::io::stderr(), cursor::Hide);
        }
        let line = self.line(0, total);
        self.draw(&line);
        state.last_line = Some(line);
    }

    fn update(&self, current: u64) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        let line = self.line(current, state.total);
        if state.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        self.draw(&line);
        state.last_line = Some(line);
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        state.active = false;
        if self.enabled {
            let mut err = std::io::stderr();
            let _ = queue!(err, style::Print("\n"), cursor::Show);
            let _ = err.flush();
        }
    }
}

fn render_line(style: Style, current: u64, total: u64) -> String {
    let state = TransferState {
        total_bytes: total,
        transferred_bytes: current,
    };
    let percent = state.percent();
    let bar = render_bar(percent);
    match style {
        Style::Transfer(label) if total == 0 => {
            format!("{label} |{bar}| {:.2} MB", bytes_to_mb(current))
        }
        Style::Transfer(label) => format!(
            "{label} |{bar}| {percent}% || {:.2}/{:.2} MB",
            bytes_to_mb(current.min(total)),
            bytes_to_mb(total)
        ),
        Style::Searching => format!("Searching |{bar}| {percent}%"),
    }
}

fn render_bar(percent: u64) -> String {
    let filled = (BAR_WIDTH as u64 * percent.min(100) / 100) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar_bounds() {
        assert_eq!(render_bar(0), "░".repeat(BAR_WIDTH));
        assert_eq!(render_bar(100), "█".repeat(BAR_WIDTH));
        assert_eq!(render_bar(150), "█".repeat(BAR_WIDTH));
        assert_eq!(render_bar(50).chars().filter(|c| *c == '█').count(), 20);
    }

    #[test]
    fn test_render_transfer_line() {
        let line = render_line(Style::Transfer("Upload Progress"), 1024 * 1024, 4 * 1024 * 1024);
        assert!(line.starts_with("Upload Progress |"));
        assert!(line.ends_with("| 25% || 1.00/4.00 MB"));
    }

    #[test]
    fn test_render_transfer_line_unknown_total() {
        let line = render_line(Style::Transfer("Download Progress"), 3 * 1024 * 1024, 0);
        assert!(line.ends_with("| 3.00 MB"));
    }

    #[test]
    fn test_render_searching_line() {
        let line = render_line(Style::Searching, 30, 100);
        assert!(line.starts_with("Searching |"));
        assert!(line.ends_with("| 30%"));
    }

    #[test]
    fn test_update_after_stop_is_ignored() {
        let progress = TerminalProgress::download();
        progress.start(100);
        progress.update(50);
        progress.stop();
        progress.update(75);
        progress.stop();

        let state = progress.state.lock();
        assert!(!state.active);
        assert_eq!(state.last_line.as_deref(), Some(render_line(progress.style, 50, 100).as_str()));
    }
}
