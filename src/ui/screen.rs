//! Terminal screen for the bar display.
//!
//! Owns the alternate screen while a track plays: draws the bar row above a one-line
//! status footer and turns key presses into [`PlayerCommand`]s.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::bars::BarsWidget;

/// User input while the display is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// No key, or a key with no binding
    Continue,
    /// Start, pause or resume playback (Space)
    TogglePlayback,
    /// Leave the display (Escape, 'q' or Ctrl+C)
    Quit,
}

/// Playback status shown in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Waiting for the first play
    Ready,
    Playing,
    Paused,
    Finished,
}

/// Everything one frame of the screen needs.
pub struct FrameView<'a> {
    pub title: &'a str,
    pub heights: &'a [f32],
    pub max_height: u16,
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub bpm: f64,
}

/// Full-screen bar display.
pub struct BeatbarsTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl BeatbarsTui {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Draws one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(&mut self, view: &FrameView<'_>) -> anyhow::Result<()> {
        self.terminal.draw(|frame| render_frame(frame, view))?;
        Ok(())
    }

    /// Waits up to `timeout` for a key press and maps it to a command.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, timeout: Duration) -> anyhow::Result<PlayerCommand> {
        if !event::poll(timeout)? {
            return Ok(PlayerCommand::Continue);
        }

        let Event::Key(key) = event::read()? else {
            return Ok(PlayerCommand::Continue);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(PlayerCommand::Continue);
        }

        Ok(match key.code {
            KeyCode::Char(' ') => {
                tracing::debug!("Space pressed: toggling playback");
                PlayerCommand::TogglePlayback
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                tracing::debug!("Escape or 'q' pressed: quitting");
                PlayerCommand::Quit
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                tracing::debug!("Ctrl+C pressed: quitting");
                PlayerCommand::Quit
            }
            _ => PlayerCommand::Continue,
        })
    }

    /// Restores the terminal. Safe to call more than once.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for BeatbarsTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn render_frame(frame: &mut Frame, view: &FrameView<'_>) {
    let area = frame.area();
    let footer_height = 1;
    let content_height = area.height.saturating_sub(footer_height);
    let bars_height = view.max_height.min(content_height);

    let bars_area = Rect {
        x: area.x,
        y: area.y + (content_height - bars_height) / 2,
        width: area.width,
        height: bars_height,
    };

    frame.render_widget(
        BarsWidget::new(view.heights).style(Style::default().fg(Color::Rgb(206, 224, 220))),
        bars_area,
    );

    let footer_area = Rect {
        x: area.x,
        y: area.y + content_height,
        width: area.width,
        height: footer_height.min(area.height),
    };
    frame.render_widget(
        Paragraph::new(footer_line(view)).style(Style::default().fg(Color::Rgb(185, 207, 212))),
        footer_area,
    );
}

fn footer_line<'a>(view: &FrameView<'a>) -> Line<'a> {
    let indicator = match view.status {
        PlaybackStatus::Ready => Span::styled("◼ ", Style::default().fg(Color::DarkGray)),
        PlaybackStatus::Playing => Span::styled("▶ ", Style::default().fg(Color::Green)),
        PlaybackStatus::Paused => Span::styled("⏸ ", Style::default().fg(Color::Yellow)),
        PlaybackStatus::Finished => Span::styled("◼ ", Style::default().fg(Color::Red)),
    };

    let hint = match view.status {
        PlaybackStatus::Ready => "space to play",
        PlaybackStatus::Playing => "space to pause",
        PlaybackStatus::Paused => "space to resume",
        PlaybackStatus::Finished => "q to quit",
    };

    Line::from(vec![
        indicator,
        Span::raw(format!(
            "{} / {}",
            format_time(view.position_secs),
            format_time(view.duration_secs)
        )),
        Span::raw(format!(" · {:.0} BPM · ", view.bpm)),
        Span::raw(view.title),
        Span::styled(format!(" · {hint}"), Style::default().fg(Color::DarkGray)),
    ])
}

/// Formats seconds as `m:ss`.
fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.9), "0:59");
        assert_eq!(format_time(225.0), "3:45");
        assert_eq!(format_time(-1.0), "0:00");
    }

    #[test]
    fn test_frame_layout() {
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        let heights = [1.0, 3.0];
        let view = FrameView {
            title: "song.wav",
            heights: &heights,
            max_height: 4,
            status: PlaybackStatus::Playing,
            position_secs: 65.0,
            duration_secs: 200.0,
            bpm: 150.0,
        };

        terminal.draw(|frame| render_frame(frame, &view)).unwrap();
        let buffer = terminal.backend().buffer();

        // Five content rows, bars four tall starting at row 0; footer on the last row.
        let footer: String = (0..20).map(|x| buffer[(x, 5)].symbol()).collect();
        assert!(footer.starts_with("▶ 1:05 / 3:20"), "footer was {footer:?}");

        // Two bars of width 2 with a gap of 1 take five columns, centered at x=7.
        assert_eq!(buffer[(7, 3)].symbol(), "█");
        assert_eq!(buffer[(7, 2)].symbol(), " ");
        assert_eq!(buffer[(10, 1)].symbol(), "█");
        assert_eq!(buffer[(10, 0)].symbol(), " ");
    }
}
