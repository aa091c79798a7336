//! Full-screen error message.
//!
//! Used when something goes wrong after the terminal would otherwise have been
//! handed to the bar display, so the message is not lost behind the alternate screen.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

/// Red screen with a centered message, dismissed by any key.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Shows `message` until a key is pressed, then restores the terminal.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized or drawn
    pub fn show(message: &str) -> anyhow::Result<()> {
        let mut screen = Self::new()?;
        let shown = screen.wait_for_key(message);
        screen.cleanup()?;
        shown
    }

    fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    fn wait_for_key(&mut self, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                let style = Style::default().fg(Color::White).bg(Color::Rgb(160, 0, 0));
                frame.render_widget(Block::default().style(style), area);

                let text_area = Rect {
                    x: area.x + area.width / 10,
                    y: area.y + area.height / 3,
                    width: area.width * 8 / 10,
                    height: area.height - area.height / 3,
                };
                let paragraph = Paragraph::new(format!("{message}\n\nPress any key to exit."))
                    .style(style)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, text_area);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    return Ok(());
                }
            }
        }
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
