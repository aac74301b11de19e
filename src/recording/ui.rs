//! Terminal user interface for the recording workflow.
//!
//! Pure presentation over the session state machine: a start hint while
//! idle, the numeric countdown while counting down, a scrolling waveform
//! with a recording indicator while capture is live. The waveform surface
//! is always present. Side effects are limited to translating key presses
//! into intents for the controller.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    widgets::{Paragraph, Sparkline},
};
use std::error::Error;
use std::io::{stdout, Stdout};
use std::time::Duration;

use crate::recording::session::SessionState;
use crate::recording::waveform::WaveformView;

/// User intent derived from key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    /// No actionable key pressed.
    Continue,
    /// Begin a new session (countdown then capture).
    Start,
    /// Stop the active recording.
    Stop,
    /// Abort an in-progress countdown.
    CancelCountdown,
    /// Leave the recorder.
    Quit,
}

/// Terminal UI for recording with countdown and waveform display.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    waveform: WaveformView,
    terminal_width: usize,
}

impl RecorderTui {
    /// Creates the TUI and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    pub fn new(reference_level_db: i8) -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        let terminal_width = size.width as usize;

        Ok(RecorderTui {
            terminal,
            waveform: WaveformView::new(terminal_width, reference_level_db),
            terminal_width,
        })
    }

    /// Mutable access to the waveform surface owned by this view.
    pub fn waveform_mut(&mut self) -> &mut WaveformView {
        &mut self.waveform
    }

    /// Feeds the combined samples of the current take into the waveform.
    pub fn update_waveform(&mut self, samples: &[i16], sample_rate: u32) {
        self.waveform.update(samples, sample_rate);
    }

    /// Renders one frame for the given session state.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(
        &mut self,
        state: SessionState,
        countdown_remaining: Option<u32>,
        recording_duration: Duration,
        error: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        let size = self.terminal.size()?;
        let current_width = size.width as usize;
        if current_width != self.terminal_width {
            self.terminal_width = current_width;
            self.waveform.resize(current_width);
        }

        let waveform_data = self.waveform.data().to_vec();
        let volume = self.waveform.last_volume();

        self.terminal.draw(|frame| {
            let area = frame.area();
            let footer_height = 1;

            let content_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            // The waveform surface is always present, whatever the state
            let sparkline = Sparkline::default().data(&waveform_data).max(100).style(
                Style::default()
                    .bg(Color::Rgb(0, 0, 0))
                    .fg(Color::Rgb(206, 224, 220)),
            );
            frame.render_widget(sparkline, content_area);

            if state == SessionState::CountingDown {
                if let Some(remaining) = countdown_remaining {
                    let digit = Paragraph::new(format!("{remaining}"))
                        .style(
                            Style::default()
                                .fg(Color::Rgb(255, 255, 255))
                                .add_modifier(Modifier::BOLD),
                        )
                        .alignment(Alignment::Center);
                    let digit_area = Rect {
                        x: content_area.x,
                        y: content_area.y + content_area.height / 2,
                        width: content_area.width,
                        height: 1.min(content_area.height),
                    };
                    frame.render_widget(digit, digit_area);
                }
            }

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(footer_height),
                width: area.width,
                height: footer_height,
            };

            let footer_line = match state {
                SessionState::Idle => {
                    let mut spans = vec![Span::raw("Enter to record · q to quit")];
                    if let Some(message) = error {
                        spans.push(Span::raw("  "));
                        spans.push(Span::styled(
                            message.to_string(),
                            Style::default().fg(Color::Red),
                        ));
                    }
                    Line::from(spans)
                }
                SessionState::CountingDown => Line::from(vec![Span::raw(format!(
                    "Recording in {}s · c to cancel",
                    countdown_remaining.unwrap_or(0)
                ))]),
                SessionState::Recording => {
                    let secs = recording_duration.as_secs();
                    Line::from(vec![
                        Span::styled("● ", Style::default().fg(Color::Red)),
                        Span::raw(format!("{}:{:02}", secs / 60, secs % 60)),
                        Span::raw(" / "),
                        Span::raw(format!("{volume}%")),
                        Span::raw(" · Enter to stop"),
                    ])
                }
            };

            let footer = Paragraph::new(footer_line).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );
            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Processes key input and maps it to an intent for the current state.
    ///
    /// Enter and Space start while idle and stop while recording; `c` and
    /// Escape abort a countdown; `q`, Escape (outside a countdown) and
    /// Ctrl+C quit. All other keys are ignored.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, state: SessionState) -> Result<RecorderCommand, Box<dyn Error>> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Char('c')
                        if key
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        tracing::debug!("Ctrl+C pressed: quitting");
                        RecorderCommand::Quit
                    }
                    KeyCode::Enter | KeyCode::Char(' ') => match state {
                        SessionState::Idle => {
                            tracing::debug!("Start requested");
                            RecorderCommand::Start
                        }
                        SessionState::Recording => {
                            tracing::debug!("Stop requested");
                            RecorderCommand::Stop
                        }
                        SessionState::CountingDown => RecorderCommand::Continue,
                    },
                    KeyCode::Char('c') if state == SessionState::CountingDown => {
                        tracing::debug!("Countdown cancel requested");
                        RecorderCommand::CancelCountdown
                    }
                    KeyCode::Esc => {
                        if state == SessionState::CountingDown {
                            RecorderCommand::CancelCountdown
                        } else {
                            RecorderCommand::Quit
                        }
                    }
                    KeyCode::Char('q') => {
                        tracing::debug!("'q' pressed: quitting");
                        RecorderCommand::Quit
                    }
                    _ => RecorderCommand::Continue,
                });
            }
        }
        Ok(RecorderCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
