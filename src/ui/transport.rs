//! Transport bar and progress bar rendering.
//!
//! Displays the playback state, position, speed and music status, and the
//! scrubbable progress bar under the playfield.

use crate::app::App;
use crate::audio::LoadState;
use crate::timeline::Playhead;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Renders the transport bar at the top of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `playhead` - This frame's snapshot
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App, playhead: &Playhead) {
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(13), // Playback state
            Constraint::Length(16), // Position
            Constraint::Length(14), // Speed
            Constraint::Length(10), // Hi-speed
            Constraint::Length(18), // Music
            Constraint::Min(20),    // Status/options
        ])
        .split(inner);

    let transport = app.transport();
    let play_status = if transport.is_playing() {
        Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else if transport.is_pending() {
        Span::styled(
            " [~] WAIT ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else if playhead.beat > 0.0 {
        Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " [.] STOP ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let position = format!("{}/{}", playhead.measure + 1, app.measure_count().max(1));
    let position_widget = Paragraph::new(Line::from(vec![
        Span::styled("Bar: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            position,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(position_widget, chunks[1]);

    let speed_widget = Paragraph::new(Line::from(vec![
        Span::styled("Speed: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}x", playhead.speed),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(speed_widget, chunks[2]);

    let hi_speed_widget = Paragraph::new(Line::from(vec![
        Span::styled("HS: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}", app.config().hi_speed),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(hi_speed_widget, chunks[3]);

    let (music, music_color) = match app.load_state() {
        LoadState::Idle => ("none", Color::DarkGray),
        LoadState::Loading => ("loading", Color::Cyan),
        LoadState::Ready => ("ready", Color::Green),
        LoadState::Failed(_) => ("failed", Color::Red),
    };
    let music_widget = Paragraph::new(Line::from(vec![
        Span::styled("Music: ", Style::default().fg(Color::DarkGray)),
        Span::styled(music, Style::default().fg(music_color)),
    ]));
    frame.render_widget(music_widget, chunks[4]);

    let status_line = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        let config = app.config();
        Line::from(Span::styled(
            format!(
                "Mirror: {}  Line: {}  Sound: {}",
                config.mirror_mode.label(),
                config.judgment_line_design.label(),
                if config.sound_enabled { "on" } else { "off" }
            ),
            Style::default().fg(Color::Blue),
        ))
    };
    frame.render_widget(Paragraph::new(status_line), chunks[5]);
}

/// Builds the bar: played part, head marker, remainder.
fn progress_line(width: u16, fraction: f64) -> Line<'static> {
    let width = width as usize;
    if width == 0 {
        return Line::from("");
    }
    let head = ((width - 1) as f64 * fraction.clamp(0.0, 1.0)).round() as usize;
    Line::from(vec![
        Span::styled("━".repeat(head), Style::default().fg(Color::Cyan)),
        Span::styled(
            "●",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "─".repeat(width - 1 - head),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Renders the progress bar.
///
/// # Returns
///
/// The clickable inner row, for mouse hit testing.
pub fn render_progress(frame: &mut Frame, area: Rect, app: &App, playhead: &Playhead) -> Rect {
    let title = if app.is_scrubbing() {
        format!(" {} (scrubbing) ", app.position_string())
    } else {
        format!(" {} ", app.position_string())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(progress_line(inner.width, app.progress(playhead))),
        inner,
    );
    inner
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_progress_line_width() {
        for fraction in [0.0, 0.3, 1.0] {
            assert_eq!(text(&progress_line(20, fraction)).chars().count(), 20);
        }
    }

    #[test]
    fn test_progress_head_position() {
        assert!(text(&progress_line(11, 0.0)).starts_with('●'));
        assert!(text(&progress_line(11, 1.0)).ends_with('●'));
        assert_eq!(text(&progress_line(11, 0.5)).chars().position(|c| c == '●'), Some(5));
        assert_eq!(text(&progress_line(0, 0.5)), "");
    }
}
