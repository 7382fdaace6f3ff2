//! Terminal user interface components.
//!
//! This module lays out the transport bar, the playfield and the progress
//! bar, and replays each frame of the radial renderer onto a braille raster.

mod canvas;
mod help;
mod transport;

use crate::app::{App, LayoutRegions};
use crate::chart::difficulty_name;
use crate::render::render_frame;
use crate::timeline::Playhead;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub use canvas::Raster;
pub use help::render_help;
pub use transport::{render_progress, render_transport};

/// Calculates the transport, playfield and progress areas.
///
/// In fullscreen the playfield takes the whole terminal and the other two
/// areas are empty.
fn calculate_layout(size: Rect, fullscreen: bool) -> [Rect; 3] {
    if fullscreen {
        return [Rect::default(), size, Rect::default()];
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Min(5),    // Playfield
            Constraint::Length(3), // Progress
        ])
        .split(size);
    [chunks[0], chunks[1], chunks[2]]
}

/// Title of the playfield panel: chart, difficulty and level.
fn playfield_title(app: &App) -> String {
    let chart = app.chart();
    match chart.difficulty() {
        Some(difficulty) => {
            let level = chart
                .metadata()
                .levels
                .get(&difficulty)
                .map(|l| format!(" {}", l))
                .unwrap_or_default();
            format!(
                " {} [{}{}] ",
                chart.display_title(),
                difficulty_name(difficulty),
                level
            )
        }
        None => format!(" {} ", chart.display_title()),
    }
}

/// Draws the chart at `playhead` into `area`.
fn render_playfield(frame: &mut Frame, area: Rect, app: &App, playhead: &Playhead) {
    let mut raster = Raster::new(area.width, area.height);
    render_frame(
        &mut raster,
        app.chart(),
        playhead,
        app.config(),
        &app.frame_stats(),
    );
    frame.render_widget(Paragraph::new(raster.lines()), area);
}

/// Renders the complete UI and updates layout regions.
///
/// The layout is divided into:
/// - Top: transport bar with playback state and options
/// - Center: the playfield
/// - Bottom: progress bar (click or drag to seek)
pub fn render(frame: &mut Frame, app: &mut App, playhead: &Playhead) {
    let [transport_area, playfield_area, progress_area] =
        calculate_layout(frame.area(), app.fullscreen);

    let mut layout = LayoutRegions {
        transport: transport_area,
        canvas: playfield_area,
        progress: Rect::default(),
    };

    if app.fullscreen {
        render_playfield(frame, playfield_area, app, playhead);
    } else {
        render_transport(frame, transport_area, app, playhead);

        let block = Block::default()
            .title(playfield_title(app))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(playfield_area);
        frame.render_widget(block, playfield_area);
        render_playfield(frame, inner, app, playhead);
        layout.canvas = inner;

        layout.progress = render_progress(frame, progress_area, app, playhead);
    }

    app.update_layout(layout);

    if app.show_help {
        render_help(frame, app.help_scroll);
    }
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
