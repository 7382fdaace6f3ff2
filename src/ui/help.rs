//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and commands in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "?",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "q / Esc",
        description: "Quit",
    },
    KeyBinding {
        key: "Ctrl+C",
        description: "Force quit",
    },
    KeyBinding {
        key: "f",
        description: "Toggle fullscreen playfield",
    },
];

const PLAYBACK_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Space",
        description: "Play / Pause",
    },
    KeyBinding {
        key: ".",
        description: "Stop (rewind to start)",
    },
    KeyBinding {
        key: "Left / Right",
        description: "Step one subdivision",
    },
    KeyBinding {
        key: "[ / ]",
        description: "Step one measure",
    },
    KeyBinding {
        key: "Home",
        description: "Seek to start",
    },
    KeyBinding {
        key: "- / =",
        description: "Playback speed -/+ 0.1",
    },
    KeyBinding {
        key: "1-6",
        description: "Switch difficulty",
    },
];

const DISPLAY_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "h / H",
        description: "Hi-speed -/+ 1",
    },
    KeyBinding {
        key: "m",
        description: "Cycle mirror mode",
    },
    KeyBinding {
        key: "j",
        description: "Cycle judgment line design",
    },
    KeyBinding {
        key: "t",
        description: "Toggle answer sound",
    },
];

const MOUSE_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Click bar",
        description: "Seek to position",
    },
    KeyBinding {
        key: "Drag bar",
        description: "Scrub through the chart",
    },
];

/// Renders the help overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `scroll` - Vertical scroll offset
pub fn render_help(frame: &mut Frame, scroll: u16) {
    let area = centered_rect(60, 70, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Scrollable content
            Constraint::Length(1), // Fixed footer
        ])
        .split(inner);

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);

    let sections: [(&'static str, &[KeyBinding]); 4] = [
        ("General", GENERAL_BINDINGS),
        ("Playback", PLAYBACK_BINDINGS),
        ("Display", DISPLAY_BINDINGS),
        ("Mouse Controls", MOUSE_BINDINGS),
    ];

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (title, bindings) in sections {
        lines.push(Line::from(Span::styled(title, section_style)));
        for binding in bindings {
            lines.push(Line::from(vec![
                Span::styled(format!("{:15}", binding.key), key_style),
                Span::styled(binding.description, desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }

    let help_text = Paragraph::new(lines).scroll((scroll, 0));
    frame.render_widget(help_text, chunks[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Scroll: Up/Down/Mouse  |  Close: ?/Esc/Click",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(footer, chunks[1]);
}
