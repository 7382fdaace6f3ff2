//! simaitui - A terminal simulator for simai-style rhythm game charts.
//!
//! Opens a chart file, draws the radial playfield in the terminal and plays
//! answer ticks and background music in step with the chart clock.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- chart.txt                      # highest difficulty in the file
//! cargo run -- maidata.txt --difficulty 4     # a specific difficulty
//! cargo run -- maidata.txt --music track.mp3  # with background music
//! ```
//!
//! Press `?` for help with keyboard shortcuts.

use simaitui::app::{App, ControlRequest, HI_SPEED_STEP, SPEED_STEP};
use simaitui::audio::{AudioBackend, AudioEngine, NullAudio};
use simaitui::chart::DIFFICULTY_COUNT;
use simaitui::config::{Config, ConfigEvent, DEFAULT_CONFIG_FILE};
use simaitui::ui;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// Chart file to open.
    chart: PathBuf,
    /// Difficulty slot to open instead of the highest.
    difficulty: Option<u8>,
    /// Music file, overriding the configured one.
    music: Option<String>,
    /// Configuration file.
    config: PathBuf,
}

fn print_usage(program: &str) {
    eprintln!("simaitui - Terminal simai chart viewer");
    eprintln!();
    eprintln!("Usage: {} <CHART> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --difficulty N   Open difficulty N (1-6) instead of the highest");
    eprintln!("  -m, --music PATH     Play this audio file (path or file:// URL)");
    eprintln!("  -c, --config PATH    Configuration file (default: {})", DEFAULT_CONFIG_FILE);
    eprintln!("  -h, --help           Print this help message");
}

/// Value following a flag, or exit with an error.
fn arg_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires an argument", flag);
            std::process::exit(1);
        }
    }
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `<CHART>`: the chart file (required)
    /// - `--difficulty <n>` or `-d <n>`: difficulty slot 1-6
    /// - `--music <path>` or `-m <path>`: background music
    /// - `--config <path>` or `-c <path>`: configuration file
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("simaitui");
        let mut chart: Option<PathBuf> = None;
        let mut difficulty: Option<u8> = None;
        let mut music: Option<String> = None;
        let mut config = PathBuf::from(DEFAULT_CONFIG_FILE);
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--difficulty" | "-d" => {
                    i += 1;
                    let raw = arg_value(&args, i, "--difficulty");
                    match raw.parse::<u8>() {
                        Ok(n) if (1..=DIFFICULTY_COUNT).contains(&n) => difficulty = Some(n),
                        _ => {
                            eprintln!("Error: difficulty must be 1-{}, got '{}'", DIFFICULTY_COUNT, raw);
                            std::process::exit(1);
                        }
                    }
                }
                "--music" | "-m" => {
                    i += 1;
                    music = Some(arg_value(&args, i, "--music").to_string());
                }
                "--config" | "-c" => {
                    i += 1;
                    config = PathBuf::from(arg_value(&args, i, "--config"));
                }
                "--help" | "-h" => {
                    print_usage(program);
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                other => {
                    if chart.is_some() {
                        eprintln!("Unexpected argument: {}", other);
                        std::process::exit(1);
                    }
                    chart = Some(PathBuf::from(other));
                }
            }
            i += 1;
        }

        let Some(chart) = chart else {
            print_usage(program);
            std::process::exit(1);
        };

        Ok(Self {
            chart,
            difficulty,
            music,
            config,
        })
    }
}

/// Opens the default audio device, or falls back to silence.
fn open_audio(config: &Config) -> Box<dyn AudioBackend> {
    match AudioEngine::new(config.sound_volume, config.music_volume) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            tracing::warn!("Audio unavailable, running silent: {:#}", e);
            Box::new(NullAudio)
        }
    }
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let source = std::fs::read_to_string(&cli.chart)
        .with_context(|| format!("Failed to read chart {}", cli.chart.display()))?;

    let mut config = Config::load_or_default(&cli.config);
    if let Some(music) = cli.music {
        config.apply(ConfigEvent::MusicUrl(Some(music)));
    }

    let audio = open_audio(&config);
    let mut app = App::new(source, cli.difficulty, config, audio)
        .with_context(|| format!("Failed to parse chart {}", cli.chart.display()))?;

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    if let Err(e) = app.save_config(&cli.config) {
        tracing::error!("Failed to save config: {:#}", e);
    }

    // Handle any errors from the main loop
    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
///
/// Each iteration takes one playhead snapshot, draws with it, then lets the
/// audio drivers act on the same snapshot.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.clear_expired_status();

        let now = app.now_ms();
        let playhead = app.begin_frame(now);
        terminal.draw(|frame| ui::render(frame, app, &playhead))?;
        app.end_frame(&playhead, now);

        // Handle events with a short timeout to keep the frame rate up
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if app.show_help {
                        handle_help_key(app, key.code);
                        continue;
                    }
                    if handle_key(app, key.code, key.modifiers) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    if app.show_help {
                        match mouse.kind {
                            // Click anywhere to close help
                            MouseEventKind::Down(MouseButton::Left) => {
                                app.show_help = false;
                                app.help_scroll = 0;
                            }
                            MouseEventKind::ScrollUp => {
                                app.help_scroll = app.help_scroll.saturating_sub(3);
                            }
                            MouseEventKind::ScrollDown => {
                                app.help_scroll = app.help_scroll.saturating_add(3);
                            }
                            _ => {}
                        }
                        continue;
                    }
                    handle_mouse(app, mouse);
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Handles keys while the help overlay is visible.
fn handle_help_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('?') | KeyCode::Esc => {
            app.show_help = false;
            app.help_scroll = 0; // Reset scroll on close
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            app.help_scroll = app.help_scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            app.help_scroll = app.help_scroll.saturating_add(10);
        }
        KeyCode::Home => {
            app.help_scroll = 0;
        }
        _ => {}
    }
}

/// Handles mouse events. Only the progress bar reacts.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let now = app.now_ms();

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.layout.is_in_progress(x, y) {
                app.scrub_to(x, now);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if app.is_scrubbing() {
                app.scrub_to(x, now);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_scrub(now);
        }
        _ => {}
    }
}

/// Handles a key press event.
///
/// # Returns
///
/// `true` if the application should quit
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    let now = app.now_ms();
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => app.show_help = true,

        // Playback
        KeyCode::Char(' ') => app.control(ControlRequest::TogglePlay, now),
        KeyCode::Char('.') => app.control(ControlRequest::Stop, now),
        KeyCode::Left => app.control(ControlRequest::StepPosition(-1), now),
        KeyCode::Right => app.control(ControlRequest::StepPosition(1), now),
        KeyCode::Char('[') => app.control(ControlRequest::StepMeasure(-1), now),
        KeyCode::Char(']') => app.control(ControlRequest::StepMeasure(1), now),
        KeyCode::Home => app.control(ControlRequest::Seek(0.0), now),
        KeyCode::Char('-') => app.adjust_speed(-SPEED_STEP, now),
        KeyCode::Char('=') | KeyCode::Char('+') => app.adjust_speed(SPEED_STEP, now),
        KeyCode::Char(c @ '1'..='6') => {
            let difficulty = c as u8 - b'0';
            app.control(ControlRequest::SelectDifficulty(difficulty), now);
        }

        // Display
        KeyCode::Char('h') => app.adjust_hi_speed(-HI_SPEED_STEP, now),
        KeyCode::Char('H') => app.adjust_hi_speed(HI_SPEED_STEP, now),
        KeyCode::Char('m') => app.cycle_mirror(now),
        KeyCode::Char('j') => app.cycle_judgment_line(now),
        KeyCode::Char('f') => app.control(ControlRequest::ToggleFullscreen, now),
        KeyCode::Char('t') => app.toggle_sound(now),
        _ => {}
    }
    false
}
