//! Viewer session state.
//!
//! The [`App`] owns everything one open chart needs: the source text, the
//! parsed [`Chart`], the playback [`Transport`], both audio drivers and the
//! user configuration. The host calls [`App::begin_frame`] once per
//! iteration to get the frame's [`Playhead`], renders with it, then hands
//! the same snapshot to [`App::end_frame`] for the audio drivers.

use crate::audio::{AnswerTick, AudioBackend, LoadState, MusicLoader, MusicSync};
use crate::chart::{self, difficulty_name, Chart, ParseError, BEATS_PER_MEASURE};
use crate::config::{Config, ConfigEvent};
use crate::fps::FpsCounter;
use crate::render::FrameStats;
use crate::timeline::{PlayOutcome, Playhead, Transport};
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_DURATION: Duration = Duration::from_secs(3);

/// Minimum interval between committed seeks while dragging the progress bar.
pub const SCRUB_COMMIT_MS: f64 = 32.0;

/// Playback speed change per key press.
pub const SPEED_STEP: f64 = 0.1;

/// Hi-speed change per key press.
pub const HI_SPEED_STEP: f64 = 1.0;

/// Layout regions for mouse hit testing.
/// Stores the screen coordinates of each UI panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRegions {
    /// Transport and chart info bar at the top.
    pub transport: Rect,
    /// The playfield canvas.
    pub canvas: Rect,
    /// The progress bar (inner area, excluding borders).
    pub progress: Rect,
}

impl LayoutRegions {
    /// Checks if a point is within a rectangle.
    fn contains(rect: Rect, x: u16, y: u16) -> bool {
        x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
    }

    pub fn is_in_progress(&self, x: u16, y: u16) -> bool {
        Self::contains(self.progress, x, y)
    }

    /// Horizontal position within the progress bar as a fraction.
    ///
    /// The row is ignored so a drag that strays off the bar keeps scrubbing.
    ///
    /// # Returns
    ///
    /// A value in 0.0..=1.0, or `None` before the bar has been laid out.
    pub fn progress_fraction(&self, x: u16) -> Option<f64> {
        let bar = self.progress;
        if bar.width == 0 {
            return None;
        }
        if bar.width == 1 {
            return Some(0.0);
        }
        let offset = x.saturating_sub(bar.x).min(bar.width - 1);
        Some(offset as f64 / (bar.width - 1) as f64)
    }
}

/// Playback and view requests a host can send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlRequest {
    TogglePlay,
    Play,
    Pause,
    Stop,
    /// Seek to an absolute beat.
    Seek(f64),
    /// Seek to the start of a measure.
    SetMeasure(u32),
    /// Step one subdivision; the sign gives the direction.
    StepPosition(i32),
    /// Step one measure; the sign gives the direction.
    StepMeasure(i32),
    ToggleFullscreen,
    SelectDifficulty(u8),
}

/// An in-progress progress-bar drag.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scrub {
    /// Beat under the pointer.
    beat: f64,
    /// Whether `beat` has been written to the transport.
    committed: bool,
    last_commit_ms: f64,
}

/// Main application state.
pub struct App {
    /// Chart text as loaded, kept for difficulty switches.
    source: String,
    chart: Chart,
    transport: Transport,
    answer: AnswerTick,
    music: MusicSync,
    loader: MusicLoader,
    audio: Box<dyn AudioBackend>,
    config: Config,
    /// Configuration changed since load.
    config_dirty: bool,
    /// Origin of the session's wall clock.
    epoch: Instant,
    fps: FpsCounter,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// Hide everything but the playfield.
    pub fullscreen: bool,
    pub show_help: bool,
    /// Help overlay scroll offset.
    pub help_scroll: u16,
    /// Layout regions for mouse hit testing (updated each frame).
    pub layout: LayoutRegions,
    scrub: Option<Scrub>,
}

impl App {
    /// Opens a chart for viewing.
    ///
    /// # Arguments
    ///
    /// * `source` - Full chart text
    /// * `difficulty` - Difficulty slot to show, or `None` for the highest
    /// * `config` - User configuration (normalized here)
    /// * `audio` - Audio output; pass [`crate::audio::NullAudio`] to run silent
    ///
    /// # Errors
    ///
    /// Returns the parse error if the chart text cannot be parsed.
    pub fn new(
        source: String,
        difficulty: Option<u8>,
        config: Config,
        mut audio: Box<dyn AudioBackend>,
    ) -> Result<Self, ParseError> {
        let chart = chart::parse(&source, difficulty)?;
        let config = config.normalized();
        tracing::info!(
            "Parsed '{}': {} notes, {} measures",
            chart.display_title(),
            chart.notes().len(),
            chart.total_measures()
        );

        audio.set_tick_volume(config.sound_volume);
        audio.set_music_volume(config.music_volume);

        let epoch = Instant::now();
        let mut transport = Transport::new();
        transport.set_speed(&chart, config.playback_speed, 0.0);
        let mut loader = MusicLoader::new();
        loader.request(config.music_url.as_deref());

        Ok(Self {
            source,
            chart,
            transport,
            answer: AnswerTick::new(),
            music: MusicSync::new(),
            loader,
            audio,
            config,
            config_dirty: false,
            epoch,
            fps: FpsCounter::new(epoch),
            status_message: None,
            fullscreen: false,
            show_help: false,
            help_scroll: 0,
            layout: LayoutRegions::default(),
            scrub: None,
        })
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the configuration should be written back on exit.
    pub fn config_dirty(&self) -> bool {
        self.config_dirty
    }

    pub fn load_state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    /// Milliseconds since the session started.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    pub fn frame_stats(&self) -> FrameStats {
        FrameStats {
            fps: self.fps.fps(),
        }
    }

    /// Updates the layout regions based on current terminal size.
    /// Called by the UI module during rendering.
    pub fn update_layout(&mut self, layout: LayoutRegions) {
        self.layout = layout;
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_DURATION {
                self.status_message = None;
            }
        }
    }

    /// Starts the frame: picks up a finished music load, advances the clock
    /// and returns the snapshot every consumer of this frame reads.
    ///
    /// While the progress bar is being dragged the snapshot shows the
    /// pointer's position and reports playback as halted, so neither audio
    /// driver reacts to uncommitted positions.
    pub fn begin_frame(&mut self, now_ms: f64) -> Playhead {
        self.poll_music(now_ms);

        if let Some(scrub) = self.scrub {
            if !scrub.committed && now_ms - scrub.last_commit_ms >= SCRUB_COMMIT_MS {
                self.commit_scrub(now_ms);
            }
        }

        let playhead = self.transport.tick(&self.chart, now_ms);
        match self.scrub {
            Some(scrub) => {
                let mut preview = self.transport.clone();
                preview.seek(&self.chart, scrub.beat, now_ms);
                Playhead {
                    seek_version: playhead.seek_version,
                    playing: false,
                    ..preview.playhead(&self.chart)
                }
            }
            None => playhead,
        }
    }

    /// Finishes the frame: fires answer ticks, then keeps the music in step.
    ///
    /// # Returns
    ///
    /// Number of answer ticks that fired.
    pub fn end_frame(&mut self, playhead: &Playhead, now_ms: f64) -> usize {
        let fired = self
            .answer
            .update(&mut *self.audio, &self.chart, playhead, &self.config);
        self.music
            .update(&mut *self.audio, &self.chart, playhead, &self.config, now_ms);
        self.fps
            .frame(self.epoch + Duration::from_secs_f64(now_ms.max(0.0) / 1000.0));
        fired
    }

    /// Hands a finished music load to the audio output.
    fn poll_music(&mut self, now_ms: f64) {
        if !self.loader.is_loading() {
            return;
        }
        let data = self.loader.poll();
        if self.loader.is_loading() {
            return;
        }
        match data {
            Some(data) => {
                self.audio.set_music(Some(data));
                self.music.reset();
                if self.transport.asset_ready(&self.chart, now_ms) {
                    self.set_status("Music loaded, playing");
                } else {
                    self.set_status("Music loaded");
                }
            }
            None => {
                self.transport.cancel_pending();
                if let LoadState::Failed(reason) = self.loader.state() {
                    let message = format!("Music failed to load: {}", reason);
                    self.set_status(message);
                }
            }
        }
    }

    /// Applies a playback or view request.
    pub fn control(&mut self, request: ControlRequest, now_ms: f64) {
        match request {
            ControlRequest::TogglePlay => {
                if self.transport.is_playing() || self.transport.is_pending() {
                    self.control(ControlRequest::Pause, now_ms);
                } else {
                    self.control(ControlRequest::Play, now_ms);
                }
            }
            ControlRequest::Play => self.play(now_ms),
            ControlRequest::Pause => {
                self.transport.pause(&self.chart, now_ms);
                self.set_status("Paused");
            }
            ControlRequest::Stop => {
                self.transport.stop();
                self.set_status("Stopped");
            }
            ControlRequest::Seek(beat) => {
                self.transport.seek(&self.chart, beat, now_ms);
                self.show_position();
            }
            ControlRequest::SetMeasure(measure) => {
                self.transport.set_measure(&self.chart, measure, now_ms);
                self.show_position();
            }
            ControlRequest::StepPosition(direction) => {
                self.transport.step_position(&self.chart, direction, now_ms);
                self.show_position();
            }
            ControlRequest::StepMeasure(direction) => {
                self.transport.step_measure(&self.chart, direction, now_ms);
                self.show_position();
            }
            ControlRequest::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
            }
            ControlRequest::SelectDifficulty(difficulty) => {
                self.select_difficulty(difficulty);
            }
        }
    }

    fn play(&mut self, now_ms: f64) {
        if let LoadState::Failed(reason) = self.loader.state() {
            let message = format!("Cannot play: music failed to load ({})", reason);
            self.set_status(message);
            return;
        }
        let ready = !self.loader.is_loading();
        match self.transport.play(&self.chart, now_ms, ready) {
            PlayOutcome::Started => self.set_status("Playing"),
            PlayOutcome::Deferred => self.set_status("Waiting for music to load..."),
            PlayOutcome::AlreadyPlaying => {}
        }
    }

    fn show_position(&mut self) {
        let message = format!("Seek to {}", self.position_string());
        self.set_status(message);
    }

    /// Current position formatted as "measure:step".
    pub fn position_string(&self) -> String {
        let playhead = self.transport.playhead(&self.chart);
        format!("{}:{:02}", playhead.measure + 1, playhead.sub_measure + 1)
    }

    /// Reparses the source for another difficulty and replaces the chart.
    ///
    /// On failure the current chart stays loaded.
    ///
    /// # Returns
    ///
    /// `true` if the chart was replaced.
    pub fn select_difficulty(&mut self, difficulty: u8) -> bool {
        match chart::parse(&self.source, Some(difficulty)) {
            Ok(chart) => {
                tracing::info!(
                    "Switched to {} ({} notes)",
                    difficulty_name(difficulty),
                    chart.notes().len()
                );
                self.chart = chart;
                self.scrub = None;
                self.transport.stop();
                self.answer.reset();
                self.audio.stop_music();
                self.music.reset();
                self.set_status(format!("Difficulty: {}", difficulty_name(difficulty)));
                true
            }
            Err(e) => {
                tracing::warn!("Cannot switch difficulty: {}", e);
                self.set_status(e.to_string());
                false
            }
        }
    }

    /// Applies one configuration change and its side effects.
    ///
    /// # Returns
    ///
    /// `true` if the configuration changed.
    pub fn apply(&mut self, event: ConfigEvent, now_ms: f64) -> bool {
        let previous = self.config.clone();
        if !self.config.apply(event) {
            return false;
        }
        self.config_dirty = true;

        if self.config.playback_speed != previous.playback_speed {
            self.transport
                .set_speed(&self.chart, self.config.playback_speed, now_ms);
        }
        if self.config.sound_volume != previous.sound_volume {
            self.audio.set_tick_volume(self.config.sound_volume);
        }
        if self.config.music_volume != previous.music_volume {
            self.audio.set_music_volume(self.config.music_volume);
        }
        if self.config.music_url != previous.music_url {
            self.audio.set_music(None);
            self.music.reset();
            self.loader.request(self.config.music_url.as_deref());
            if !self.loader.is_loading() {
                self.transport.asset_ready(&self.chart, now_ms);
            }
        }
        true
    }

    /// Nudges playback speed by `delta`.
    pub fn adjust_speed(&mut self, delta: f64, now_ms: f64) {
        let speed = ((self.config.playback_speed + delta) * 10.0).round() / 10.0;
        self.apply(ConfigEvent::PlaybackSpeed(speed), now_ms);
        let message = format!("Speed: {:.1}x", self.config.playback_speed);
        self.set_status(message);
    }

    /// Nudges hi-speed by `delta`.
    pub fn adjust_hi_speed(&mut self, delta: f64, now_ms: f64) {
        self.apply(ConfigEvent::HiSpeed(self.config.hi_speed + delta), now_ms);
        let message = format!("Hi-speed: {:.1}", self.config.hi_speed);
        self.set_status(message);
    }

    pub fn cycle_mirror(&mut self, now_ms: f64) {
        let mode = self.config.mirror_mode.next();
        self.apply(ConfigEvent::MirrorMode(mode), now_ms);
        self.set_status(format!("Mirror: {}", mode.label()));
    }

    pub fn cycle_judgment_line(&mut self, now_ms: f64) {
        let design = self.config.judgment_line_design.next();
        self.apply(ConfigEvent::JudgmentLineDesign(design), now_ms);
        self.set_status(format!("Judgment line: {}", design.label()));
    }

    pub fn toggle_sound(&mut self, now_ms: f64) {
        let enabled = !self.config.sound_enabled;
        self.apply(ConfigEvent::SoundEnabled(enabled), now_ms);
        self.set_status(if enabled { "Sound on" } else { "Sound off" });
    }

    /// Moves the scrub position to screen column `x` of the progress bar.
    ///
    /// Starts a drag if none is active. The visible playhead follows every
    /// call; the transport is updated at most once per [`SCRUB_COMMIT_MS`].
    pub fn scrub_to(&mut self, x: u16, now_ms: f64) {
        let Some(fraction) = self.layout.progress_fraction(x) else {
            return;
        };
        let beat = fraction * self.chart.end_beat();
        let last_commit_ms = self
            .scrub
            .map(|s| s.last_commit_ms)
            .unwrap_or(f64::NEG_INFINITY);
        self.scrub = Some(Scrub {
            beat,
            committed: false,
            last_commit_ms,
        });
        if now_ms - last_commit_ms >= SCRUB_COMMIT_MS {
            self.commit_scrub(now_ms);
        }
    }

    /// Ends a drag, committing the final position.
    pub fn end_scrub(&mut self, now_ms: f64) {
        if let Some(scrub) = self.scrub.take() {
            self.transport.seek(&self.chart, scrub.beat, now_ms);
            self.show_position();
        }
    }

    fn commit_scrub(&mut self, now_ms: f64) {
        if let Some(scrub) = self.scrub.as_mut() {
            scrub.committed = true;
            scrub.last_commit_ms = now_ms;
            let beat = scrub.beat;
            self.transport.seek(&self.chart, beat, now_ms);
        }
    }

    /// Fraction of the chart already played, for the progress bar.
    pub fn progress(&self, playhead: &Playhead) -> f64 {
        let end = self.chart.end_beat();
        if end <= 0.0 {
            return 0.0;
        }
        (playhead.beat / end).clamp(0.0, 1.0)
    }

    /// Total measure count shown next to the position.
    pub fn measure_count(&self) -> u32 {
        (self.chart.end_beat() / BEATS_PER_MEASURE).ceil() as u32
    }

    /// Saves the configuration if it changed.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_config<P: AsRef<std::path::Path>>(&mut self, path: P) -> anyhow::Result<()> {
        if !self.config_dirty {
            return Ok(());
        }
        self.config.save_to_file(path)?;
        self.config_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudio;
    use crate::timeline::PlaybackState;

    const TWO_DIFFICULTIES: &str = "&title=Test\n&inote_2=(120){4}1,2,3,4,\n&inote_5=(150){8}1,2,3,4,5,6,7,8,\n";

    fn app(source: &str) -> App {
        App::new(
            source.to_string(),
            None,
            Config::default(),
            Box::new(NullAudio),
        )
        .unwrap()
    }

    fn with_progress_bar(mut app: App) -> App {
        app.update_layout(LayoutRegions {
            progress: Rect::new(10, 20, 101, 1),
            ..Default::default()
        });
        app
    }

    #[test]
    fn test_opens_highest_difficulty() {
        let app = app(TWO_DIFFICULTIES);
        assert_eq!(app.chart().difficulty(), Some(5));
        assert!(!app.config_dirty());
        assert_eq!(app.load_state(), &LoadState::Idle);
    }

    #[test]
    fn test_parse_error_is_returned() {
        let result = App::new(String::new(), None, Config::default(), Box::new(NullAudio));
        assert!(result.is_err());
    }

    #[test]
    fn test_select_difficulty_replaces_chart() {
        let mut app = app(TWO_DIFFICULTIES);
        app.control(ControlRequest::Seek(8.0), 0.0);
        assert!(app.select_difficulty(2));
        assert_eq!(app.chart().difficulty(), Some(2));
        assert_eq!(app.transport().beat(), 0.0);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_select_missing_difficulty_keeps_chart() {
        let mut app = app(TWO_DIFFICULTIES);
        assert!(!app.select_difficulty(3));
        assert_eq!(app.chart().difficulty(), Some(5));
    }

    #[test]
    fn test_toggle_play_and_pause() {
        let mut app = app(TWO_DIFFICULTIES);
        app.control(ControlRequest::TogglePlay, 0.0);
        assert!(app.transport().is_playing());
        let playhead = app.begin_frame(500.0);
        assert!(playhead.playing);
        assert!(playhead.beat > 0.0);
        app.control(ControlRequest::TogglePlay, 500.0);
        assert!(matches!(app.transport().state(), PlaybackState::Paused { .. }));
    }

    #[test]
    fn test_frame_snapshot_feeds_answer_ticks() {
        let mut app = app("(120){4}1,2,3,4,");
        app.control(ControlRequest::Play, 0.0);
        let mut fired = 0;
        let mut now = 0.0;
        while now < 4000.0 {
            let playhead = app.begin_frame(now);
            fired += app.end_frame(&playhead, now);
            now += 16.0;
        }
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_fullscreen_toggle() {
        let mut app = app(TWO_DIFFICULTIES);
        app.control(ControlRequest::ToggleFullscreen, 0.0);
        assert!(app.fullscreen);
        app.control(ControlRequest::ToggleFullscreen, 0.0);
        assert!(!app.fullscreen);
    }

    #[test]
    fn test_apply_marks_dirty_and_changes_speed() {
        let mut app = app(TWO_DIFFICULTIES);
        assert!(app.apply(ConfigEvent::PlaybackSpeed(0.5), 0.0));
        assert!(app.config_dirty());
        assert!((app.transport().speed() - 0.5).abs() < 1e-9);
        assert!(!app.apply(ConfigEvent::PlaybackSpeed(0.5), 0.0));
    }

    #[test]
    fn test_adjust_speed_clamps() {
        let mut app = app(TWO_DIFFICULTIES);
        app.adjust_speed(SPEED_STEP, 0.0);
        assert!((app.config().playback_speed - 1.0).abs() < 1e-9);
        for _ in 0..20 {
            app.adjust_speed(-SPEED_STEP, 0.0);
        }
        assert!((app.config().playback_speed - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_hi_speed_clamps() {
        let mut app = app(TWO_DIFFICULTIES);
        for _ in 0..20 {
            app.adjust_hi_speed(HI_SPEED_STEP, 0.0);
        }
        assert_eq!(app.config().hi_speed, crate::config::MAX_HI_SPEED);
    }

    #[test]
    fn test_failed_music_blocks_play() {
        let config = Config {
            music_url: Some("/definitely/not/here.ogg".to_string()),
            ..Default::default()
        };
        let mut app = App::new(
            "(120){4}1,2,".to_string(),
            None,
            config,
            Box::new(NullAudio),
        )
        .unwrap();

        app.control(ControlRequest::Play, 0.0);
        assert!(app.transport().is_pending());

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.loader.is_loading() && Instant::now() < deadline {
            app.begin_frame(0.0);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(app.load_state(), LoadState::Failed(_)));
        assert!(!app.transport().is_pending());

        app.control(ControlRequest::Play, 10.0);
        assert!(!app.transport().is_playing());
    }

    #[test]
    fn test_clearing_music_url_releases_pending_play() {
        let config = Config {
            music_url: Some("/definitely/not/here.ogg".to_string()),
            ..Default::default()
        };
        let mut app = App::new(
            "(120){4}1,2,".to_string(),
            None,
            config,
            Box::new(NullAudio),
        )
        .unwrap();
        app.control(ControlRequest::Play, 0.0);
        assert!(app.transport().is_pending());
        assert!(app.apply(ConfigEvent::MusicUrl(None), 5.0));
        assert!(app.transport().is_playing());
    }

    #[test]
    fn test_progress_fraction() {
        let layout = LayoutRegions {
            progress: Rect::new(10, 5, 11, 1),
            ..Default::default()
        };
        assert_eq!(layout.progress_fraction(10), Some(0.0));
        assert_eq!(layout.progress_fraction(15), Some(0.5));
        assert_eq!(layout.progress_fraction(40), Some(1.0));
        assert_eq!(layout.progress_fraction(0), Some(0.0));
        assert!(layout.is_in_progress(12, 5));
        assert!(!layout.is_in_progress(12, 6));
        assert_eq!(LayoutRegions::default().progress_fraction(3), None);
    }

    #[test]
    fn test_scrub_throttles_commits() {
        let mut app = with_progress_bar(app("(120){4}1,2,3,4,5,6,7,8,"));
        let end = app.chart().end_beat();
        let version = app.transport().seek_version();

        app.scrub_to(60, 0.0);
        assert_eq!(app.transport().seek_version(), version + 1);

        // Within the throttle window: visible position moves, transport does not.
        app.scrub_to(110, 10.0);
        assert_eq!(app.transport().seek_version(), version + 1);
        let playhead = app.begin_frame(12.0);
        assert!((playhead.beat - end).abs() < 1e-9);
        assert!(!playhead.playing);
        assert!((app.transport().beat() - end * 0.5).abs() < 1e-9);

        // The next frame past the window commits.
        app.begin_frame(40.0);
        assert_eq!(app.transport().seek_version(), version + 2);
        assert!((app.transport().beat() - end).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_release_always_commits() {
        let mut app = with_progress_bar(app("(120){4}1,2,3,4,5,6,7,8,"));
        let end = app.chart().end_beat();
        app.scrub_to(10, 0.0);
        app.scrub_to(35, 5.0);
        app.end_scrub(6.0);
        assert!(!app.is_scrubbing());
        assert!((app.transport().beat() - end * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_while_playing_keeps_playing() {
        let mut app = with_progress_bar(app("(120){4}1,2,3,4,5,6,7,8,"));
        app.control(ControlRequest::Play, 0.0);
        app.scrub_to(60, 100.0);
        app.end_scrub(120.0);
        assert!(app.transport().is_playing());
        let playhead = app.begin_frame(200.0);
        assert!(playhead.playing);
    }

    #[test]
    fn test_status_message_set() {
        let mut app = app(TWO_DIFFICULTIES);
        app.set_status("hello");
        app.clear_expired_status();
        assert_eq!(
            app.status_message.as_ref().map(|(m, _)| m.as_str()),
            Some("hello")
        );
    }

    #[test]
    fn test_save_config_only_when_dirty() {
        let path = std::env::temp_dir().join("simaitui_app_config_test.json");
        let _ = std::fs::remove_file(&path);
        let mut app = app(TWO_DIFFICULTIES);
        app.save_config(&path).unwrap();
        assert!(!path.exists());
        app.toggle_sound(0.0);
        app.save_config(&path).unwrap();
        assert!(path.exists());
        assert!(!app.config_dirty());
        let loaded = Config::load_from_file(&path).unwrap();
        assert!(!loaded.sound_enabled);
        let _ = std::fs::remove_file(&path);
    }
}
