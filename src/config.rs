//! User-configurable display, sound and music options.
//!
//! The configuration is stored as camelCase JSON so files written by other
//! tools using the same option names load unchanged. Values are clamped to
//! their valid ranges whenever they are loaded or changed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Slowest approach ("flow") speed.
pub const MIN_HI_SPEED: f64 = 3.0;

/// Fastest approach speed.
pub const MAX_HI_SPEED: f64 = 9.0;

/// Default configuration file name in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "simaitui.json";

/// How the ring layout is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MirrorMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Rotate180,
}

impl MirrorMode {
    /// Next mode in display order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Horizontal,
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Rotate180,
            Self::Rotate180 => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
            Self::Rotate180 => "180°",
        }
    }

    /// Whether the mode is a reflection (reverses rotation direction).
    pub fn is_reflection(self) -> bool {
        matches!(self, Self::Horizontal | Self::Vertical)
    }
}

/// Style of the judgment ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JudgmentLineDesign {
    /// Nothing drawn, not even button markers.
    Blind,
    /// Button markers only.
    NoLine,
    /// A plain ring with button markers.
    #[default]
    Simple,
    /// Ring, button markers and the touch-sensor grid.
    Sensor,
}

impl JudgmentLineDesign {
    pub fn next(self) -> Self {
        match self {
            Self::Blind => Self::NoLine,
            Self::NoLine => Self::Simple,
            Self::Simple => Self::Sensor,
            Self::Sensor => Self::Blind,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Blind => "Blind",
            Self::NoLine => "No line",
            Self::Simple => "Simple",
            Self::Sensor => "Sensor",
        }
    }
}

/// All recognised options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Approach speed, 3-9. Higher shows notes for less time.
    pub hi_speed: f64,
    pub mirror_mode: MirrorMode,
    pub judgment_line_design: JudgmentLineDesign,
    /// Spin slide stars while they travel.
    pub slide_rotation: bool,
    /// Draw slide heads in tap pink instead of star blue.
    pub pink_slide_start: bool,
    /// Draw the EX cover on EX notes.
    pub highlight_ex_notes: bool,
    /// Draw break slides in the normal slide colour.
    pub normal_color_break_slide: bool,
    /// Playback speed, 0.1-1.0.
    pub playback_speed: f64,
    pub sound_enabled: bool,
    /// Answer tick volume, 0-1.
    pub sound_volume: f32,
    /// Answer tick offset; positive fires ticks later.
    pub sound_offset_ms: f64,
    /// Tick on touch notes.
    pub sound_touch: bool,
    /// Tick when holds end.
    pub sound_hold_end: bool,
    /// Local path or `file://` URL of the background music.
    pub music_url: Option<String>,
    /// Music offset; positive delays the music against the chart.
    pub music_offset_ms: f64,
    /// Music volume, 0-1.
    pub music_volume: f32,
    pub show_fps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hi_speed: 6.0,
            mirror_mode: MirrorMode::None,
            judgment_line_design: JudgmentLineDesign::Simple,
            slide_rotation: true,
            pink_slide_start: false,
            highlight_ex_notes: true,
            normal_color_break_slide: false,
            playback_speed: 1.0,
            sound_enabled: true,
            sound_volume: 0.5,
            sound_offset_ms: 0.0,
            sound_touch: true,
            sound_hold_end: false,
            music_url: None,
            music_offset_ms: 0.0,
            music_volume: 0.8,
            show_fps: true,
        }
    }
}

/// A single option change sent by a host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    HiSpeed(f64),
    MirrorMode(MirrorMode),
    JudgmentLineDesign(JudgmentLineDesign),
    SlideRotation(bool),
    PinkSlideStart(bool),
    HighlightExNotes(bool),
    NormalColorBreakSlide(bool),
    PlaybackSpeed(f64),
    SoundEnabled(bool),
    SoundVolume(f32),
    SoundOffsetMs(f64),
    SoundTouch(bool),
    SoundHoldEnd(bool),
    MusicUrl(Option<String>),
    MusicOffsetMs(f64),
    MusicVolume(f32),
    ShowFps(bool),
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl Config {
    /// Returns a copy with every value clamped to its valid range.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        self.hi_speed = finite_or(self.hi_speed, defaults.hi_speed).clamp(MIN_HI_SPEED, MAX_HI_SPEED);
        self.playback_speed = finite_or(self.playback_speed, defaults.playback_speed).clamp(
            crate::timeline::MIN_SPEED,
            crate::timeline::MAX_SPEED,
        );
        self.sound_volume = if self.sound_volume.is_finite() {
            self.sound_volume.clamp(0.0, 1.0)
        } else {
            defaults.sound_volume
        };
        self.music_volume = if self.music_volume.is_finite() {
            self.music_volume.clamp(0.0, 1.0)
        } else {
            defaults.music_volume
        };
        self.sound_offset_ms = finite_or(self.sound_offset_ms, 0.0);
        self.music_offset_ms = finite_or(self.music_offset_ms, 0.0);
        self.music_url = self.music_url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Applies one change event.
    ///
    /// # Returns
    ///
    /// `true` if the stored configuration changed.
    pub fn apply(&mut self, event: ConfigEvent) -> bool {
        let mut next = self.clone();
        match event {
            ConfigEvent::HiSpeed(v) => next.hi_speed = v,
            ConfigEvent::MirrorMode(v) => next.mirror_mode = v,
            ConfigEvent::JudgmentLineDesign(v) => next.judgment_line_design = v,
            ConfigEvent::SlideRotation(v) => next.slide_rotation = v,
            ConfigEvent::PinkSlideStart(v) => next.pink_slide_start = v,
            ConfigEvent::HighlightExNotes(v) => next.highlight_ex_notes = v,
            ConfigEvent::NormalColorBreakSlide(v) => next.normal_color_break_slide = v,
            ConfigEvent::PlaybackSpeed(v) => next.playback_speed = v,
            ConfigEvent::SoundEnabled(v) => next.sound_enabled = v,
            ConfigEvent::SoundVolume(v) => next.sound_volume = v,
            ConfigEvent::SoundOffsetMs(v) => next.sound_offset_ms = v,
            ConfigEvent::SoundTouch(v) => next.sound_touch = v,
            ConfigEvent::SoundHoldEnd(v) => next.sound_hold_end = v,
            ConfigEvent::MusicUrl(v) => next.music_url = v,
            ConfigEvent::MusicOffsetMs(v) => next.music_offset_ms = v,
            ConfigEvent::MusicVolume(v) => next.music_volume = v,
            ConfigEvent::ShowFps(v) => next.show_fps = v,
        }
        let next = next.normalized();
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    /// Approach window in milliseconds for the current hi-speed.
    pub fn approach_window_ms(&self) -> f64 {
        crate::render::approach::window_ms(self.hi_speed)
    }

    /// Saves the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a configuration file, normalizing its values.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config.normalized())
    }

    /// Loads a configuration file, falling back to defaults when it is
    /// missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }
}
