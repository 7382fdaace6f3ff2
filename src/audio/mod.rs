//! Audio synchronization.
//!
//! This module provides:
//! - [`AnswerTick`]: fires a short tick as notes pass the playhead
//! - [`MusicSync`]: keeps background music locked to the chart clock
//! - [`MusicLoader`]: reads and validates the music file off the UI thread
//! - [`AudioEngine`]: the rodio output both drivers talk to
//!
//! Drivers only see the [`TickOutput`] and [`MusicOutput`] traits, so they
//! run unchanged against [`NullAudio`] when no output device is available.

mod answer;
mod engine;
mod loader;
mod music;

pub use answer::AnswerTick;
pub use engine::{AudioEngine, NullAudio};
pub use loader::{resolve_music_path, LoadState, MusicLoader};
pub use music::{target_offset_s, MusicSync, DRIFT_CHECK_MS, DRIFT_LIMIT_S};

use std::sync::Arc;

/// Which tick sample to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickSound {
    Answer,
    Break,
    Touch,
}

/// Short feedback sounds.
pub trait TickOutput {
    fn play_tick(&mut self, sound: TickSound);

    /// Sets tick loudness, 0-1.
    fn set_tick_volume(&mut self, volume: f32);
}

/// A restartable music stream whose position is measured in source time.
pub trait MusicOutput {
    /// Replaces the music asset (encoded file bytes). Stops any running
    /// stream.
    fn set_music(&mut self, data: Option<Arc<[u8]>>);

    /// Whether a music asset is loaded.
    fn has_music(&self) -> bool;

    /// (Re)starts playback `offset_s` seconds into the asset at `rate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be decoded or the output
    /// refuses a new stream.
    fn start_music(&mut self, offset_s: f64, rate: f64) -> anyhow::Result<()>;

    fn stop_music(&mut self);

    fn pause_music(&mut self);

    fn resume_music(&mut self);

    fn set_music_rate(&mut self, rate: f64);

    fn set_music_volume(&mut self, volume: f32);

    /// Seconds into the asset that have been played, or `None` when no
    /// stream is running.
    fn music_position(&self) -> Option<f64>;
}

/// Combined output handed to the session.
pub trait AudioBackend: TickOutput + MusicOutput {}

impl<T: TickOutput + MusicOutput> AudioBackend for T {}
