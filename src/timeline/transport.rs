//! Playback state machine.
//!
//! The [`Transport`] owns the playback clock. While playing it stores the
//! wall-clock instant and chart position at which playback (re)started; the
//! current position is derived from elapsed time, scaled by playback speed
//! and mapped back to beats through the tempo map. Each frame it hands out
//! one [`Playhead`] snapshot that every consumer reads.

use super::tempo;
use crate::chart::{Chart, BEATS_PER_MEASURE};

/// Slowest playback speed.
pub const MIN_SPEED: f64 = 0.1;

/// Fastest playback speed.
pub const MAX_SPEED: f64 = 1.0;

/// Current playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Stopped,
    Playing {
        /// Wall clock (ms) when playback last (re)started.
        start_wall_ms: f64,
        /// Chart position when playback last (re)started.
        start_beat: f64,
    },
    Paused {
        beat: f64,
    },
}

/// Result of a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// Waiting for an audio asset; playback starts when it arrives.
    Deferred,
    AlreadyPlaying,
}

/// Immutable view of the playback position for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playhead {
    pub beat: f64,
    pub ms: f64,
    pub measure: u32,
    pub sub_measure: u32,
    /// Incremented by every seek; audio drivers drop stale state when it
    /// changes.
    pub seek_version: u64,
    pub speed: f64,
    pub playing: bool,
}

/// The playback clock and its transitions.
#[derive(Debug, Clone)]
pub struct Transport {
    state: PlaybackState,
    /// Last computed position.
    beat: f64,
    speed: f64,
    seek_version: u64,
    /// Play was requested while an asset was still loading.
    pending_play: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// Creates a stopped transport at beat 0, full speed.
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            beat: 0.0,
            speed: MAX_SPEED,
            seek_version: 0,
            pending_play: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn is_pending(&self) -> bool {
        self.pending_play
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn seek_version(&self) -> u64 {
        self.seek_version
    }

    /// Last computed position, without advancing the clock.
    pub fn beat(&self) -> f64 {
        self.beat
    }

    /// Starts or resumes playback.
    ///
    /// Rewinds to the start first when the playhead sits at the chart's end.
    ///
    /// # Arguments
    ///
    /// * `chart` - Chart being played
    /// * `now_ms` - Current wall-clock time in milliseconds
    /// * `asset_ready` - `false` while an audio asset is still loading; the
    ///   request is then recorded and honoured by [`Transport::asset_ready`]
    pub fn play(&mut self, chart: &Chart, now_ms: f64, asset_ready: bool) -> PlayOutcome {
        if self.is_playing() {
            return PlayOutcome::AlreadyPlaying;
        }
        if !asset_ready {
            self.pending_play = true;
            tracing::info!("Play deferred until audio finishes loading");
            return PlayOutcome::Deferred;
        }
        self.pending_play = false;
        if self.beat >= chart.end_beat() {
            self.seek(chart, 0.0, now_ms);
        }
        self.state = PlaybackState::Playing {
            start_wall_ms: now_ms,
            start_beat: self.beat,
        };
        tracing::info!("Playing from beat {:.3}", self.beat);
        PlayOutcome::Started
    }

    /// Called when a pending asset has loaded. Starts playback if a play
    /// request was deferred.
    pub fn asset_ready(&mut self, chart: &Chart, now_ms: f64) -> bool {
        if !self.pending_play {
            return false;
        }
        self.play(chart, now_ms, true) == PlayOutcome::Started
    }

    /// Drops a deferred play request.
    pub fn cancel_pending(&mut self) {
        self.pending_play = false;
    }

    /// Pauses playback, keeping the current position.
    pub fn pause(&mut self, chart: &Chart, now_ms: f64) {
        self.pending_play = false;
        if self.is_playing() {
            self.beat = self.current_beat(chart, now_ms);
            self.state = PlaybackState::Paused { beat: self.beat };
            tracing::info!("Paused at beat {:.3}", self.beat);
        }
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) {
        self.pending_play = false;
        self.state = PlaybackState::Stopped;
        self.beat = 0.0;
        self.seek_version += 1;
        tracing::info!("Stopped");
    }

    /// Moves the playhead, keeping the play state.
    ///
    /// The target is clamped to the chart. Always increments the seek
    /// version.
    pub fn seek(&mut self, chart: &Chart, beat: f64, now_ms: f64) {
        let target = beat.clamp(0.0, chart.end_beat());
        self.beat = target;
        self.state = match self.state {
            PlaybackState::Playing { .. } => PlaybackState::Playing {
                start_wall_ms: now_ms,
                start_beat: target,
            },
            PlaybackState::Paused { .. } => PlaybackState::Paused { beat: target },
            PlaybackState::Stopped if target > 0.0 => PlaybackState::Paused { beat: target },
            PlaybackState::Stopped => PlaybackState::Stopped,
        };
        self.seek_version += 1;
        tracing::debug!("Seek to beat {:.3} (version {})", target, self.seek_version);
    }

    /// Seeks to the first beat of a measure.
    pub fn set_measure(&mut self, chart: &Chart, measure: u32, now_ms: f64) {
        self.seek(chart, measure as f64 * BEATS_PER_MEASURE, now_ms);
    }

    /// Steps one subdivision forward (`direction > 0`) or back.
    ///
    /// The step is the active divisor's, capped for navigation, and the
    /// target snaps to that divisor's grid.
    pub fn step_position(&mut self, chart: &Chart, direction: i32, now_ms: f64) {
        let beat = self.current_beat(chart, now_ms);
        let divisors = chart.divisor_events();
        let origin = tempo::divisor_event_at(beat, divisors)
            .map(|e| e.beat)
            .unwrap_or(0.0);
        let step = BEATS_PER_MEASURE / tempo::step_divisor_at(beat, divisors) as f64;
        let target = origin + snap(((beat - origin) / step), direction) * step;
        self.seek(chart, target, now_ms);
    }

    /// Steps one measure forward or back, snapping to measure starts.
    pub fn step_measure(&mut self, chart: &Chart, direction: i32, now_ms: f64) {
        let beat = self.current_beat(chart, now_ms);
        let target = snap(beat / BEATS_PER_MEASURE, direction) * BEATS_PER_MEASURE;
        self.seek(chart, target, now_ms);
    }

    /// Changes playback speed without moving the playhead.
    ///
    /// The reference (wall clock, beat) pair is re-taken at `now_ms` so the
    /// position stays continuous.
    pub fn set_speed(&mut self, chart: &Chart, speed: f64, now_ms: f64) {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        if self.is_playing() {
            self.beat = self.current_beat(chart, now_ms);
            self.state = PlaybackState::Playing {
                start_wall_ms: now_ms,
                start_beat: self.beat,
            };
        }
        self.speed = speed;
    }

    /// Position at `now_ms` without changing state.
    pub fn current_beat(&self, chart: &Chart, now_ms: f64) -> f64 {
        match self.state {
            PlaybackState::Playing {
                start_wall_ms,
                start_beat,
            } => {
                let tempo = chart.bpm_events();
                let fallback = chart.base_bpm();
                let start_ms = tempo::beats_to_ms(start_beat, tempo, fallback);
                let elapsed = (now_ms - start_wall_ms).max(0.0) * self.speed;
                tempo::ms_to_beats(start_ms + elapsed, tempo, fallback)
            }
            PlaybackState::Paused { beat } => beat,
            PlaybackState::Stopped => self.beat,
        }
    }

    /// Advances the clock and returns this frame's snapshot.
    ///
    /// Playback pauses at the chart's end.
    pub fn tick(&mut self, chart: &Chart, now_ms: f64) -> Playhead {
        self.beat = self.current_beat(chart, now_ms);
        if self.is_playing() && self.beat >= chart.end_beat() {
            self.beat = chart.end_beat();
            self.state = PlaybackState::Paused { beat: self.beat };
            tracing::info!("Reached end of chart");
        }
        self.playhead(chart)
    }

    /// Snapshot of the last computed position.
    pub fn playhead(&self, chart: &Chart) -> Playhead {
        let measure = (self.beat / BEATS_PER_MEASURE + 1e-9).floor().max(0.0);
        let step = BEATS_PER_MEASURE / tempo::step_divisor_at(self.beat, chart.divisor_events()) as f64;
        let within = (self.beat - measure * BEATS_PER_MEASURE).max(0.0);
        Playhead {
            beat: self.beat,
            ms: tempo::beats_to_ms(self.beat, chart.bpm_events(), chart.base_bpm()),
            measure: measure as u32,
            sub_measure: (within / step + 1e-6).floor() as u32,
            seek_version: self.seek_version,
            speed: self.speed,
            playing: self.is_playing(),
        }
    }
}

/// Next grid index from fractional index `index` in `direction`.
fn snap(index: f64, direction: i32) -> f64 {
    const EPS: f64 = 1e-6;
    if direction >= 0 {
        (index + EPS).floor() + 1.0
    } else {
        (index - EPS).ceil() - 1.0
    }
}
