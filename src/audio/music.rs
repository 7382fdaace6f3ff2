//! Background music phase lock.
//!
//! The chart clock is the master. Every [`DRIFT_CHECK_MS`] the driver
//! compares how far the music stream has advanced since its reference point
//! with how far the chart has advanced, and restarts the stream at the
//! corrected offset when they disagree by more than [`DRIFT_LIMIT_S`].

use super::MusicOutput;
use crate::chart::{Chart, LEAD_IN_BEATS};
use crate::config::Config;
use crate::timeline::{tempo, Playhead};

/// Interval between drift checks.
pub const DRIFT_CHECK_MS: f64 = 200.0;

/// Largest tolerated drift before a restart.
pub const DRIFT_LIMIT_S: f64 = 0.3;

/// Position in the music asset that corresponds to `beat`.
///
/// Beat `LEAD_IN_BEATS` lines up with `&first` seconds into the asset,
/// shifted by the user's music offset.
pub fn target_offset_s(chart: &Chart, beat: f64, config: &Config) -> f64 {
    let ms = tempo::beats_to_ms(beat, chart.bpm_events(), chart.base_bpm());
    let lead_in_ms = tempo::beats_to_ms(LEAD_IN_BEATS, chart.bpm_events(), chart.base_bpm());
    (ms - lead_in_ms) / 1000.0 - config.music_offset_ms / 1000.0 + chart.metadata().first_offset_s
}

/// Keeps the music stream aligned with the playhead.
#[derive(Debug)]
pub struct MusicSync {
    last_version: Option<u64>,
    /// Wall clock of the last drift check or restart.
    last_check_ms: f64,
    /// Stream position and target offset when the stream was last started,
    /// resumed or re-rated.
    reference: Option<(f64, f64)>,
    running: bool,
    paused: bool,
    rate: f64,
    restarts: u32,
    /// Set when the stream could not be started; cleared by [`reset`].
    ///
    /// [`reset`]: MusicSync::reset
    failed: bool,
}

impl Default for MusicSync {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicSync {
    pub fn new() -> Self {
        Self {
            last_version: None,
            last_check_ms: f64::NEG_INFINITY,
            reference: None,
            running: false,
            paused: false,
            rate: 1.0,
            restarts: 0,
            failed: false,
        }
    }

    /// Forgets the stream state, for a new asset or chart.
    pub fn reset(&mut self) {
        *self = Self {
            restarts: self.restarts,
            ..Self::new()
        };
    }

    /// Number of stream (re)starts so far.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Drives the stream for this frame.
    ///
    /// # Arguments
    ///
    /// * `out` - Music output
    /// * `chart` - Chart supplying the tempo map and `&first`
    /// * `playhead` - This frame's snapshot
    /// * `config` - Music offset
    /// * `now_ms` - Wall clock
    pub fn update<O: MusicOutput + ?Sized>(
        &mut self,
        out: &mut O,
        chart: &Chart,
        playhead: &Playhead,
        config: &Config,
        now_ms: f64,
    ) {
        if !out.has_music() || self.failed {
            return;
        }
        let target = target_offset_s(chart, playhead.beat, config);
        let seeked = self.last_version != Some(playhead.seek_version);
        self.last_version = Some(playhead.seek_version);

        if !playhead.playing {
            if seeked {
                self.halt(out);
            } else if self.running && !self.paused {
                out.pause_music();
                self.paused = true;
            }
            return;
        }

        if (playhead.speed - self.rate).abs() > 1e-9 {
            self.rate = playhead.speed;
            if self.running {
                out.set_music_rate(self.rate);
                self.rebase(out, target, now_ms);
            }
        }

        // Still in the part of the chart before the music starts.
        if target < 0.0 {
            self.halt(out);
            return;
        }

        if !self.running || seeked {
            self.restart(out, target, now_ms);
            return;
        }

        if self.paused {
            out.resume_music();
            self.paused = false;
            self.rebase(out, target, now_ms);
            return;
        }

        if now_ms - self.last_check_ms < DRIFT_CHECK_MS {
            return;
        }
        self.last_check_ms = now_ms;
        let Some(position) = out.music_position() else {
            return;
        };
        let drift = match self.reference {
            Some((ref_position, ref_target)) => (position - ref_position) - (target - ref_target),
            None => position - target,
        };
        if drift.abs() > DRIFT_LIMIT_S {
            tracing::debug!(drift, target, "Music drifted, restarting");
            self.restart(out, target, now_ms);
        }
    }

    fn halt<O: MusicOutput + ?Sized>(&mut self, out: &mut O) {
        if self.running {
            out.stop_music();
        }
        self.running = false;
        self.paused = false;
        self.reference = None;
    }

    fn restart<O: MusicOutput + ?Sized>(&mut self, out: &mut O, target: f64, now_ms: f64) {
        self.last_check_ms = now_ms;
        match out.start_music(target, self.rate) {
            Ok(()) => {
                self.running = true;
                self.paused = false;
                self.restarts += 1;
                self.reference = Some((out.music_position().unwrap_or(target), target));
                tracing::debug!(target, rate = self.rate, "Music started");
            }
            Err(e) => {
                tracing::warn!("Music playback failed: {:#}", e);
                self.running = false;
                self.failed = true;
            }
        }
    }

    /// Takes a new reference pair so a rate change or resume does not read
    /// as drift.
    fn rebase<O: MusicOutput + ?Sized>(&mut self, out: &O, target: f64, now_ms: f64) {
        self.reference = out.music_position().map(|position| (position, target));
        self.last_check_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(f64, f64),
        Stop,
        Pause,
        Resume,
        Rate(f64),
    }

    #[derive(Default)]
    struct FakeMusic {
        calls: Vec<Call>,
        position: Option<f64>,
        broken: bool,
    }

    impl FakeMusic {
        fn starts(&self) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Start(..))).count()
        }
    }

    impl MusicOutput for FakeMusic {
        fn set_music(&mut self, _data: Option<Arc<[u8]>>) {}

        fn has_music(&self) -> bool {
            true
        }

        fn start_music(&mut self, offset_s: f64, rate: f64) -> anyhow::Result<()> {
            if self.broken {
                anyhow::bail!("bad asset");
            }
            self.calls.push(Call::Start(offset_s, rate));
            self.position = Some(offset_s);
            Ok(())
        }

        fn stop_music(&mut self) {
            self.calls.push(Call::Stop);
            self.position = None;
        }

        fn pause_music(&mut self) {
            self.calls.push(Call::Pause);
        }

        fn resume_music(&mut self) {
            self.calls.push(Call::Resume);
        }

        fn set_music_rate(&mut self, rate: f64) {
            self.calls.push(Call::Rate(rate));
        }

        fn set_music_volume(&mut self, _volume: f32) {}

        fn music_position(&self) -> Option<f64> {
            self.position
        }
    }

    /// 120 BPM: one beat is 0.5 s.
    fn chart() -> Chart {
        parse("(120){1}1,,,,,,,,", None).unwrap()
    }

    fn playing(beat: f64, version: u64) -> Playhead {
        Playhead {
            beat,
            ms: beat * 500.0,
            measure: 0,
            sub_measure: 0,
            seek_version: version,
            speed: 1.0,
            playing: true,
        }
    }

    #[test]
    fn test_target_offset() {
        let chart = parse("&first=1.5\n(120)1,", None).unwrap();
        let config = Config {
            music_offset_ms: 200.0,
            ..Default::default()
        };
        assert!((target_offset_s(&chart, LEAD_IN_BEATS, &config) - 1.3).abs() < 1e-9);
        assert!((target_offset_s(&chart, LEAD_IN_BEATS + 2.0, &config) - 2.3).abs() < 1e-9);
        assert!(target_offset_s(&chart, 0.0, &Config::default()) < 0.0);
    }

    #[test]
    fn test_waits_through_lead_in_then_starts() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(1.0, 0), &config, 0.0);
        assert_eq!(out.starts(), 0);
        sync.update(&mut out, &chart, &playing(4.1, 0), &config, 1550.0);
        assert_eq!(out.starts(), 1);
        assert!(matches!(out.calls[0], Call::Start(offset, _) if (offset - 0.05).abs() < 1e-9));
        assert!(sync.is_running());
    }

    #[test]
    fn test_drift_correction_threshold_and_rate_limit() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);
        assert_eq!(out.starts(), 1);

        // 0.25 s behind: within tolerance
        out.position = Some(1.0 + 1.0 - 0.25);
        sync.update(&mut out, &chart, &playing(8.0, 0), &config, 1000.0);
        assert_eq!(out.starts(), 1);

        // 0.35 s behind: restart at the chart's offset
        out.position = Some(1.5 - 0.35);
        sync.update(&mut out, &chart, &playing(7.0, 0), &config, 1300.0);
        assert_eq!(out.starts(), 2);
        assert_eq!(out.calls.last(), Some(&Call::Start(1.5, 1.0)));

        // still drifting, but inside the same 200 ms window
        out.position = Some(0.0);
        sync.update(&mut out, &chart, &playing(7.2, 0), &config, 1400.0);
        assert_eq!(out.starts(), 2);
        sync.update(&mut out, &chart, &playing(7.4, 0), &config, 1501.0);
        assert_eq!(out.starts(), 3);
        assert_eq!(sync.restarts(), 3);
    }

    #[test]
    fn test_seek_forces_restart() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);
        sync.update(&mut out, &chart, &playing(10.0, 1), &config, 16.0);
        assert_eq!(out.calls.last(), Some(&Call::Start(3.0, 1.0)));
    }

    #[test]
    fn test_pause_and_resume_rebase() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);

        let mut paused = playing(6.0, 0);
        paused.playing = false;
        sync.update(&mut out, &chart, &paused, &config, 100.0);
        assert_eq!(out.calls.last(), Some(&Call::Pause));

        // device clock offset by latency; the new reference absorbs it
        out.position = Some(0.8);
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 5000.0);
        assert_eq!(out.calls.last(), Some(&Call::Resume));
        out.position = Some(1.3);
        sync.update(&mut out, &chart, &playing(7.0, 0), &config, 5500.0);
        assert_eq!(out.starts(), 1);
    }

    #[test]
    fn test_seek_while_paused_stops_stream() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);
        let mut paused = playing(9.0, 1);
        paused.playing = false;
        sync.update(&mut out, &chart, &paused, &config, 50.0);
        assert_eq!(out.calls.last(), Some(&Call::Stop));
        assert!(!sync.is_running());
        let mut resumed = paused;
        resumed.playing = true;
        sync.update(&mut out, &chart, &resumed, &config, 60.0);
        assert_eq!(out.calls.last(), Some(&Call::Start(2.5, 1.0)));
    }

    #[test]
    fn test_speed_change_sets_rate_without_restart() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic::default();
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);
        let mut slow = playing(6.0, 0);
        slow.speed = 0.5;
        sync.update(&mut out, &chart, &slow, &config, 300.0);
        assert_eq!(out.calls.last(), Some(&Call::Rate(0.5)));
        assert_eq!(out.starts(), 1);
    }

    #[test]
    fn test_failed_start_is_not_retried() {
        let chart = chart();
        let config = Config::default();
        let mut sync = MusicSync::new();
        let mut out = FakeMusic {
            broken: true,
            ..Default::default()
        };
        sync.update(&mut out, &chart, &playing(6.0, 0), &config, 0.0);
        sync.update(&mut out, &chart, &playing(6.1, 0), &config, 500.0);
        assert!(!sync.is_running());
        assert_eq!(sync.restarts(), 0);
        sync.reset();
        out.broken = false;
        sync.update(&mut out, &chart, &playing(6.2, 0), &config, 600.0);
        assert!(sync.is_running());
    }
}
