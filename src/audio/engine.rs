//! Audio output through rodio.
//!
//! Ticks are short sine bursts mixed straight into the output stream. Music
//! plays through its own [`Sink`]; the decoded source is wrapped in a
//! sample counter so the music driver can read how far into the asset the
//! output has actually pulled.

use super::{MusicOutput, TickOutput, TickSound};
use anyhow::{Context, Result};
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sample, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Length of one tick burst.
const TICK_LENGTH: Duration = Duration::from_millis(45);

/// Sample counter shared between the music source and the engine.
#[derive(Debug, Default)]
struct SourceClock {
    samples: AtomicU64,
    /// Samples per second of source audio (all channels).
    per_second: AtomicU64,
}

impl SourceClock {
    fn reset(&self, per_second: u64) {
        self.samples.store(0, Ordering::Relaxed);
        self.per_second.store(per_second.max(1), Ordering::Relaxed);
    }

    fn seconds(&self) -> f64 {
        let per_second = self.per_second.load(Ordering::Relaxed).max(1);
        self.samples.load(Ordering::Relaxed) as f64 / per_second as f64
    }
}

/// Source wrapper that counts every sample handed to the output.
struct CountingSource<S> {
    inner: S,
    clock: Arc<SourceClock>,
}

impl<S> CountingSource<S>
where
    S: Source,
    S::Item: Sample,
{
    fn new(inner: S, clock: Arc<SourceClock>) -> Self {
        clock.reset(inner.channels() as u64 * inner.sample_rate() as u64);
        Self { inner, clock }
    }
}

impl<S> Iterator for CountingSource<S>
where
    S: Source,
    S::Item: Sample,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        let sample = self.inner.next();
        if sample.is_some() {
            self.clock.samples.fetch_add(1, Ordering::Relaxed);
        }
        sample
    }
}

impl<S> Source for CountingSource<S>
where
    S: Source,
    S::Item: Sample,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Pitch of each tick sample.
fn tick_frequency(sound: TickSound) -> f32 {
    match sound {
        TickSound::Answer => 1320.0,
        TickSound::Break => 1760.0,
        TickSound::Touch => 990.0,
    }
}

/// Audio output on the default device.
pub struct AudioEngine {
    /// Output stream (must be kept alive).
    _stream: OutputStream,
    handle: OutputStreamHandle,
    tick_volume: f32,
    music: Option<Arc<[u8]>>,
    music_sink: Option<Sink>,
    music_volume: f32,
    /// Asset position where the current stream started.
    music_start_s: f64,
    clock: Arc<SourceClock>,
}

impl AudioEngine {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns error if no audio output can be opened.
    pub fn new(tick_volume: f32, music_volume: f32) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("Failed to open audio output")?;
        tracing::info!("Audio output opened");
        Ok(Self {
            _stream: stream,
            handle,
            tick_volume: tick_volume.clamp(0.0, 1.0),
            music: None,
            music_sink: None,
            music_volume: music_volume.clamp(0.0, 1.0),
            music_start_s: 0.0,
            clock: Arc::new(SourceClock::default()),
        })
    }
}

impl TickOutput for AudioEngine {
    fn play_tick(&mut self, sound: TickSound) {
        if self.tick_volume <= 0.0 {
            return;
        }
        let source = SineWave::new(tick_frequency(sound))
            .take_duration(TICK_LENGTH)
            .amplify(self.tick_volume * 0.4);
        if let Err(e) = self.handle.play_raw(source) {
            tracing::warn!("Failed to play tick: {}", e);
        }
    }

    fn set_tick_volume(&mut self, volume: f32) {
        self.tick_volume = volume.clamp(0.0, 1.0);
    }
}

impl MusicOutput for AudioEngine {
    fn set_music(&mut self, data: Option<Arc<[u8]>>) {
        self.stop_music();
        self.music = data;
    }

    fn has_music(&self) -> bool {
        self.music.is_some()
    }

    fn start_music(&mut self, offset_s: f64, rate: f64) -> Result<()> {
        self.stop_music();
        let Some(data) = self.music.clone() else {
            return Ok(());
        };
        let decoder = Decoder::new(Cursor::new(data)).context("Failed to decode music")?;
        let offset_s = offset_s.max(0.0);
        let source = CountingSource::new(
            decoder.skip_duration(Duration::from_secs_f64(offset_s)),
            Arc::clone(&self.clock),
        );
        let sink = Sink::try_new(&self.handle).context("Failed to create music sink")?;
        sink.set_volume(self.music_volume);
        sink.set_speed(rate as f32);
        sink.append(source);
        sink.play();
        self.music_start_s = offset_s;
        self.music_sink = Some(sink);
        Ok(())
    }

    fn stop_music(&mut self) {
        if let Some(sink) = self.music_sink.take() {
            sink.stop();
        }
    }

    fn pause_music(&mut self) {
        if let Some(sink) = &self.music_sink {
            sink.pause();
        }
    }

    fn resume_music(&mut self) {
        if let Some(sink) = &self.music_sink {
            sink.play();
        }
    }

    fn set_music_rate(&mut self, rate: f64) {
        if let Some(sink) = &self.music_sink {
            sink.set_speed(rate as f32);
        }
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.music_sink {
            sink.set_volume(self.music_volume);
        }
    }

    fn music_position(&self) -> Option<f64> {
        self.music_sink
            .as_ref()
            .filter(|sink| !sink.empty())
            .map(|_| self.music_start_s + self.clock.seconds())
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop_music();
    }
}

/// Output that discards everything, used when audio is disabled or no
/// device exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl TickOutput for NullAudio {
    fn play_tick(&mut self, _sound: TickSound) {}

    fn set_tick_volume(&mut self, _volume: f32) {}
}

impl MusicOutput for NullAudio {
    fn set_music(&mut self, _data: Option<Arc<[u8]>>) {}

    fn has_music(&self) -> bool {
        false
    }

    fn start_music(&mut self, _offset_s: f64, _rate: f64) -> Result<()> {
        Ok(())
    }

    fn stop_music(&mut self) {}

    fn pause_music(&mut self) {}

    fn resume_music(&mut self) {}

    fn set_music_rate(&mut self, _rate: f64) {}

    fn set_music_volume(&mut self, _volume: f32) {}

    fn music_position(&self) -> Option<f64> {
        None
    }
}
