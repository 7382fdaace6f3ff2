//! Frame-rate counter.

use std::time::{Duration, Instant};

const INTERVAL: Duration = Duration::from_secs(1);

/// Counts frames and reports a rate about once per second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    last: Option<u32>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            last: None,
        }
    }

    /// Records one frame at `now`.
    ///
    /// # Returns
    ///
    /// The new rate when a one-second window closes.
    pub fn frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < INTERVAL {
            return None;
        }
        let fps = (self.frames as f64 / elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.window_start += INTERVAL;
        // Fell far behind (e.g. the terminal was suspended).
        if now.saturating_duration_since(self.window_start) >= INTERVAL {
            self.window_start = now;
        }
        self.last = Some(fps);
        self.last
    }

    /// Most recent rate, if a window has closed yet.
    pub fn fps(&self) -> Option<u32> {
        self.last
    }
}
