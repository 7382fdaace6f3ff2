//! Playback timeline: tempo math and the transport state machine.

pub mod tempo;
mod transport;

pub use transport::{PlayOutcome, PlaybackState, Playhead, Transport, MAX_SPEED, MIN_SPEED};
