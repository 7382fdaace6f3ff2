//! simaitui - A terminal simulator for simai-style rhythm game charts.
//!
//! This library provides the chart parser, the playback timeline, the radial
//! renderer and the audio drivers behind the `simaitui` viewer.

pub mod app;
pub mod audio;
pub mod chart;
pub mod config;
pub mod fps;
pub mod geometry;
pub mod render;
pub mod timeline;
pub mod ui;

// Re-export commonly used types
pub use app::{App, ControlRequest};
pub use chart::{parse, Chart, Note, NoteKind, ParseError};
pub use config::{Config, ConfigEvent};
pub use timeline::{Playhead, Transport};
