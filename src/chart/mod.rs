//! Chart data structures and the notation parser.
//!
//! This module contains:
//! - [`note`]: notes, positions and slide segments
//! - [`model`]: the [`Chart`] aggregate and tempo/divisor events
//! - [`parser`]: text to [`Chart`] conversion
//! - [`error`]: [`ParseError`]

mod error;
mod model;
pub mod note;
mod parser;
mod token;

pub use error::ParseError;
pub use model::{difficulty_name, BpmEvent, Chart, DivisorEvent, Metadata, DIFFICULTY_COUNT};
pub use note::{
    Button, Note, NoteFlags, NoteId, NoteKind, NoteKindTag, NoteTiming, Position, SlideNote,
    SlidePath, SlideSegment, Span, TouchArea, TouchZone,
};
pub use parser::parse;

/// Beats inserted before the first authored note.
pub const LEAD_IN_BEATS: f64 = 4.0;

/// Beats in one measure.
pub const BEATS_PER_MEASURE: f64 = 4.0;

/// Tempo assumed when the text sets none.
pub const DEFAULT_BPM: f64 = 120.0;

/// Comma subdivision assumed when the text sets none.
pub const DEFAULT_DIVISOR: u32 = 4;
