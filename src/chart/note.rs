//! Note representation for parsed charts.
//!
//! A note is an immutable, timed gesture at either one of the eight ring
//! buttons or one of the touch-sensor zones. Variant-specific data (hold
//! spans, slide chains) lives in [`NoteKind`]; per-frame render annotations
//! are kept elsewhere and never written back onto a note.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;

/// Identifier of a note within one chart.
///
/// IDs are assigned in sorted order after parsing, so the same input text
/// always produces the same IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(u32);

impl NoteId {
    /// Creates an ID from a position in the chart's sorted note list.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Returns the position of this note in the chart's sorted note list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One of the eight buttons around the ring, numbered 1-8 clockwise from
/// the top-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Button(u8);

impl Button {
    /// Creates a button from its 1-based number.
    ///
    /// # Returns
    ///
    /// `None` when `number` is outside 1-8.
    pub fn new(number: u8) -> Option<Self> {
        (1..=8).contains(&number).then_some(Self(number))
    }

    /// Parses a button from a notation digit.
    pub fn from_digit(ch: char) -> Option<Self> {
        ch.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    /// Returns the 1-based button number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Returns the 0-based button index.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Returns the button `steps` positions clockwise (negative is
    /// counter-clockwise).
    pub fn offset(self, steps: i32) -> Self {
        let index = (self.index() as i32 + steps).rem_euclid(8);
        Self(index as u8 + 1)
    }

    /// Number of clockwise steps from this button to `other` (0-7).
    pub fn clockwise_distance(self, other: Button) -> u8 {
        ((other.index() as i32 - self.index() as i32).rem_euclid(8)) as u8
    }

    /// Whether this button sits on the upper half of the ring (1, 2, 7, 8).
    pub fn is_upper_half(self) -> bool {
        matches!(self.0, 1 | 2 | 7 | 8)
    }

    /// Whether this button sits on the right half of the ring (1-4).
    pub fn is_right_half(self) -> bool {
        self.0 <= 4
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ring of touch-sensor zones, from the outer A ring to the centre C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TouchArea {
    A,
    B,
    C,
    D,
    E,
}

impl TouchArea {
    /// Parses an area letter.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            _ => None,
        }
    }

    /// Returns the area letter.
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
        }
    }
}

/// A single touch-sensor zone.
///
/// The centre zone `C` has no meaningful index and is always stored with
/// index 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TouchZone {
    pub area: TouchArea,
    pub index: u8,
}

impl TouchZone {
    /// Creates a zone, validating the index for the area.
    pub fn new(area: TouchArea, index: u8) -> Option<Self> {
        match area {
            TouchArea::C => Some(Self { area, index: 1 }),
            _ if (1..=8).contains(&index) => Some(Self { area, index }),
            _ => None,
        }
    }

    /// The centre zone.
    pub fn center() -> Self {
        Self {
            area: TouchArea::C,
            index: 1,
        }
    }
}

impl fmt::Display for TouchZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.area {
            TouchArea::C => write!(f, "C"),
            area => write!(f, "{}{}", area.letter(), self.index),
        }
    }
}

/// Where a note is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Button(Button),
    Touch(TouchZone),
}

/// A length of chart time, stored in both units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub beats: f64,
    pub ms: f64,
}

/// Per-note modifier flags written in the notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteFlags {
    /// Break note (`b`), drawn with the break gradient.
    pub break_note: bool,
    /// EX note (`x`), drawn with a protective cover.
    pub ex: bool,
    /// Firework effect on touch notes (`f`).
    pub firework: bool,
    /// Star-shaped head (`$`, and every slide head).
    pub star: bool,
    /// Slide without its star head (`?`/`!`, or an extra `*` slide).
    pub no_head: bool,
}

/// Timing information stamped on every note by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteTiming {
    /// Absolute beat, lead-in included.
    pub beat: f64,
    /// Absolute milliseconds, lead-in included.
    pub ms: f64,
    /// Measure index (`floor(beat / 4)`).
    pub measure: u32,
    /// Step within the measure at the active divisor.
    pub sub_measure: u32,
    /// BPM active where the note was written.
    pub bpm: f64,
}

/// The twelve slide path primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlidePath {
    /// `-`
    Straight,
    /// `<`
    ArcLeft,
    /// `>`
    ArcRight,
    /// `^`
    ShortArc,
    /// `v`
    ThroughCenter,
    /// `s`
    BendS,
    /// `z`
    BendZ,
    /// `p`
    SpiralP,
    /// `q`
    SpiralQ,
    /// `pp`
    DoubleSpiralP,
    /// `qq`
    DoubleSpiralQ,
    /// `w`
    Wifi,
}

impl SlidePath {
    /// Returns the notation symbol for this primitive.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Straight => "-",
            Self::ArcLeft => "<",
            Self::ArcRight => ">",
            Self::ShortArc => "^",
            Self::ThroughCenter => "v",
            Self::BendS => "s",
            Self::BendZ => "z",
            Self::SpiralP => "p",
            Self::SpiralQ => "q",
            Self::DoubleSpiralP => "pp",
            Self::DoubleSpiralQ => "qq",
            Self::Wifi => "w",
        }
    }

    /// Whether `ch` starts a path symbol.
    pub fn is_symbol_start(ch: char) -> bool {
        matches!(ch, '-' | '<' | '>' | '^' | 'v' | 's' | 'z' | 'p' | 'q' | 'w')
    }
}

impl fmt::Display for SlidePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One link of a slide chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideSegment {
    pub path: SlidePath,
    pub start: Button,
    pub end: Button,
    /// Travel time of this segment.
    pub duration: Span,
    /// Length of the path on a unit ring, filled on first use.
    #[serde(skip)]
    arc_length: OnceCell<f64>,
}

impl SlideSegment {
    /// Creates a segment with an empty arc-length cache.
    pub fn new(path: SlidePath, start: Button, end: Button, duration: Span) -> Self {
        Self {
            path,
            start,
            end,
            duration,
            arc_length: OnceCell::new(),
        }
    }

    /// Returns the unit-ring arc length of this segment, sampling the path
    /// the first time it is asked for.
    pub fn arc_length(&self) -> f64 {
        *self.arc_length.get_or_init(|| {
            crate::geometry::path::PathGeometry::resolve(self.path, self.start, self.end)
                .arc_length()
        })
    }
}

// The arc-length cache is derived data and takes no part in equality.
impl PartialEq for SlideSegment {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.start == other.start
            && self.end == other.end
            && self.duration == other.duration
    }
}

/// A slide: a head star plus a chain of connected segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideNote {
    pub segments: Vec<SlideSegment>,
    /// Wait between the head's arrival and the star starting to move.
    pub delay: Span,
    /// Whether the body (not the head) is a break slide.
    pub break_body: bool,
}

impl SlideNote {
    /// Total travel time of all segments.
    pub fn duration(&self) -> Span {
        self.segments.iter().fold(Span::default(), |acc, s| Span {
            beats: acc.beats + s.duration.beats,
            ms: acc.ms + s.duration.ms,
        })
    }

    /// Button the chain finishes on.
    pub fn end_button(&self) -> Option<Button> {
        self.segments.last().map(|s| s.end)
    }

    /// Whether consecutive segments connect end to start.
    pub fn is_continuous(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].end == w[1].start)
    }
}

/// Variant-specific note data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoteKind {
    Tap,
    Break,
    /// A tap written as part of a multi-digit token such as `18`.
    SimultaneousTap,
    HoldStart {
        duration: Span,
    },
    HoldEnd {
        start_beat: f64,
    },
    Slide(SlideNote),
    Touch,
    TouchHoldStart {
        duration: Span,
    },
    TouchHoldEnd {
        start_beat: f64,
    },
}

/// Fieldless mirror of [`NoteKind`], used as a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKindTag {
    Tap,
    Break,
    SimultaneousTap,
    HoldStart,
    HoldEnd,
    Slide,
    Touch,
    TouchHoldStart,
    TouchHoldEnd,
}

/// A single parsed note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub position: Position,
    pub timing: NoteTiming,
    pub flags: NoteFlags,
    pub kind: NoteKind,
}

impl Note {
    /// Returns the fieldless kind tag.
    pub fn tag(&self) -> NoteKindTag {
        match self.kind {
            NoteKind::Tap => NoteKindTag::Tap,
            NoteKind::Break => NoteKindTag::Break,
            NoteKind::SimultaneousTap => NoteKindTag::SimultaneousTap,
            NoteKind::HoldStart { .. } => NoteKindTag::HoldStart,
            NoteKind::HoldEnd { .. } => NoteKindTag::HoldEnd,
            NoteKind::Slide(_) => NoteKindTag::Slide,
            NoteKind::Touch => NoteKindTag::Touch,
            NoteKind::TouchHoldStart { .. } => NoteKindTag::TouchHoldStart,
            NoteKind::TouchHoldEnd { .. } => NoteKindTag::TouchHoldEnd,
        }
    }

    /// Whether this is a closing marker rather than a playable head.
    pub fn is_end_marker(&self) -> bool {
        matches!(
            self.kind,
            NoteKind::HoldEnd { .. } | NoteKind::TouchHoldEnd { .. }
        )
    }

    /// Whether this note counts as a break for tallies and colouring.
    pub fn is_break(&self) -> bool {
        matches!(self.kind, NoteKind::Break) || self.flags.break_note
    }

    /// Ring button of this note, if it is not a touch.
    pub fn button(&self) -> Option<Button> {
        match self.position {
            Position::Button(b) => Some(b),
            Position::Touch(_) => None,
        }
    }

    /// Returns the slide data when this note is a slide.
    pub fn slide(&self) -> Option<&SlideNote> {
        match &self.kind {
            NoteKind::Slide(slide) => Some(slide),
            _ => None,
        }
    }

    /// Time the note stops being active, in milliseconds.
    ///
    /// Holds end after their duration; slides end once the star has
    /// finished travelling.
    pub fn end_ms(&self) -> f64 {
        match &self.kind {
            NoteKind::HoldStart { duration } | NoteKind::TouchHoldStart { duration } => {
                self.timing.ms + duration.ms
            }
            NoteKind::Slide(slide) => self.timing.ms + slide.delay.ms + slide.duration().ms,
            _ => self.timing.ms,
        }
    }

    /// Beat the note stops being active.
    pub fn end_beat(&self) -> f64 {
        match &self.kind {
            NoteKind::HoldStart { duration } | NoteKind::TouchHoldStart { duration } => {
                self.timing.beat + duration.beats
            }
            NoteKind::Slide(slide) => {
                self.timing.beat + slide.delay.beats + slide.duration().beats
            }
            _ => self.timing.beat,
        }
    }
}
