//! Chart aggregate produced by the parser.
//!
//! A [`Chart`] is immutable once built. A session that needs a different
//! difficulty or edited text parses a fresh chart and drops the old one.

use super::note::{Note, NoteId};
use std::collections::BTreeMap;

/// Number of difficulty slots a chart file may define.
pub const DIFFICULTY_COUNT: u8 = 6;

/// Returns the display name of a difficulty slot (1-6).
pub fn difficulty_name(difficulty: u8) -> &'static str {
    match difficulty {
        1 => "Easy",
        2 => "Basic",
        3 => "Advanced",
        4 => "Expert",
        5 => "Master",
        6 => "Re:Master",
        _ => "Unknown",
    }
}

/// A tempo change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmEvent {
    pub beat: f64,
    pub bpm: f64,
}

/// A change of the comma subdivision, used for step navigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivisorEvent {
    pub beat: f64,
    pub divisor: u32,
}

/// Descriptive information read from `&key=value` directives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    /// Designer for all difficulties (`&des`).
    pub designer: String,
    /// Per-difficulty designers (`&des_N`).
    pub designers: BTreeMap<u8, String>,
    /// Per-difficulty level labels (`&lv_N`).
    pub levels: BTreeMap<u8, String>,
    /// Seconds of audio before the chart's first beat (`&first`).
    pub first_offset_s: f64,
}

impl Metadata {
    /// Designer credited for a difficulty, falling back to `&des`.
    pub fn designer_for(&self, difficulty: Option<u8>) -> &str {
        difficulty
            .and_then(|d| self.designers.get(&d))
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or(&self.designer)
    }
}

/// A parsed chart for one difficulty.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    metadata: Metadata,
    difficulty: Option<u8>,
    available: Vec<u8>,
    base_bpm: f64,
    notes: Vec<Note>,
    bpm_events: Vec<BpmEvent>,
    divisor_events: Vec<DivisorEvent>,
    total_measures: u32,
}

impl Chart {
    /// Assembles a chart from parser output.
    ///
    /// Callers are expected to pass notes, tempo events and divisor events
    /// already sorted by beat.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        metadata: Metadata,
        difficulty: Option<u8>,
        available: Vec<u8>,
        base_bpm: f64,
        notes: Vec<Note>,
        bpm_events: Vec<BpmEvent>,
        divisor_events: Vec<DivisorEvent>,
        total_measures: u32,
    ) -> Self {
        Self {
            metadata,
            difficulty,
            available,
            base_bpm,
            notes,
            bpm_events,
            divisor_events,
            total_measures,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The difficulty slot this chart was parsed from, `None` for a legacy
    /// single-body file.
    pub fn difficulty(&self) -> Option<u8> {
        self.difficulty
    }

    /// Difficulty slots present in the source text, ascending.
    pub fn available_difficulties(&self) -> &[u8] {
        &self.available
    }

    /// BPM used when no tempo event applies.
    pub fn base_bpm(&self) -> f64 {
        self.base_bpm
    }

    /// All notes sorted by beat.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Looks up a note by ID.
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id.index())
    }

    /// Tempo map sorted by beat, starting at beat 0.
    pub fn bpm_events(&self) -> &[BpmEvent] {
        &self.bpm_events
    }

    /// Divisor changes sorted by beat, starting at beat 0.
    pub fn divisor_events(&self) -> &[DivisorEvent] {
        &self.divisor_events
    }

    pub fn total_measures(&self) -> u32 {
        self.total_measures
    }

    /// Last beat of the chart (end of the final measure).
    pub fn end_beat(&self) -> f64 {
        self.total_measures as f64 * super::BEATS_PER_MEASURE
    }

    /// Number of playable notes (closing hold markers excluded).
    pub fn playable_count(&self) -> usize {
        self.notes.iter().filter(|n| !n.is_end_marker()).count()
    }

    /// Number of break notes.
    pub fn break_count(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| !n.is_end_marker() && n.is_break())
            .count()
    }

    /// Title line for display: "Title - Artist".
    pub fn display_title(&self) -> String {
        match (self.metadata.title.is_empty(), self.metadata.artist.is_empty()) {
            (true, _) => "(untitled)".to_string(),
            (false, true) => self.metadata.title.clone(),
            (false, false) => format!("{} - {}", self.metadata.title, self.metadata.artist),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_names() {
        assert_eq!(difficulty_name(1), "Easy");
        assert_eq!(difficulty_name(6), "Re:Master");
        assert_eq!(difficulty_name(7), "Unknown");
    }

    #[test]
    fn test_designer_fallback() {
        let mut meta = Metadata {
            designer: "everyone".to_string(),
            ..Default::default()
        };
        meta.designers.insert(5, "master author".to_string());
        assert_eq!(meta.designer_for(Some(5)), "master author");
        assert_eq!(meta.designer_for(Some(4)), "everyone");
        assert_eq!(meta.designer_for(None), "everyone");
    }

    #[test]
    fn test_display_title() {
        let chart = Chart::new(
            Metadata {
                title: "Song".to_string(),
                artist: "Band".to_string(),
                ..Default::default()
            },
            None,
            Vec::new(),
            120.0,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            1,
        );
        assert_eq!(chart.display_title(), "Song - Band");
        assert_eq!(chart.end_beat(), 4.0);
    }
}
