//! Per-frame derived note data.
//!
//! Simultaneous counts, break ordinals and touch overlaps depend on the
//! current time (or only matter for drawing), so they are computed into a
//! side table once per frame and never stored on the chart.

use super::approach::Approach;
use crate::chart::{Chart, Note, NoteId, NoteKind, Position, TouchZone};
use std::collections::HashMap;

/// Completion counts shown by the tally overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub resolved_notes: usize,
    pub total_notes: usize,
    pub resolved_breaks: usize,
    pub total_breaks: usize,
}

/// Side table of per-note annotations for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAnnotations {
    simultaneous: Vec<u8>,
    break_index: Vec<Option<u32>>,
    touch_overlap: HashMap<NoteId, u8>,
    pub tally: Tally,
}

impl FrameAnnotations {
    /// Number of heads sharing this note's exact time (1 when alone).
    pub fn simultaneous(&self, id: NoteId) -> u8 {
        self.simultaneous.get(id.index()).copied().unwrap_or(1)
    }

    pub fn is_simultaneous(&self, id: NoteId) -> bool {
        self.simultaneous(id) >= 2
    }

    /// Ordinal of this note among the chart's breaks.
    pub fn break_index(&self, id: NoteId) -> Option<u32> {
        self.break_index.get(id.index()).copied().flatten()
    }

    /// Number of visible touches in this touch note's zone (0 if the note
    /// is not a visible touch).
    pub fn visible_touches(&self, id: NoteId) -> u8 {
        self.touch_overlap.get(&id).copied().unwrap_or(0)
    }
}

/// Whether a note is a head that takes part in simultaneous colouring.
fn counts_as_head(note: &Note) -> bool {
    match &note.kind {
        NoteKind::Tap
        | NoteKind::Break
        | NoteKind::SimultaneousTap
        | NoteKind::HoldStart { .. }
        | NoteKind::Touch
        | NoteKind::TouchHoldStart { .. } => true,
        NoteKind::Slide(_) => !note.flags.no_head,
        _ => false,
    }
}

fn touch_zone(note: &Note) -> Option<TouchZone> {
    match (&note.kind, note.position) {
        (NoteKind::Touch | NoteKind::TouchHoldStart { .. }, Position::Touch(zone)) => Some(zone),
        _ => None,
    }
}

/// Builds the side table for time `now_ms`.
pub fn annotate(chart: &Chart, now_ms: f64, approach: &Approach) -> FrameAnnotations {
    let notes = chart.notes();
    let mut out = FrameAnnotations {
        simultaneous: vec![1; notes.len()],
        break_index: vec![None; notes.len()],
        touch_overlap: HashMap::new(),
        tally: Tally::default(),
    };

    // Notes are sorted by beat, so equal times are adjacent.
    let mut i = 0;
    while i < notes.len() {
        let ms = notes[i].timing.ms;
        let mut j = i;
        while j < notes.len() && notes[j].timing.ms == ms {
            j += 1;
        }
        let heads = notes[i..j].iter().filter(|n| counts_as_head(n)).count();
        for note in &notes[i..j] {
            if counts_as_head(note) {
                out.simultaneous[note.id.index()] = heads.min(u8::MAX as usize) as u8;
            }
        }
        i = j;
    }

    let mut breaks = 0u32;
    let mut zones: HashMap<TouchZone, Vec<NoteId>> = HashMap::new();
    for note in notes {
        if note.is_end_marker() {
            continue;
        }
        out.tally.total_notes += 1;
        let resolved = note.timing.ms <= now_ms;
        if resolved {
            out.tally.resolved_notes += 1;
        }
        if note.is_break() {
            out.break_index[note.id.index()] = Some(breaks);
            breaks += 1;
            out.tally.total_breaks += 1;
            if resolved {
                out.tally.resolved_breaks += 1;
            }
        }
        if let Some(zone) = touch_zone(note) {
            if approach.is_visible(note.timing.ms, note.end_ms(), now_ms) {
                zones.entry(zone).or_default().push(note.id);
            }
        }
    }

    for ids in zones.values() {
        let count = ids.len().min(u8::MAX as usize) as u8;
        for id in ids {
            out.touch_overlap.insert(*id, count);
        }
    }
    out
}
