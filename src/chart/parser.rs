//! Two-pass chart parser.
//!
//! Pass one scans `&key=value` directives and collects the note body for
//! each difficulty. Pass two walks the selected body left to right with a
//! cursor of (beat, ms, BPM, divisor), cutting it into comma-delimited beat
//! groups. A final step shifts everything by the lead-in, resolves hold and
//! slide durations against the complete tempo map, and sorts the result.

use super::error::ParseError;
use super::model::{BpmEvent, Chart, DivisorEvent, Metadata, DIFFICULTY_COUNT};
use super::note::{
    Note, NoteFlags, NoteId, NoteKind, NoteTiming, Position, SlideNote, SlideSegment, Span,
};
use super::token::{self, RawDuration, RawKind, RawNote, RawSegment};
use super::{BEATS_PER_MEASURE, DEFAULT_BPM, DEFAULT_DIVISOR, LEAD_IN_BEATS};
use crate::timeline::tempo;
use std::collections::BTreeMap;

/// Parses chart text into a [`Chart`].
///
/// Identical input always produces an identical chart.
///
/// # Arguments
///
/// * `text` - Full chart text (directives and note bodies)
/// * `difficulty` - Difficulty slot 1-6 to select, or `None` for the
///   highest slot present (or the legacy single body)
///
/// # Errors
///
/// Returns [`ParseError`] when the text is empty, the requested difficulty is
/// out of range or absent, or the selected body contains a character outside
/// the notation alphabet.
pub fn parse(text: &str, difficulty: Option<u8>) -> Result<Chart, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(d) = difficulty {
        if !(1..=DIFFICULTY_COUNT).contains(&d) {
            return Err(ParseError::InvalidDifficulty(d));
        }
    }

    let source = scan_directives(text);
    let available: Vec<u8> = source.bodies.keys().copied().collect();
    let (selected, body) = match difficulty {
        Some(d) => (
            Some(d),
            source
                .bodies
                .get(&d)
                .ok_or(ParseError::MissingDifficulty(d))?,
        ),
        None => match source.bodies.iter().next_back() {
            Some((d, body)) => (Some(*d), body),
            None => (None, &source.legacy),
        },
    };

    let base_bpm = source.whole_bpm.unwrap_or(DEFAULT_BPM);
    let cleaned = strip_comments(&body.text);
    let end = body_end(&cleaned);
    validate_charset(&cleaned[..end], body)?;

    let scanned = scan_body(&cleaned[..end], base_bpm);
    let chart = assemble(source.metadata, selected, available, base_bpm, scanned);
    tracing::info!(
        "Parsed chart {:?} difficulty {:?}: {} notes, {} measures",
        chart.metadata().title,
        selected,
        chart.notes().len(),
        chart.total_measures()
    );
    Ok(chart)
}

/// A note body with its location in the source text.
#[derive(Debug, Default)]
struct Body {
    text: String,
    /// 1-based line of the body's first character.
    line: usize,
    /// 1-based column of the body's first character.
    column: usize,
}

#[derive(Debug, Default)]
struct Source {
    metadata: Metadata,
    whole_bpm: Option<f64>,
    bodies: BTreeMap<u8, Body>,
    legacy: Body,
}

/// Pass one: directives and difficulty bodies.
///
/// An `&inote_N=` value continues on following lines until the next line
/// starting with `&`. Other directives are single-line. Lines outside any
/// note body form the legacy body.
fn scan_directives(text: &str) -> Source {
    let mut source = Source::default();
    let mut open_body: Option<u8> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = line.trim_start();
        if let Some(directive) = trimmed.strip_prefix('&') {
            open_body = None;
            let (key, value) = directive.split_once('=').unwrap_or((directive, ""));
            let key = key.trim().to_ascii_lowercase();
            if let Some(slot) = key.strip_prefix("inote_").and_then(parse_slot) {
                let column = line.len() - value.len() + 1;
                source.bodies.insert(
                    slot,
                    Body {
                        text: value.to_string(),
                        line: line_no,
                        column,
                    },
                );
                open_body = Some(slot);
            } else {
                apply_directive(&mut source, &key, value.trim());
            }
            continue;
        }

        let body = match open_body.and_then(|slot| source.bodies.get_mut(&slot)) {
            Some(body) => body,
            None => &mut source.legacy,
        };
        if body.line == 0 {
            body.line = line_no;
            body.column = 1;
        } else {
            body.text.push('\n');
        }
        body.text.push_str(line);
    }
    source
}

fn parse_slot(text: &str) -> Option<u8> {
    text.parse::<u8>()
        .ok()
        .filter(|d| (1..=DIFFICULTY_COUNT).contains(d))
}

fn apply_directive(source: &mut Source, key: &str, value: &str) {
    let meta = &mut source.metadata;
    match key {
        "title" => meta.title = value.to_string(),
        "artist" => meta.artist = value.to_string(),
        "des" => meta.designer = value.to_string(),
        "first" => meta.first_offset_s = value.parse().unwrap_or(0.0),
        "wholebpm" => source.whole_bpm = value.parse().ok().filter(|b: &f64| *b > 0.0),
        _ => {
            if let Some(slot) = key.strip_prefix("des_").and_then(parse_slot) {
                meta.designers.insert(slot, value.to_string());
            } else if let Some(slot) = key.strip_prefix("lv_").and_then(parse_slot) {
                meta.levels.insert(slot, value.to_string());
            } else {
                tracing::debug!("Ignoring directive &{}", key);
            }
        }
    }
}

/// Replaces `||` comments with spaces so columns stay aligned.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_comment = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' {
            in_comment = false;
            out.push(ch);
        } else if in_comment {
            out.push(' ');
        } else if ch == '|' && chars.peek() == Some(&'|') {
            in_comment = true;
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Byte offset of the `E` end marker, or the body length.
///
/// `E` followed by a digit is a touch zone, not the end marker.
fn body_end(text: &str) -> usize {
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if ch == 'E' && !chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
            return i;
        }
    }
    text.len()
}

fn is_notation_char(ch: char) -> bool {
    ch.is_ascii_digit()
        || ch.is_whitespace()
        || "ABCDEbxfh$!?@-^<>vpqszwV[]{}():#.,/*`".contains(ch)
}

fn validate_charset(text: &str, body: &Body) -> Result<(), ParseError> {
    let mut line = body.line.max(1);
    let mut column = body.column.max(1);
    for ch in text.chars() {
        if !is_notation_char(ch) {
            return Err(ParseError::InvalidCharacter { ch, line, column });
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Ok(())
}

/// How far one comma advances the cursor.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// `{n}`: a measure split into n parts.
    Divisor(u32),
    /// `{#s}`: a fixed number of seconds.
    Seconds(f64),
}

impl Step {
    fn beats(self, bpm: f64) -> f64 {
        match self {
            Step::Divisor(n) => BEATS_PER_MEASURE / n as f64,
            Step::Seconds(s) => s * bpm / 60.0,
        }
    }

    fn divisor(self, bpm: f64) -> u32 {
        match self {
            Step::Divisor(n) => n,
            Step::Seconds(_) => (BEATS_PER_MEASURE / self.beats(bpm)).round().max(1.0) as u32,
        }
    }
}

#[derive(Debug)]
struct Cursor {
    beat: f64,
    ms: f64,
    bpm: f64,
    step: Step,
}

/// A recognised note with the cursor state at which it was written.
#[derive(Debug)]
struct Placed {
    raw: RawNote,
    beat: f64,
    bpm: f64,
}

#[derive(Debug, Default)]
struct Scanned {
    notes: Vec<Placed>,
    bpm_events: Vec<BpmEvent>,
    divisor_events: Vec<DivisorEvent>,
    start_bpm: Option<f64>,
}

/// Pass two: walks the body and records notes, tempo and divisor changes
/// relative to the first authored beat.
fn scan_body(text: &str, base_bpm: f64) -> Scanned {
    let mut out = Scanned::default();
    let mut cursor = Cursor {
        beat: 0.0,
        ms: 0.0,
        bpm: base_bpm,
        step: Step::Divisor(DEFAULT_DIVISOR),
    };
    let mut group = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '(' => {
                let content: String = chars.by_ref().take_while(|c| *c != ')').collect();
                match content.trim().parse::<f64>() {
                    Ok(bpm) if bpm > 0.0 && bpm.is_finite() => {
                        cursor.bpm = bpm;
                        if cursor.beat == 0.0 {
                            out.start_bpm = Some(bpm);
                        }
                        push_event(&mut out.bpm_events, BpmEvent {
                            beat: cursor.beat,
                            bpm,
                        });
                    }
                    _ => tracing::debug!("Skipping malformed tempo ({})", content),
                }
            }
            '{' => {
                let content: String = chars.by_ref().take_while(|c| *c != '}').collect();
                match parse_step(content.trim()) {
                    Some(step) => {
                        cursor.step = step;
                        let divisor = step.divisor(cursor.bpm);
                        let event = DivisorEvent {
                            beat: cursor.beat,
                            divisor,
                        };
                        match out.divisor_events.last_mut() {
                            Some(last) if last.beat == event.beat => *last = event,
                            _ => out.divisor_events.push(event),
                        }
                    }
                    None => tracing::debug!("Skipping malformed divisor {{{}}}", content),
                }
            }
            ',' => {
                flush_group(&mut group, &cursor, &mut out.notes);
                let step_beats = cursor.step.beats(cursor.bpm);
                cursor.ms += step_beats * 60_000.0 / cursor.bpm;
                cursor.beat += step_beats;
            }
            c if c.is_whitespace() => {}
            c => group.push(c),
        }
    }
    flush_group(&mut group, &cursor, &mut out.notes);
    out
}

fn push_event(events: &mut Vec<BpmEvent>, event: BpmEvent) {
    match events.last_mut() {
        Some(last) if last.beat == event.beat => *last = event,
        _ => events.push(event),
    }
}

fn parse_step(content: &str) -> Option<Step> {
    if let Some(seconds) = content.strip_prefix('#') {
        return seconds
            .parse::<f64>()
            .ok()
            .filter(|s| *s > 0.0 && s.is_finite())
            .map(Step::Seconds);
    }
    content
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .map(Step::Divisor)
}

/// Splits a beat group into entries and records the notes it contains.
fn flush_group(group: &mut String, cursor: &Cursor, notes: &mut Vec<Placed>) {
    if group.is_empty() {
        return;
    }
    for entry in group.split(['/', '`']).filter(|e| !e.is_empty()) {
        let parsed = token::parse_entry(entry);
        if parsed.is_empty() {
            tracing::debug!("Skipping unrecognised token {:?} at beat {}", entry, cursor.beat);
        }
        notes.extend(parsed.into_iter().map(|raw| Placed {
            raw,
            beat: cursor.beat,
            bpm: cursor.bpm,
        }));
    }
    group.clear();
}

/// Shifts by the lead-in, resolves durations and builds the chart.
fn assemble(
    metadata: Metadata,
    difficulty: Option<u8>,
    available: Vec<u8>,
    base_bpm: f64,
    scanned: Scanned,
) -> Chart {
    let start_bpm = scanned.start_bpm.unwrap_or(base_bpm);

    let mut bpm_events = vec![BpmEvent {
        beat: 0.0,
        bpm: start_bpm,
    }];
    for event in &scanned.bpm_events {
        let shifted = BpmEvent {
            beat: event.beat + LEAD_IN_BEATS,
            bpm: event.bpm,
        };
        if bpm_events.last().map(|e| e.bpm) != Some(shifted.bpm) {
            bpm_events.push(shifted);
        }
    }

    let first_divisor = scanned
        .divisor_events
        .first()
        .filter(|e| e.beat == 0.0)
        .map(|e| e.divisor)
        .unwrap_or(DEFAULT_DIVISOR);
    let mut divisor_events = vec![DivisorEvent {
        beat: 0.0,
        divisor: first_divisor,
    }];
    divisor_events.extend(scanned.divisor_events.iter().map(|e| DivisorEvent {
        beat: e.beat + LEAD_IN_BEATS,
        divisor: e.divisor,
    }));

    let resolver = Resolver {
        tempo: &bpm_events,
        fallback: start_bpm,
    };

    let mut notes: Vec<Note> = Vec::with_capacity(scanned.notes.len());
    for placed in scanned.notes {
        let beat = placed.beat + LEAD_IN_BEATS;
        resolver.build(placed.raw, beat, placed.bpm, &divisor_events, &mut notes);
    }
    notes.sort_by(|a, b| a.timing.beat.total_cmp(&b.timing.beat));
    for (i, note) in notes.iter_mut().enumerate() {
        note.id = NoteId::from_index(i);
    }

    let furthest = notes
        .iter()
        .map(Note::end_beat)
        .fold(LEAD_IN_BEATS, f64::max);
    let total_measures = (furthest / BEATS_PER_MEASURE).floor() as u32 + 1;

    Chart::new(
        metadata,
        difficulty,
        available,
        base_bpm,
        notes,
        bpm_events,
        divisor_events,
        total_measures,
    )
}

/// Converts unresolved durations against the finished tempo map.
struct Resolver<'a> {
    tempo: &'a [BpmEvent],
    fallback: f64,
}

impl Resolver<'_> {
    fn ms(&self, beat: f64) -> f64 {
        tempo::beats_to_ms(beat, self.tempo, self.fallback)
    }

    fn beat(&self, ms: f64) -> f64 {
        tempo::ms_to_beats(ms, self.tempo, self.fallback)
    }

    fn timing(&self, beat: f64, bpm: f64, divisors: &[DivisorEvent]) -> NoteTiming {
        let measure = (beat / BEATS_PER_MEASURE + 1e-9).floor().max(0.0);
        let step = BEATS_PER_MEASURE / tempo::divisor_at(beat, divisors) as f64;
        let within = beat - measure * BEATS_PER_MEASURE;
        NoteTiming {
            beat,
            ms: self.ms(beat),
            measure: measure as u32,
            sub_measure: (within / step + 1e-6).floor().max(0.0) as u32,
            bpm,
        }
    }

    /// Resolves a duration that starts at (`beat`, `ms`).
    fn span(&self, beat: f64, ms: f64, duration: RawDuration) -> Span {
        match duration {
            RawDuration::Beats(beats) => Span {
                beats,
                ms: self.ms(beat + beats) - ms,
            },
            RawDuration::BeatsAtBpm { beats, bpm } => self.span_ms(beat, ms, beats * 60_000.0 / bpm),
            RawDuration::Seconds(s) => self.span_ms(beat, ms, s * 1000.0),
        }
    }

    fn span_ms(&self, beat: f64, ms: f64, length_ms: f64) -> Span {
        Span {
            beats: self.beat(ms + length_ms) - beat,
            ms: length_ms,
        }
    }

    fn build(
        &self,
        raw: RawNote,
        beat: f64,
        bpm: f64,
        divisors: &[DivisorEvent],
        notes: &mut Vec<Note>,
    ) {
        let timing = self.timing(beat, bpm, divisors);
        let mut push = |position: Position, timing: NoteTiming, flags: NoteFlags, kind: NoteKind| {
            notes.push(Note {
                id: NoteId::from_index(0),
                position,
                timing,
                flags,
                kind,
            })
        };

        let RawNote {
            position,
            flags,
            kind,
        } = raw;
        match kind {
            RawKind::Tap => push(position, timing, flags, NoteKind::Tap),
            RawKind::Break => push(position, timing, flags, NoteKind::Break),
            RawKind::SimultaneousTap => push(position, timing, flags, NoteKind::SimultaneousTap),
            RawKind::Touch => push(position, timing, flags, NoteKind::Touch),
            RawKind::Hold { duration } | RawKind::TouchHold { duration } => {
                let touch = matches!(position, Position::Touch(_));
                let span = duration
                    .map(|d| self.span(beat, timing.ms, d))
                    .unwrap_or_default();
                let end_beat = beat + span.beats;
                let end_timing = NoteTiming {
                    ms: timing.ms + span.ms,
                    ..self.timing(end_beat, tempo::bpm_at(end_beat, self.tempo, bpm), divisors)
                };
                let (start_kind, end_kind) = if touch {
                    (
                        NoteKind::TouchHoldStart { duration: span },
                        NoteKind::TouchHoldEnd { start_beat: beat },
                    )
                } else {
                    (
                        NoteKind::HoldStart { duration: span },
                        NoteKind::HoldEnd { start_beat: beat },
                    )
                };
                push(position, timing, flags, start_kind);
                push(position, end_timing, flags, end_kind);
            }
            RawKind::Slide {
                segments,
                break_body,
            } => {
                let slide = self.slide(beat, timing.ms, bpm, segments, break_body);
                push(position, timing, flags, NoteKind::Slide(slide));
            }
        }
    }

    /// Resolves a slide chain.
    ///
    /// A bracket times the run of unbracketed segments before it together
    /// with its own segment; the run's duration is shared in proportion to
    /// each segment's arc length.
    fn slide(
        &self,
        beat: f64,
        ms: f64,
        bpm: f64,
        raw: Vec<RawSegment>,
        break_body: bool,
    ) -> SlideNote {
        let delay_raw = raw
            .iter()
            .find_map(|s| s.timing.and_then(|t| t.delay))
            .unwrap_or(RawDuration::BeatsAtBpm { beats: 1.0, bpm });
        let delay = self.span(beat, ms, delay_raw);

        let mut segments: Vec<SlideSegment> = raw
            .iter()
            .map(|s| SlideSegment::new(s.path, s.start, s.end, Span::default()))
            .collect();

        let mut run_start = 0;
        let mut cursor_ms = ms + delay.ms;
        for (i, seg) in raw.iter().enumerate() {
            let Some(bracket) = seg.timing else { continue };
            let run_beat = self.beat(cursor_ms);
            let total = self.span(run_beat, cursor_ms, bracket.duration);
            let lengths: Vec<f64> = segments[run_start..=i]
                .iter()
                .map(|s| s.arc_length().max(1e-6))
                .collect();
            let sum: f64 = lengths.iter().sum();

            let mut seg_start_ms = cursor_ms;
            let mut acc = 0.0;
            for (offset, length) in lengths.iter().enumerate() {
                acc += length;
                let seg_end_ms = cursor_ms + total.ms * acc / sum;
                segments[run_start + offset].duration = Span {
                    beats: self.beat(seg_end_ms) - self.beat(seg_start_ms),
                    ms: seg_end_ms - seg_start_ms,
                };
                seg_start_ms = seg_end_ms;
            }
            cursor_ms += total.ms;
            run_start = i + 1;
        }

        SlideNote {
            segments,
            delay,
            break_body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::note::{Button, SlidePath, TouchArea, TouchZone};

    fn taps(chart: &Chart) -> Vec<&Note> {
        chart
            .notes()
            .iter()
            .filter(|n| matches!(n.kind, NoteKind::Tap))
            .collect()
    }

    #[test]
    fn test_simple_taps_with_lead_in() {
        let chart = parse("(120){4}1,2,3,4,", None).unwrap();
        let taps = taps(&chart);
        assert_eq!(taps.len(), 4);
        for (i, note) in taps.iter().enumerate() {
            assert!((note.timing.beat - LEAD_IN_BEATS - i as f64).abs() < 1e-9);
            assert_eq!(note.timing.bpm, 120.0);
            assert_eq!(note.button().map(Button::number), Some(i as u8 + 1));
        }
        // 4 lead-in beats at 120 BPM is 2 seconds
        assert!((taps[0].timing.ms - 2000.0).abs() < 1e-9);
        assert!((taps[1].timing.ms - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_note_lands_in_measure_one() {
        let chart = parse("(150){8}1,,,2,", None).unwrap();
        assert_eq!(chart.notes()[0].timing.measure, 1);
        assert_eq!(chart.notes()[0].timing.sub_measure, 0);
        assert_eq!(chart.notes()[1].timing.sub_measure, 3);
    }

    #[test]
    fn test_hold_pairs() {
        let chart = parse("(120){4}1h[4:1],", None).unwrap();
        let notes = chart.notes();
        assert_eq!(notes.len(), 2);
        let start = &notes[0];
        let end = &notes[1];
        match (&start.kind, &end.kind) {
            (NoteKind::HoldStart { duration }, NoteKind::HoldEnd { start_beat }) => {
                assert!((duration.beats - 1.0).abs() < 1e-9);
                assert!((duration.ms - 500.0).abs() < 1e-9);
                assert_eq!(*start_beat, start.timing.beat);
            }
            other => panic!("unexpected kinds {other:?}"),
        }
        assert_eq!(start.position, end.position);
        assert!((end.timing.beat - start.timing.beat - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_hold_start_has_one_end() {
        let text = "(160){8}1h[4:1]/5h[8:3],Ch[2:1],,(80)3bh[#1.5],E";
        let chart = parse(text, None).unwrap();
        for start in chart.notes() {
            let (is_touch, beat) = match start.kind {
                NoteKind::HoldStart { .. } => (false, start.timing.beat),
                NoteKind::TouchHoldStart { .. } => (true, start.timing.beat),
                _ => continue,
            };
            let ends = chart
                .notes()
                .iter()
                .filter(|n| n.position == start.position)
                .filter(|n| match n.kind {
                    NoteKind::HoldEnd { start_beat } => !is_touch && start_beat == beat,
                    NoteKind::TouchHoldEnd { start_beat } => is_touch && start_beat == beat,
                    _ => false,
                })
                .count();
            assert_eq!(ends, 1);
        }
    }

    #[test]
    fn test_hold_spans_tempo_change() {
        // Two beats at 120 then two at 60: 1000ms + 2000ms
        let chart = parse("(120){4}1h[1:1],,(60),,", None).unwrap();
        match chart.notes()[0].kind {
            NoteKind::HoldStart { duration } => {
                assert!((duration.beats - 4.0).abs() < 1e-9);
                assert!((duration.ms - 3000.0).abs() < 1e-9);
            }
            ref other => panic!("expected hold, got {other:?}"),
        }
    }

    #[test]
    fn test_seconds_duration_resolved_against_tempo() {
        let chart = parse("(120){4}1h[#1],(60),", None).unwrap();
        match chart.notes()[0].kind {
            NoteKind::HoldStart { duration } => {
                assert!((duration.ms - 1000.0).abs() < 1e-9);
                // 0.5s at 120 covers 1 beat, 0.5s at 60 covers 0.5 beat
                assert!((duration.beats - 1.5).abs() < 1e-9);
            }
            ref other => panic!("expected hold, got {other:?}"),
        }
    }

    #[test]
    fn test_slide_defaults_and_chain() {
        let chart = parse("(120){4}1-5[4:1],3-6<2[2:1],", None).unwrap();
        let slides: Vec<&SlideNote> = chart.notes().iter().filter_map(Note::slide).collect();
        assert_eq!(slides.len(), 2);

        let single = slides[0];
        assert!((single.delay.beats - 1.0).abs() < 1e-9);
        assert!((single.duration().beats - 1.0).abs() < 1e-9);

        let chain = slides[1];
        assert_eq!(chain.segments.len(), 2);
        assert!(chain.is_continuous());
        assert_eq!(chain.segments[1].path, SlidePath::ArcLeft);
        assert!((chain.duration().beats - 2.0).abs() < 1e-6);
        let first_share = chain.segments[0].duration.ms / chain.duration().ms;
        let expected = chain.segments[0].arc_length()
            / (chain.segments[0].arc_length() + chain.segments[1].arc_length());
        assert!((first_share - expected).abs() < 1e-6);
    }

    #[test]
    fn test_slide_explicit_delay() {
        let chart = parse("(120){4}1-5[0.25##1.5],", None).unwrap();
        let slide = chart.notes()[0].slide().unwrap();
        assert!((slide.delay.ms - 250.0).abs() < 1e-9);
        assert!((slide.duration().ms - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_touch_and_simultaneous_tokens() {
        let chart = parse("(120){4}18/B3/C,E", None).unwrap();
        let notes = chart.notes();
        assert_eq!(notes.len(), 4);
        assert_eq!(
            notes
                .iter()
                .filter(|n| matches!(n.kind, NoteKind::SimultaneousTap))
                .count(),
            2
        );
        assert!(notes.iter().any(|n| n.position
            == Position::Touch(TouchZone::new(TouchArea::B, 3).unwrap())));
    }

    #[test]
    fn test_bad_tokens_are_skipped() {
        let chart = parse("(120){4}1,9,1-2[4:1],3,", None).unwrap();
        assert_eq!(chart.notes().len(), 2);
        assert!((chart.notes()[1].timing.beat - LEAD_IN_BEATS - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_map_has_synthetic_start() {
        let chart = parse("(120){4}1,(180)2,", None).unwrap();
        let events = chart.bpm_events();
        assert_eq!(events[0].beat, 0.0);
        assert_eq!(events[0].bpm, 120.0);
        assert_eq!(events.last().map(|e| e.bpm), Some(180.0));
        assert!((events.last().map(|e| e.beat).unwrap_or(0.0) - 5.0).abs() < 1e-9);
        assert_eq!(chart.divisor_events()[0].beat, 0.0);
        assert!(chart.bpm_events().windows(2).all(|w| w[0].beat <= w[1].beat));
    }

    #[test]
    fn test_comments_and_end_marker() {
        let chart = parse("(120){4}1,|| ignore %% this\n2,E 3,4,", None).unwrap();
        assert_eq!(chart.notes().len(), 2);
    }

    #[test]
    fn test_invalid_character_location() {
        let err = parse("&title=x\n&inote_5=(120){4}\n1,2,\n3,%", Some(5)).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidCharacter {
                ch: '%',
                line: 4,
                column: 3
            }
        );
    }

    #[test]
    fn test_difficulty_selection() {
        let text = "&title=Song\n&lv_4=12\n&lv_5=13+\n&inote_4=(120)1,\n&inote_5=(120)1,2,\nE";
        let master = parse(text, None).unwrap();
        assert_eq!(master.difficulty(), Some(5));
        assert_eq!(master.notes().len(), 2);
        assert_eq!(master.available_difficulties(), &[4, 5]);
        assert_eq!(master.metadata().levels.get(&5).map(String::as_str), Some("13+"));

        let expert = parse(text, Some(4)).unwrap();
        assert_eq!(expert.notes().len(), 1);

        assert_eq!(parse(text, Some(2)), Err(ParseError::MissingDifficulty(2)));
        assert_eq!(parse(text, Some(7)), Err(ParseError::InvalidDifficulty(7)));
        assert_eq!(parse("  \n", None), Err(ParseError::Empty));
    }

    #[test]
    fn test_metadata_directives() {
        let text = "&title=Song\n&artist=Band\n&des=Someone\n&first=1.25\n&wholebpm=150\n1,2,";
        let chart = parse(text, None).unwrap();
        assert_eq!(chart.metadata().title, "Song");
        assert_eq!(chart.metadata().artist, "Band");
        assert_eq!(chart.metadata().designer, "Someone");
        assert!((chart.metadata().first_offset_s - 1.25).abs() < 1e-9);
        assert_eq!(chart.base_bpm(), 150.0);
        assert_eq!(chart.difficulty(), None);
        assert_eq!(chart.notes()[0].timing.bpm, 150.0);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "(170){8}1-5[4:1]*>7[8:3],2h[2:1]/C,{16}3b,4x,5$,E1/B2,,,E";
        assert_eq!(parse(text, None), parse(text, None));
    }

    #[test]
    fn test_absolute_divisor() {
        // {#0.25} at 120 BPM is half a beat per comma
        let chart = parse("(120){#0.25}1,2,3,", None).unwrap();
        assert!((chart.notes()[2].timing.beat - LEAD_IN_BEATS - 1.0).abs() < 1e-9);
        assert_eq!(chart.divisor_events()[0].divisor, 8);
    }

    #[test]
    fn test_total_measures_cover_last_note() {
        let chart = parse("(120){1}1,2,3h[1:2],", None).unwrap();
        // hold at measure 3 (beat 12 + lead-in) lasting two measures
        assert!(chart.end_beat() > chart.notes().last().map(Note::end_beat).unwrap_or(0.0));
    }
}
