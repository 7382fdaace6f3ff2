//! Grammar for a single note token inside a beat group.
//!
//! Tokens are classified in priority order: hold, slide, multi-digit
//! simultaneous taps, touch, then plain tap/break. Anything that does not
//! match is rejected with `None` and skipped by the caller. Durations are
//! returned unresolved; the parser converts them once the tempo map is
//! complete.

use super::note::{Button, NoteFlags, Position, SlidePath, TouchArea, TouchZone};

/// A duration as written, before tempo resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RawDuration {
    /// Beats integrated across the tempo map.
    Beats(f64),
    /// Beats measured at a fixed BPM.
    BeatsAtBpm { beats: f64, bpm: f64 },
    /// Wall-clock seconds.
    Seconds(f64),
}

/// Contents of a `[...]` bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BracketTiming {
    pub duration: RawDuration,
    /// Explicit slide delay; `None` means the default one-beat wait.
    pub delay: Option<RawDuration>,
}

/// A slide segment with its optional bracket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawSegment {
    pub path: SlidePath,
    pub start: Button,
    pub end: Button,
    pub timing: Option<BracketTiming>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawKind {
    Tap,
    Break,
    SimultaneousTap,
    Hold { duration: Option<RawDuration> },
    Slide { segments: Vec<RawSegment>, break_body: bool },
    Touch,
    TouchHold { duration: Option<RawDuration> },
}

/// One note recognised from a token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawNote {
    pub position: Position,
    pub flags: NoteFlags,
    pub kind: RawKind,
}

/// Parses one `/`-separated entry of a beat group.
///
/// `*` separates extra slides that share the first slide's start button;
/// those are emitted without a head of their own.
///
/// # Returns
///
/// The recognised notes. Unrecognised parts yield nothing.
pub(crate) fn parse_entry(entry: &str) -> Vec<RawNote> {
    let mut parts = entry.split('*');
    let first = parts.next().unwrap_or_default();
    let mut notes = parse_token(first).unwrap_or_default();

    let start = first.chars().next().and_then(Button::from_digit);
    for extra in parts {
        let Some(start) = start else { break };
        let text = format!("{}{}", start.number(), extra);
        if let Some(mut extra_notes) = parse_token(&text) {
            for note in &mut extra_notes {
                if matches!(note.kind, RawKind::Slide { .. }) {
                    note.flags.no_head = true;
                }
            }
            notes.extend(extra_notes);
        }
    }
    notes
}

/// Parses one token.
pub(crate) fn parse_token(token: &str) -> Option<Vec<RawNote>> {
    if token.is_empty() {
        return None;
    }
    if token.len() >= 2 && token.chars().all(|c| ('1'..='8').contains(&c)) {
        return token
            .chars()
            .map(|c| {
                Button::from_digit(c).map(|b| RawNote {
                    position: Position::Button(b),
                    flags: NoteFlags::default(),
                    kind: RawKind::SimultaneousTap,
                })
            })
            .collect();
    }

    let mut scanner = Scanner::new(token);
    let first = scanner.peek()?;
    if let Some(button) = Button::from_digit(first) {
        scanner.bump();
        return parse_button_note(&mut scanner, button).map(|n| vec![n]);
    }
    if let Some(area) = TouchArea::from_char(first) {
        scanner.bump();
        return parse_touch_note(&mut scanner, area).map(|n| vec![n]);
    }
    None
}

fn parse_button_note(scanner: &mut Scanner, button: Button) -> Option<RawNote> {
    let mut flags = NoteFlags::default();
    let mut hold = false;
    let mut duration = None;

    while let Some(ch) = scanner.peek() {
        match ch {
            'b' => flags.break_note = true,
            'x' => flags.ex = true,
            'f' => flags.firework = true,
            '$' | '@' => flags.star = true,
            '?' | '!' => flags.no_head = true,
            'h' => hold = true,
            '[' if hold => {
                duration = Some(parse_bracket(&scanner.bracket()?)?.duration);
                continue;
            }
            c if SlidePath::is_symbol_start(c) && !hold => {
                return parse_slide(scanner, button, flags);
            }
            _ => return None,
        }
        scanner.bump();
    }

    let position = Position::Button(button);
    if hold {
        return Some(RawNote {
            position,
            flags,
            kind: RawKind::Hold { duration },
        });
    }
    let kind = if flags.break_note {
        RawKind::Break
    } else {
        RawKind::Tap
    };
    Some(RawNote {
        position,
        flags,
        kind,
    })
}

fn parse_touch_note(scanner: &mut Scanner, area: TouchArea) -> Option<RawNote> {
    let index = match scanner.peek().and_then(|c| c.to_digit(10)) {
        Some(d) => {
            scanner.bump();
            d as u8
        }
        None if area == TouchArea::C => 1,
        None => return None,
    };
    let zone = TouchZone::new(area, index)?;

    let mut flags = NoteFlags::default();
    let mut hold = false;
    let mut duration = None;
    while let Some(ch) = scanner.peek() {
        match ch {
            'f' => flags.firework = true,
            'h' => hold = true,
            '[' if hold => {
                duration = Some(parse_bracket(&scanner.bracket()?)?.duration);
                continue;
            }
            _ => return None,
        }
        scanner.bump();
    }

    let kind = if hold {
        RawKind::TouchHold { duration }
    } else {
        RawKind::Touch
    };
    Some(RawNote {
        position: Position::Touch(zone),
        flags,
        kind,
    })
}

fn parse_slide(scanner: &mut Scanner, start: Button, mut flags: NoteFlags) -> Option<RawNote> {
    flags.star = true;
    let mut segments: Vec<RawSegment> = Vec::new();
    let mut break_body = false;
    let mut from = start;

    while scanner.peek().is_some() {
        let path = scanner.path_symbol()?;
        let end = Button::from_digit(scanner.next()?)?;
        if !path_allows(path, from, end) {
            return None;
        }
        let mut timing = None;
        loop {
            match scanner.peek() {
                Some('b') => {
                    break_body = true;
                    scanner.bump();
                }
                Some('[') => timing = Some(parse_bracket(&scanner.bracket()?)?),
                _ => break,
            }
        }
        segments.push(RawSegment {
            path,
            start: from,
            end,
            timing,
        });
        from = end;

        match scanner.peek() {
            Some(c) if SlidePath::is_symbol_start(c) => {}
            Some(_) => return None,
            None => break,
        }
    }

    if segments.last()?.timing.is_none() {
        return None;
    }
    Some(RawNote {
        position: Position::Button(start),
        flags,
        kind: RawKind::Slide {
            segments,
            break_body,
        },
    })
}

/// Whether a primitive can connect two buttons.
fn path_allows(path: SlidePath, start: Button, end: Button) -> bool {
    let distance = start.clockwise_distance(end);
    match path {
        SlidePath::Straight => !matches!(distance, 0 | 1 | 7),
        SlidePath::ShortArc => !matches!(distance, 0 | 4),
        SlidePath::ThroughCenter => distance != 0,
        SlidePath::BendS | SlidePath::BendZ | SlidePath::Wifi => distance == 4,
        SlidePath::ArcLeft
        | SlidePath::ArcRight
        | SlidePath::SpiralP
        | SlidePath::SpiralQ
        | SlidePath::DoubleSpiralP
        | SlidePath::DoubleSpiralQ => true,
    }
}

/// Parses the inside of a duration bracket.
///
/// Accepted forms: `a:b`, `bpm#a:b`, `bpm#s`, `#s`, `d##s` and `d##a:b`.
pub(crate) fn parse_bracket(content: &str) -> Option<BracketTiming> {
    if let Some((delay, rest)) = content.split_once("##") {
        let delay = RawDuration::Seconds(parse_number(delay)?);
        let duration = match rest.split_once(':') {
            Some(_) => parse_ratio(rest)?,
            None => RawDuration::Seconds(parse_number(rest)?),
        };
        return Some(BracketTiming {
            duration,
            delay: Some(delay),
        });
    }

    if let Some((bpm, rest)) = content.split_once('#') {
        if bpm.is_empty() {
            return Some(BracketTiming {
                duration: RawDuration::Seconds(parse_number(rest)?),
                delay: None,
            });
        }
        let bpm = parse_number(bpm).filter(|b| *b > 0.0)?;
        let duration = match rest.split_once(':') {
            Some(_) => match parse_ratio(rest)? {
                RawDuration::Beats(beats) => RawDuration::BeatsAtBpm { beats, bpm },
                other => other,
            },
            None => RawDuration::Seconds(parse_number(rest)?),
        };
        return Some(BracketTiming {
            duration,
            delay: Some(RawDuration::BeatsAtBpm { beats: 1.0, bpm }),
        });
    }

    Some(BracketTiming {
        duration: parse_ratio(content)?,
        delay: None,
    })
}

/// `a:b` means `b` notes of an `a`-th subdivision of a measure.
fn parse_ratio(text: &str) -> Option<RawDuration> {
    let (divisor, count) = text.split_once(':')?;
    let divisor = parse_number(divisor).filter(|d| *d > 0.0)?;
    let count = parse_number(count)?;
    Some(RawDuration::Beats(count * 4.0 / divisor))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Character cursor over a token.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// Consumes `[...]` and returns the inside.
    fn bracket(&mut self) -> Option<String> {
        if self.next()? != '[' {
            return None;
        }
        let mut content = String::new();
        loop {
            match self.next()? {
                ']' => return Some(content),
                ch => content.push(ch),
            }
        }
    }

    /// Consumes one path symbol, preferring the two-character spirals.
    fn path_symbol(&mut self) -> Option<SlidePath> {
        let path = match self.next()? {
            '-' => SlidePath::Straight,
            '<' => SlidePath::ArcLeft,
            '>' => SlidePath::ArcRight,
            '^' => SlidePath::ShortArc,
            'v' => SlidePath::ThroughCenter,
            's' => SlidePath::BendS,
            'z' => SlidePath::BendZ,
            'w' => SlidePath::Wifi,
            'p' if self.peek() == Some('p') => {
                self.bump();
                SlidePath::DoubleSpiralP
            }
            'q' if self.peek() == Some('q') => {
                self.bump();
                SlidePath::DoubleSpiralQ
            }
            'p' => SlidePath::SpiralP,
            'q' => SlidePath::SpiralQ,
            _ => return None,
        };
        Some(path)
    }
}
