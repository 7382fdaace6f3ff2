//! Answer-tick driver.
//!
//! Each frame the driver looks at the notes whose time fell between the
//! previous frame and this one (shifted by the sound offset) and fires a
//! tick for each audible one. A played set keyed by note kind, time and
//! position makes every note fire at most once until the next seek.

use super::{TickOutput, TickSound};
use crate::chart::{Chart, Note, NoteKind, NoteKindTag, Position};
use crate::config::Config;
use crate::timeline::Playhead;
use std::collections::{BTreeSet, HashSet};

/// Identity of a fired note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlayedKey {
    kind: NoteKindTag,
    ms_bits: u64,
    position: Position,
}

impl PlayedKey {
    fn of(note: &Note) -> Self {
        Self {
            kind: note.tag(),
            ms_bits: note.timing.ms.to_bits(),
            position: note.position,
        }
    }
}

/// Fires tick sounds as notes pass the playhead.
#[derive(Debug, Default)]
pub struct AnswerTick {
    played: HashSet<PlayedKey>,
    /// Playhead time of the previous update.
    last_ms: Option<f64>,
    last_version: Option<u64>,
}

/// Tick for a note, or `None` if the note is silent under `config`.
fn tick_for(note: &Note, config: &Config) -> Option<TickSound> {
    match note.kind {
        NoteKind::Tap | NoteKind::SimultaneousTap | NoteKind::HoldStart { .. } | NoteKind::Slide(_) => {
            Some(if note.is_break() {
                TickSound::Break
            } else {
                TickSound::Answer
            })
        }
        NoteKind::Break => Some(TickSound::Break),
        NoteKind::Touch | NoteKind::TouchHoldStart { .. } if config.sound_touch => {
            Some(TickSound::Touch)
        }
        NoteKind::HoldEnd { .. } | NoteKind::TouchHoldEnd { .. } if config.sound_hold_end => {
            Some(TickSound::Answer)
        }
        _ => None,
    }
}

impl AnswerTick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every fired note and the previous frame time.
    pub fn reset(&mut self) {
        self.played.clear();
        self.last_ms = None;
    }

    /// Number of notes fired since the last seek.
    pub fn played_count(&self) -> usize {
        self.played.len()
    }

    /// Fires ticks for this frame.
    ///
    /// A changed seek version clears the played set and makes the window
    /// start at the new position, inclusive, so a note exactly at the seek
    /// target fires while notes already passed do not.
    ///
    /// # Returns
    ///
    /// Number of notes that fired.
    pub fn update<O: TickOutput + ?Sized>(
        &mut self,
        out: &mut O,
        chart: &Chart,
        playhead: &Playhead,
        config: &Config,
    ) -> usize {
        let seeked = self.last_version != Some(playhead.seek_version);
        if seeked {
            self.played.clear();
            self.last_version = Some(playhead.seek_version);
        }
        let previous = if seeked { None } else { self.last_ms };
        self.last_ms = Some(playhead.ms);

        if !playhead.playing || !config.sound_enabled {
            return 0;
        }

        let offset = config.sound_offset_ms;
        let high = playhead.ms - offset;
        let (low, inclusive) = match previous {
            Some(last) if last <= playhead.ms => (last - offset, false),
            _ => (high, true),
        };

        let notes = chart.notes();
        let start = if inclusive {
            notes.partition_point(|n| n.timing.ms < low)
        } else {
            notes.partition_point(|n| n.timing.ms <= low)
        };

        let mut fired = 0;
        let mut sounds = BTreeSet::new();
        for note in notes[start..].iter().take_while(|n| n.timing.ms <= high) {
            let Some(sound) = tick_for(note, config) else { continue };
            if self.played.insert(PlayedKey::of(note)) {
                sounds.insert(sound);
                fired += 1;
            }
        }
        // One burst per sound per frame, however many notes coincide.
        for sound in sounds {
            out.play_tick(sound);
        }
        if fired > 0 {
            tracing::trace!(fired, ms = playhead.ms, "Answer ticks");
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse;
    use crate::timeline::Transport;

    #[derive(Default)]
    struct FakeTicks {
        played: Vec<TickSound>,
    }

    impl TickOutput for FakeTicks {
        fn play_tick(&mut self, sound: TickSound) {
            self.played.push(sound);
        }

        fn set_tick_volume(&mut self, _volume: f32) {}
    }

    fn head(ms: f64, version: u64) -> Playhead {
        Playhead {
            beat: 0.0,
            ms,
            measure: 0,
            sub_measure: 0,
            seek_version: version,
            speed: 1.0,
            playing: true,
        }
    }

    /// Four taps at 2000, 2500, 3000, 3500 ms.
    fn chart() -> Chart {
        parse("(120){4}1,2,3,4,", None).unwrap()
    }

    #[test]
    fn test_fires_each_note_once() {
        let chart = chart();
        let config = Config::default();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        assert_eq!(tick.update(&mut out, &chart, &head(1900.0, 0), &config), 0);
        assert_eq!(tick.update(&mut out, &chart, &head(2016.0, 0), &config), 1);
        assert_eq!(tick.update(&mut out, &chart, &head(2032.0, 0), &config), 0);
        assert_eq!(tick.update(&mut out, &chart, &head(3100.0, 0), &config), 2);
        assert_eq!(out.played.len(), 2);
        assert_eq!(tick.played_count(), 3);
    }

    #[test]
    fn test_seek_backward_refires_note_at_target() {
        let chart = chart();
        let config = Config::default();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        tick.update(&mut out, &chart, &head(1990.0, 0), &config);
        assert_eq!(tick.update(&mut out, &chart, &head(2600.0, 0), &config), 2);

        // seek back exactly onto the first note
        assert_eq!(tick.update(&mut out, &chart, &head(2000.0, 1), &config), 1);
        assert_eq!(tick.update(&mut out, &chart, &head(2510.0, 1), &config), 1);
    }

    #[test]
    fn test_seek_does_not_replay_passed_notes() {
        let chart = chart();
        let config = Config::default();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        assert_eq!(tick.update(&mut out, &chart, &head(3200.0, 4), &config), 0);
        assert_eq!(tick.update(&mut out, &chart, &head(3216.0, 4), &config), 0);
    }

    #[test]
    fn test_offset_shifts_window() {
        let chart = chart();
        let config = Config {
            sound_offset_ms: 100.0,
            ..Default::default()
        };
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        tick.update(&mut out, &chart, &head(1990.0, 0), &config);
        assert_eq!(tick.update(&mut out, &chart, &head(2050.0, 0), &config), 0);
        assert_eq!(tick.update(&mut out, &chart, &head(2110.0, 0), &config), 1);
    }

    #[test]
    fn test_touch_and_hold_end_toggles() {
        let chart = parse("(120){4}B1,2h[4:1],,,", None).unwrap();
        let mut out = FakeTicks::default();

        let mut quiet = AnswerTick::new();
        let config = Config {
            sound_touch: false,
            sound_hold_end: false,
            ..Default::default()
        };
        quiet.update(&mut out, &chart, &head(0.0, 0), &config);
        assert_eq!(quiet.update(&mut out, &chart, &head(5000.0, 0), &config), 1);

        let mut loud = AnswerTick::new();
        let config = Config {
            sound_touch: true,
            sound_hold_end: true,
            ..Default::default()
        };
        loud.update(&mut out, &chart, &head(0.0, 0), &config);
        assert_eq!(loud.update(&mut out, &chart, &head(5000.0, 0), &config), 3);
    }

    #[test]
    fn test_break_uses_break_sound() {
        let chart = parse("(120)1b,", None).unwrap();
        let config = Config::default();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        tick.update(&mut out, &chart, &head(0.0, 0), &config);
        tick.update(&mut out, &chart, &head(2500.0, 0), &config);
        assert_eq!(out.played, vec![TickSound::Break]);
    }

    #[test]
    fn test_silent_while_paused_or_disabled() {
        let chart = chart();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        let disabled = Config {
            sound_enabled: false,
            ..Default::default()
        };
        tick.update(&mut out, &chart, &head(0.0, 0), &disabled);
        assert_eq!(tick.update(&mut out, &chart, &head(4000.0, 0), &disabled), 0);

        let mut paused = head(4000.0, 0);
        paused.playing = false;
        assert_eq!(tick.update(&mut out, &chart, &paused, &Config::default()), 0);
        assert!(out.played.is_empty());
    }

    #[test]
    fn test_follows_transport_playhead() {
        let chart = chart();
        let config = Config::default();
        let mut transport = Transport::new();
        let mut tick = AnswerTick::new();
        let mut out = FakeTicks::default();
        transport.play(&chart, 0.0, true);
        let mut fired = 0;
        let mut now = 0.0;
        while now < 4000.0 {
            let playhead = transport.tick(&chart, now);
            fired += tick.update(&mut out, &chart, &playhead, &config);
            now += 16.0;
        }
        assert_eq!(fired, 4);
    }
}
