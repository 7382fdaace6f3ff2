//! Beat and millisecond conversion over a piecewise-constant tempo map.
//!
//! Every function takes the tempo map by slice so the same math serves the
//! parser (resolving durations) and playback (per-frame clock).

use crate::chart::{BpmEvent, DivisorEvent, DEFAULT_DIVISOR};

/// Largest subdivision used for step navigation.
pub const MAX_STEP_DIVISOR: u32 = 32;

#[inline]
fn ms_per_beat(bpm: f64) -> f64 {
    60_000.0 / bpm
}

/// Converts a beat position to milliseconds.
///
/// Walks the tempo events up to `beat`, accumulating `Δbeat · 60000 / bpm`
/// for each constant-tempo segment, then adds the remainder in the final
/// segment. Events at or before beat 0 set the starting tempo; otherwise
/// `fallback_bpm` applies until the first event.
///
/// # Arguments
///
/// * `beat` - Position to convert (may be negative)
/// * `tempo` - Tempo events sorted by beat
/// * `fallback_bpm` - Tempo used where no event applies
pub fn beats_to_ms(beat: f64, tempo: &[BpmEvent], fallback_bpm: f64) -> f64 {
    let mut ms = 0.0;
    let mut prev_beat = 0.0;
    let mut bpm = fallback_bpm;

    for event in tempo {
        if event.beat > prev_beat {
            if event.beat >= beat {
                break;
            }
            ms += (event.beat - prev_beat) * ms_per_beat(bpm);
            prev_beat = event.beat;
        }
        bpm = event.bpm;
    }
    ms + (beat - prev_beat) * ms_per_beat(bpm)
}

/// Converts milliseconds back to a beat position.
///
/// Exact inverse of [`beats_to_ms`] for the same tempo map.
pub fn ms_to_beats(ms: f64, tempo: &[BpmEvent], fallback_bpm: f64) -> f64 {
    let mut acc_ms = 0.0;
    let mut prev_beat = 0.0;
    let mut bpm = fallback_bpm;

    for event in tempo {
        if event.beat > prev_beat {
            let segment_ms = (event.beat - prev_beat) * ms_per_beat(bpm);
            if acc_ms + segment_ms >= ms {
                break;
            }
            acc_ms += segment_ms;
            prev_beat = event.beat;
        }
        bpm = event.bpm;
    }
    prev_beat + (ms - acc_ms) / ms_per_beat(bpm)
}

/// Returns the BPM in effect at `beat`.
pub fn bpm_at(beat: f64, tempo: &[BpmEvent], fallback_bpm: f64) -> f64 {
    last_at(tempo, beat, |e| e.beat)
        .map(|e| e.bpm)
        .unwrap_or(fallback_bpm)
}

/// Returns the most recent tempo event at or before `beat`.
pub fn bpm_event_at(beat: f64, tempo: &[BpmEvent]) -> Option<&BpmEvent> {
    last_at(tempo, beat, |e| e.beat)
}

/// Returns the authored subdivision in effect at `beat`.
pub fn divisor_at(beat: f64, divisors: &[DivisorEvent]) -> u32 {
    last_at(divisors, beat, |e| e.beat)
        .map(|e| e.divisor)
        .unwrap_or(DEFAULT_DIVISOR)
}

/// Returns the subdivision for step navigation, capped at
/// [`MAX_STEP_DIVISOR`].
pub fn step_divisor_at(beat: f64, divisors: &[DivisorEvent]) -> u32 {
    divisor_at(beat, divisors).clamp(1, MAX_STEP_DIVISOR)
}

/// Returns the divisor event at or before `beat`.
pub fn divisor_event_at(beat: f64, divisors: &[DivisorEvent]) -> Option<&DivisorEvent> {
    last_at(divisors, beat, |e| e.beat)
}

/// Binary search for the last element whose key is `<= at`.
fn last_at<T>(events: &[T], at: f64, key: impl Fn(&T) -> f64) -> Option<&T> {
    let idx = events.partition_point(|e| key(e) <= at + 1e-9);
    idx.checked_sub(1).and_then(|i| events.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> Vec<BpmEvent> {
        vec![
            BpmEvent {
                beat: 0.0,
                bpm: 120.0,
            },
            BpmEvent {
                beat: 8.0,
                bpm: 240.0,
            },
            BpmEvent {
                beat: 16.0,
                bpm: 90.0,
            },
        ]
    }

    #[test]
    fn test_constant_tempo() {
        let tempo = [BpmEvent {
            beat: 0.0,
            bpm: 120.0,
        }];
        assert!((beats_to_ms(4.0, &tempo, 120.0) - 2000.0).abs() < 1e-9);
        assert!((ms_to_beats(2000.0, &tempo, 120.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_integrates_across_changes() {
        let tempo = map();
        // 8 beats at 120 = 4000ms, 4 beats at 240 = 1000ms
        assert!((beats_to_ms(12.0, &tempo, 120.0) - 5000.0).abs() < 1e-9);
        // 8 beats at 240 = 2000ms, 2 beats at 90 = 1333.33ms
        let expected = 4000.0 + 2000.0 + 2.0 * 60_000.0 / 90.0;
        assert!((beats_to_ms(18.0, &tempo, 120.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let tempo = map();
        for i in -8..200 {
            let beat = i as f64 * 0.137;
            let back = ms_to_beats(beats_to_ms(beat, &tempo, 150.0), &tempo, 150.0);
            let tolerance = 1e-6 * beat.abs().max(1.0);
            assert!((back - beat).abs() < tolerance, "beat {beat} -> {back}");
        }
    }

    #[test]
    fn test_fallback_before_first_event() {
        let tempo = [BpmEvent {
            beat: 4.0,
            bpm: 60.0,
        }];
        assert!((beats_to_ms(2.0, &tempo, 120.0) - 1000.0).abs() < 1e-9);
        assert!((beats_to_ms(5.0, &tempo, 120.0) - 3000.0).abs() < 1e-9);
        assert_eq!(bpm_at(2.0, &tempo, 120.0), 120.0);
        assert_eq!(bpm_at(4.0, &tempo, 120.0), 60.0);
    }

    #[test]
    fn test_divisor_lookup_and_cap() {
        let divisors = [
            DivisorEvent {
                beat: 0.0,
                divisor: 4,
            },
            DivisorEvent {
                beat: 8.0,
                divisor: 64,
            },
        ];
        assert_eq!(divisor_at(7.9, &divisors), 4);
        assert_eq!(divisor_at(8.0, &divisors), 64);
        assert_eq!(step_divisor_at(9.0, &divisors), MAX_STEP_DIVISOR);
        assert_eq!(divisor_at(1.0, &[]), DEFAULT_DIVISOR);
    }
}
