//! Frame composition.
//!
//! [`render_frame`] is a pure function of the chart, the playhead and the
//! config: it builds the per-frame annotations, then draws in fixed passes
//! so later passes sit on top.

use super::annotate::{annotate, FrameAnnotations};
use super::approach::Approach;
use super::layout::RadialLayout;
use super::notes::{draw_hold, draw_slide_head, draw_tap, draw_touch};
use super::overlay::{draw_fps, draw_judgment_line, draw_tallies, draw_tempo};
use super::slide::draw_slide;
use super::surface::Surface;
use crate::chart::{Chart, Note, NoteKind};
use crate::config::Config;
use crate::timeline::Playhead;

/// Everything a draw procedure needs to know about the current frame.
pub struct FrameContext<'a> {
    pub layout: RadialLayout,
    pub approach: Approach,
    pub config: &'a Config,
    pub annotations: &'a FrameAnnotations,
    pub now_ms: f64,
}

/// Host measurements shown by the overlays.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub fps: Option<u32>,
}

/// Draws one frame onto `surface`.
///
/// # Arguments
///
/// * `surface` - Target surface; its size determines the layout
/// * `chart` - Chart being shown
/// * `playhead` - This frame's playback snapshot
/// * `config` - Display options
/// * `stats` - Host measurements for the overlays
///
/// # Returns
///
/// The annotations computed for this frame.
pub fn render_frame<S: Surface>(
    surface: &mut S,
    chart: &Chart,
    playhead: &Playhead,
    config: &Config,
    stats: &FrameStats,
) -> FrameAnnotations {
    let (width, height) = surface.size();
    let approach = Approach::new(config.hi_speed);
    let now_ms = playhead.ms;
    let annotations = annotate(chart, now_ms, &approach);
    let ctx = FrameContext {
        layout: RadialLayout::new(width, height, config.mirror_mode),
        approach,
        config,
        annotations: &annotations,
        now_ms,
    };

    let visible = visible_notes(chart, &approach, now_ms);
    tracing::trace!(count = visible.len(), "Drawing frame");

    draw_judgment_line(surface, &ctx);
    for note in visible.iter().rev() {
        if let NoteKind::Slide(slide) = &note.kind {
            draw_slide(surface, &ctx, note, slide);
        }
    }
    for note in visible.iter().rev() {
        if let NoteKind::HoldStart { duration } = note.kind {
            draw_hold(surface, &ctx, note, duration);
        }
    }
    for note in visible.iter().rev() {
        match note.kind {
            NoteKind::Tap | NoteKind::Break | NoteKind::SimultaneousTap => {
                draw_tap(surface, &ctx, note)
            }
            NoteKind::Slide(_) => draw_slide_head(surface, &ctx, note),
            _ => {}
        }
    }
    for note in visible.iter().rev() {
        if matches!(note.kind, NoteKind::Touch | NoteKind::TouchHoldStart { .. }) {
            draw_touch(surface, &ctx, note);
        }
    }

    draw_tempo(surface, chart, playhead.beat, now_ms);
    draw_tallies(surface, &ctx);
    if config.show_fps {
        if let Some(fps) = stats.fps {
            draw_fps(surface, fps);
        }
    }
    annotations
}

/// Notes that can appear on screen at `now_ms`.
///
/// Notes are sorted by time, so everything arriving after the approach
/// window is cut off with a binary search.
fn visible_notes<'c>(chart: &'c Chart, approach: &Approach, now_ms: f64) -> Vec<&'c Note> {
    let notes = chart.notes();
    let horizon = notes.partition_point(|n| n.timing.ms <= now_ms + approach.window_ms());
    notes[..horizon]
        .iter()
        .filter(|n| !n.is_end_marker() && n.end_ms() + approach.fade_ms() >= now_ms)
        .collect()
}
