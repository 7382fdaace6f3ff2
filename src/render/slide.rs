//! Slide bodies, direction arrows and the travelling star.
//!
//! A slide's body appears together with its head. Once the star starts
//! moving, arrows are only drawn on the part of the chain it has not yet
//! travelled. Arrow positions are fixed along the chain's arc length so they
//! do not crawl as the star passes.

use super::approach::Phase;
use super::frame::FrameContext;
use super::layout::reflect;
use super::notes::{star_points, BREAK_STOPS, EACH_COLOR, RIM_COLOR, STAR_COLOR};
use crate::geometry::path::{PathGeometry, SampledPath, Shape};
use super::surface::{Color, Paint, Point, Stroke, Style, Surface};
use crate::chart::{Note, SlideNote};
use std::f64::consts::PI;

/// Unit-space distance between arrows.
pub const ARROW_SPACING: f64 = 0.16;

/// Unit-space half size of an arrow chevron.
const ARROW_SIZE: f64 = 0.05;

/// A chain segment ready for drawing.
struct Leg {
    geometry: PathGeometry,
    /// Sampled lanes (one, or three for a fan).
    lanes: Vec<SampledPath>,
    /// Chain arc length where this segment begins.
    offset: f64,
    length: f64,
    start_ms: f64,
    duration_ms: f64,
}

fn legs(slide: &SlideNote, move_start_ms: f64) -> Vec<Leg> {
    let mut offset = 0.0;
    let mut start_ms = move_start_ms;
    slide
        .segments
        .iter()
        .map(|seg| {
            let geometry = PathGeometry::resolve(seg.path, seg.start, seg.end);
            let lanes = (0..geometry.lanes()).map(|l| geometry.sample_lane(l)).collect();
            let leg = Leg {
                geometry,
                lanes,
                offset,
                length: seg.arc_length(),
                start_ms,
                duration_ms: seg.duration.ms,
            };
            offset += leg.length;
            start_ms += seg.duration.ms;
            leg
        })
        .collect()
}

/// Where the star is along a chain at `now_ms`.
///
/// # Returns
///
/// Index of the current segment and arc length travelled within it, or
/// `None` when the star has not started.
fn star_progress(legs: &[Leg], now_ms: f64) -> Option<(usize, f64)> {
    let first = legs.first()?;
    if now_ms < first.start_ms {
        return None;
    }
    for (i, leg) in legs.iter().enumerate() {
        let end = leg.start_ms + leg.duration_ms;
        if now_ms < end || i + 1 == legs.len() {
            let t = if leg.duration_ms > 0.0 {
                ((now_ms - leg.start_ms) / leg.duration_ms).clamp(0.0, 1.0)
            } else {
                1.0
            };
            return Some((i, t * leg.length));
        }
    }
    None
}

fn body_color(ctx: &FrameContext, note: &Note, slide: &SlideNote) -> Color {
    if slide.break_body && !ctx.config.normal_color_break_slide {
        BREAK_STOPS[1]
    } else if ctx.annotations.is_simultaneous(note.id) {
        EACH_COLOR
    } else {
        STAR_COLOR
    }
}

/// Draws a slide body and its travelling star.
pub fn draw_slide<S: Surface>(surface: &mut S, ctx: &FrameContext, note: &Note, slide: &SlideNote) {
    let head_ms = note.timing.ms;
    let move_start = head_ms + slide.delay.ms;
    let end_ms = move_start + slide.duration().ms;
    if ctx.now_ms > end_ms || head_ms - ctx.now_ms > ctx.approach.window_ms() {
        return;
    }

    let head_phase = ctx.approach.phase(head_ms, head_ms, ctx.now_ms);
    let alpha = match head_phase {
        Phase::Growing { .. } | Phase::Travelling { .. } => 0.25 + 0.5 * head_phase.completion(),
        _ => 1.0,
    };
    let color = body_color(ctx, note, slide).with_alpha(alpha);
    let legs = legs(slide, move_start);
    let progress = star_progress(&legs, ctx.now_ms);
    let travelled = progress
        .map(|(i, within)| legs[i].offset + within)
        .unwrap_or(0.0);

    let stroke = Stroke::new(color, ctx.layout.scale(0.012).max(1.0));
    for leg in &legs {
        draw_arrows(surface, ctx, leg, travelled, stroke);
    }
    draw_star(surface, ctx, note, &legs, progress, move_start, slide);
}

/// Stamps chevrons on the untravelled part of one segment.
fn draw_arrows<S: Surface>(
    surface: &mut S,
    ctx: &FrameContext,
    leg: &Leg,
    travelled: f64,
    stroke: Stroke,
) {
    let first = (leg.offset / ARROW_SPACING).floor() as i64;
    let last = ((leg.offset + leg.length) / ARROW_SPACING).ceil() as i64;
    for n in first..=last {
        let at = (n as f64 + 0.5) * ARROW_SPACING;
        if at < leg.offset || at >= leg.offset + leg.length || at <= travelled {
            continue;
        }
        let fraction = (at - leg.offset) / leg.length.max(f64::EPSILON);
        match leg.geometry.shape {
            Shape::Fan => {
                // One bar across the three lanes, widening toward the end.
                let points: Vec<Point> = leg
                    .lanes
                    .iter()
                    .map(|lane| ctx.layout.to_screen(lane.at_fraction(fraction).0))
                    .collect();
                surface.polyline(&points, stroke);
            }
            _ => {
                if let Some(lane) = leg.lanes.first() {
                    let (point, tangent) = lane.at_fraction(fraction);
                    surface.polyline(&chevron(ctx, point, tangent), stroke);
                }
            }
        }
    }
}

/// Arrow chevron pointing along `tangent`, in screen space.
fn chevron(ctx: &FrameContext, unit_point: Point, unit_tangent: Point) -> Vec<Point> {
    let tip = ctx.layout.to_screen(unit_point);
    let dir = reflect(unit_tangent, ctx.layout.mirror).normalized();
    let side = dir.perpendicular();
    let size = ctx.layout.scale(ARROW_SIZE);
    vec![
        tip - dir * size + side * size,
        tip,
        tip - dir * size - side * size,
    ]
}

/// Draws the star: fading in at the start button during the delay, then
/// following the chain.
fn draw_star<S: Surface>(
    surface: &mut S,
    ctx: &FrameContext,
    note: &Note,
    legs: &[Leg],
    progress: Option<(usize, f64)>,
    move_start: f64,
    slide: &SlideNote,
) {
    let head_ms = note.timing.ms;
    if ctx.now_ms < head_ms {
        return;
    }
    let (point, tangent, alpha) = match progress {
        Some((i, within)) => {
            let leg = &legs[i];
            let lane = leg.lanes.get(leg.lanes.len() / 2);
            let (p, t) = lane
                .map(|l| l.at_fraction(within / leg.length.max(f64::EPSILON)))
                .unwrap_or((leg.geometry.point_at(0.0), Point::new(1.0, 0.0)));
            (p, t, 1.0)
        }
        None => {
            let Some(leg) = legs.first() else { return };
            let delay = (move_start - head_ms).max(f64::EPSILON);
            let t = leg.geometry.point_at(0.01) - leg.geometry.point_at(0.0);
            (
                leg.geometry.point_at(0.0),
                t,
                ((ctx.now_ms - head_ms) / delay).clamp(0.0, 1.0),
            )
        }
    };

    let center = ctx.layout.to_screen(point);
    let heading = reflect(tangent, ctx.layout.mirror).angle();
    let rotation = if ctx.config.slide_rotation {
        ctx.now_ms / 1000.0 * PI
    } else {
        heading + PI / 2.0
    };
    let size = ctx.layout.note_size() * 1.1;
    let color = body_color(ctx, note, slide);
    surface.polygon(
        &star_points(center, size, rotation),
        Style::fill(Paint::Solid(color.with_alpha(alpha)))
            .with_stroke(Stroke::new(RIM_COLOR.with_alpha(alpha), size * 0.12)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{parse, Chart};
    use crate::config::Config;
    use crate::render::annotate::annotate;
    use crate::render::approach::Approach;
    use crate::render::layout::RadialLayout;
    use crate::render::surface::{DisplayList, DrawCommand};

    fn render_at(chart: &Chart, config: &Config, now: f64) -> DisplayList {
        let approach = Approach::new(config.hi_speed);
        let annotations = annotate(chart, now, &approach);
        let ctx = FrameContext {
            layout: RadialLayout::new(400.0, 400.0, config.mirror_mode),
            approach,
            config,
            annotations: &annotations,
            now_ms: now,
        };
        let mut list = DisplayList::new(400.0, 400.0);
        let note = &chart.notes()[0];
        if let Some(slide) = note.slide() {
            draw_slide(&mut list, &ctx, note, slide);
        }
        list
    }

    fn arrow_count(list: &DisplayList) -> usize {
        list.commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
            .count()
    }

    #[test]
    fn test_arrows_only_on_untravelled_part() {
        // 1-5: delay 500ms, travel 500ms, length 2 (12 arrows)
        let chart = parse("(120)1-5[4:1],", None).unwrap();
        let config = Config::default();
        let head = chart.notes()[0].timing.ms;
        let before = arrow_count(&render_at(&chart, &config, head));
        let halfway = arrow_count(&render_at(&chart, &config, head + 750.0));
        assert_eq!(before, (2.0 / ARROW_SPACING).floor() as usize);
        assert!(halfway < before && halfway > 0);
        assert!(render_at(&chart, &config, head + 1001.0).is_empty());
    }

    #[test]
    fn test_star_follows_chain() {
        let chart = parse("(120)1-5[4:1],", None).unwrap();
        let config = Config {
            slide_rotation: false,
            ..Default::default()
        };
        let head = chart.notes()[0].timing.ms;
        let list = render_at(&chart, &config, head + 750.0);
        let star = list
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::Polygon { points, .. } if points.len() == 10 => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        let center = star.iter().fold(Point::ORIGIN, |acc, p| acc + *p) * 0.1;
        // halfway along a diameter is the ring centre
        assert!(center.distance(Point::new(200.0, 200.0)) < 1.0);
    }

    #[test]
    fn test_star_waits_during_delay() {
        let chart = parse("(120)1-5[4:1],", None).unwrap();
        let config = Config::default();
        let head = chart.notes()[0].timing.ms;
        let slide = chart.notes()[0].slide().unwrap();
        let legs = legs(slide, head + slide.delay.ms);
        assert_eq!(star_progress(&legs, head + 100.0), None);
        let (i, within) = star_progress(&legs, head + 750.0).unwrap();
        assert_eq!(i, 0);
        assert!((within - 1.0).abs() < 1e-6);
        let list = render_at(&chart, &config, head + 250.0);
        assert!(list
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCommand::Polygon { points, .. } if points.len() == 10)));
    }

    #[test]
    fn test_chain_progress_crosses_segments() {
        let chart = parse("(120)1-4[4:1]-7[4:1],", None).unwrap();
        let head = chart.notes()[0].timing.ms;
        let slide = chart.notes()[0].slide().unwrap();
        let move_start = head + slide.delay.ms;
        let legs = legs(slide, move_start);
        assert_eq!(legs.len(), 2);
        assert!((legs[1].offset - legs[0].length).abs() < 1e-9);
        let (i, _) = star_progress(&legs, move_start + 600.0).unwrap();
        assert_eq!(i, 1);
    }

    #[test]
    fn test_break_slide_colour_option() {
        let chart = parse("(120)1-5[4:1]b,", None).unwrap();
        let head = chart.notes()[0].timing.ms;
        let stroke_color = |config: &Config| {
            render_at(&chart, config, head)
                .commands()
                .iter()
                .find_map(|c| match c {
                    DrawCommand::Polyline { stroke, .. } => Some(stroke.color),
                    _ => None,
                })
                .unwrap()
        };
        let normal = Config {
            normal_color_break_slide: true,
            ..Default::default()
        };
        assert_eq!(stroke_color(&Config::default()), BREAK_STOPS[1]);
        assert_eq!(stroke_color(&normal), STAR_COLOR);
    }

    #[test]
    fn test_mirrored_arc_length_is_unchanged() {
        let chart = parse("(120)1>4[4:1],", None).unwrap();
        let base = Config::default();
        let mirrored = Config {
            mirror_mode: crate::config::MirrorMode::Horizontal,
            ..Default::default()
        };
        let head = chart.notes()[0].timing.ms;
        assert_eq!(
            arrow_count(&render_at(&chart, &base, head)),
            arrow_count(&render_at(&chart, &mirrored, head))
        );
    }
}
