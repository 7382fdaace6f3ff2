//! Draw procedures for taps, holds, slide heads and touches.
//!
//! Every procedure reads the chart, the frame context and the per-frame
//! annotations, and only ever writes to the surface.

use super::approach::Phase;
use super::frame::FrameContext;
use super::surface::{Color, Paint, Point, Stroke, Style, Surface};
use crate::chart::{Button, Note, NoteKind, Position, Span};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

pub const BACKGROUND: Color = Color::rgb(14, 14, 22);
pub const TAP_COLOR: Color = Color::rgb(255, 105, 180);
pub const EACH_COLOR: Color = Color::rgb(255, 205, 50);
pub const STAR_COLOR: Color = Color::rgb(70, 170, 255);
pub const TOUCH_COLOR: Color = Color::rgb(40, 150, 255);
pub const EX_COLOR: Color = Color::rgb(255, 255, 255);
pub const RIM_COLOR: Color = Color::rgb(240, 240, 250);
pub const BREAK_STOPS: [Color; 3] = [
    Color::rgb(255, 245, 170),
    Color::rgb(255, 150, 30),
    Color::rgb(215, 65, 0),
];
const TOUCH_HOLD_COLORS: [Color; 4] = [
    Color::rgb(255, 80, 90),
    Color::rgb(255, 200, 40),
    Color::rgb(60, 205, 100),
    Color::rgb(60, 140, 255),
];

/// How long a firework burst lasts after a touch resolves.
const FIREWORK_MS: f64 = 450.0;

/// Fill for a note head, by priority: break, simultaneous, base colour.
pub fn head_paint(ctx: &FrameContext, note: &Note, base: Color) -> Paint {
    if note.is_break() {
        // Alternate breaks shimmer out of phase.
        let odd = ctx.annotations.break_index(note.id).unwrap_or(0) % 2 == 1;
        let wave = ((ctx.now_ms / 120.0) + if odd { PI } else { 0.0 }).sin() * 0.5 + 0.5;
        let [inner, middle, outer] = BREAK_STOPS;
        Paint::Radial([inner, middle.mix(inner, wave * 0.3), outer])
    } else if ctx.annotations.is_simultaneous(note.id) {
        Paint::Solid(EACH_COLOR)
    } else {
        Paint::Solid(base)
    }
}

/// Five-pointed star outline.
pub fn star_points(center: Point, radius: f64, rotation: f64) -> Vec<Point> {
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { radius } else { radius * 0.45 };
            center + Point::polar(r, rotation - FRAC_PI_2 + i as f64 * PI / 5.0)
        })
        .collect()
}

/// Regular hexagon outline, flat sides left and right.
fn hexagon_points(center: Point, radius: f64) -> Vec<Point> {
    (0..6)
        .map(|i| center + Point::polar(radius, i as f64 * PI / 3.0 + PI / 6.0))
        .collect()
}

/// Draws a tap or break note.
pub fn draw_tap<S: Surface>(surface: &mut S, ctx: &FrameContext, note: &Note) {
    let Some(button) = note.button() else { return };
    let phase = ctx.approach.phase(note.timing.ms, note.timing.ms, ctx.now_ms);
    let Some(place) = phase.placement() else { return };

    let center = ctx.layout.along_ray(button, place.radius);
    let size = ctx.layout.note_size() * place.scale;
    let paint = head_paint(ctx, note, TAP_COLOR).with_alpha(place.alpha);

    if note.flags.star {
        let spin = if ctx.config.slide_rotation {
            ctx.now_ms / 1000.0 * PI
        } else {
            0.0
        };
        let outline = Stroke::new(RIM_COLOR.with_alpha(place.alpha), size * 0.15);
        surface.polygon(
            &star_points(center, size * 1.2, spin),
            Style::fill(paint).with_stroke(outline),
        );
    } else {
        let rim = Stroke::new(RIM_COLOR.with_alpha(place.alpha), size * 0.22);
        surface.circle(center, size, Style::fill(paint).with_stroke(rim));
        surface.circle(
            center,
            size * 0.5,
            Style::fill(Paint::Solid(BACKGROUND.with_alpha(place.alpha))),
        );
    }
    draw_ex_cover(surface, ctx, note, center, size * 1.4, place.alpha);
}

/// Protective cover for EX notes: a ring around round heads, a hexagon
/// around stars.
fn draw_ex_cover<S: Surface>(
    surface: &mut S,
    ctx: &FrameContext,
    note: &Note,
    center: Point,
    radius: f64,
    alpha: f64,
) {
    if !(note.flags.ex && ctx.config.highlight_ex_notes) {
        return;
    }
    let stroke = Stroke::new(EX_COLOR.with_alpha(alpha * 0.8), radius * 0.12);
    if note.flags.star {
        surface.polygon(&hexagon_points(center, radius), Style::stroke(stroke));
    } else {
        surface.circle(center, radius, Style::stroke(stroke));
    }
}

/// Draws the star head of a slide while it approaches.
pub fn draw_slide_head<S: Surface>(surface: &mut S, ctx: &FrameContext, note: &Note) {
    if note.flags.no_head {
        return;
    }
    let Some(button) = note.button() else { return };
    let phase = ctx.approach.phase(note.timing.ms, note.timing.ms, ctx.now_ms);
    let Some(place) = phase.placement() else { return };

    let base = if ctx.config.pink_slide_start {
        TAP_COLOR
    } else {
        STAR_COLOR
    };
    let center = ctx.layout.along_ray(button, place.radius);
    let size = ctx.layout.note_size() * place.scale * 1.25;
    let spin = if ctx.config.slide_rotation {
        ctx.now_ms / 1000.0 * PI
    } else {
        0.0
    };
    let paint = head_paint(ctx, note, base).with_alpha(place.alpha);
    let rim = Stroke::new(RIM_COLOR.with_alpha(place.alpha), size * 0.12);
    surface.polygon(&star_points(center, size, spin), Style::fill(paint).with_stroke(rim));
    draw_ex_cover(surface, ctx, note, center, size * 1.2, place.alpha);
}

/// Draws a hold as an elongated hexagon between its head and tail.
pub fn draw_hold<S: Surface>(surface: &mut S, ctx: &FrameContext, note: &Note, duration: Span) {
    let Some(button) = note.button() else { return };
    let arrival = note.timing.ms;
    let release = arrival + duration.ms;
    let phase = ctx.approach.phase(arrival, release, ctx.now_ms);
    let Some(place) = phase.placement() else { return };

    let head_r = place.radius.min(1.0);
    let tail_r = match phase {
        Phase::Fading { .. } => head_r,
        _ => ctx.approach.radius_toward(release, ctx.now_ms).min(head_r),
    };
    let width = ctx.layout.note_size() * place.scale;
    let tail_width = match phase {
        Phase::Holding if duration.ms > 0.0 => {
            let remaining = ((release - ctx.now_ms) / duration.ms).clamp(0.0, 1.0);
            width * (0.4 + 0.6 * remaining)
        }
        _ => width,
    };

    let outer = hold_outline(ctx, button, head_r, tail_r, width, tail_width);
    let paint = head_paint(ctx, note, TAP_COLOR).with_alpha(place.alpha);
    let rim = Stroke::new(RIM_COLOR.with_alpha(place.alpha), width * 0.2);
    surface.polygon(&outer, Style::fill(paint).with_stroke(rim));

    let hole = hold_outline(ctx, button, head_r, tail_r, width * 0.5, tail_width * 0.5);
    surface.polygon(&hole, Style::fill(Paint::Solid(BACKGROUND.with_alpha(place.alpha))));

    if note.flags.ex && ctx.config.highlight_ex_notes {
        let cover = hold_outline(ctx, button, head_r, tail_r, width * 1.35, tail_width * 1.35);
        let stroke = Stroke::new(EX_COLOR.with_alpha(place.alpha * 0.8), width * 0.15);
        surface.polygon(&cover, Style::stroke(stroke));
    }
}

/// Hexagon stretched along a button's ray from `tail_r` to `head_r`.
fn hold_outline(
    ctx: &FrameContext,
    button: Button,
    head_r: f64,
    tail_r: f64,
    width: f64,
    tail_width: f64,
) -> Vec<Point> {
    let axis = ctx.layout.ray_direction(button);
    let side = axis.perpendicular();
    let head = ctx.layout.along_ray(button, head_r);
    let tail = ctx.layout.along_ray(button, tail_r);
    vec![
        tail - axis * tail_width,
        tail + side * tail_width,
        head + side * width,
        head + axis * width,
        head - side * width,
        tail - side * tail_width,
    ]
}

/// Draws a touch or touch hold as four petals closing on the zone.
pub fn draw_touch<S: Surface>(surface: &mut S, ctx: &FrameContext, note: &Note) {
    let Position::Touch(zone) = note.position else { return };
    let duration = match note.kind {
        NoteKind::TouchHoldStart { duration } => Some(duration),
        _ => None,
    };
    let arrival = note.timing.ms;
    let release = arrival + duration.map(|d| d.ms).unwrap_or(0.0);
    let center = ctx.layout.zone(zone);
    let size = ctx.layout.note_size() * 0.8;

    if note.flags.firework {
        draw_firework(surface, ctx, center, size, release);
    }

    let phase = ctx.approach.phase(arrival, release, ctx.now_ms);
    let Some(place) = phase.placement() else { return };
    let closing = match phase {
        Phase::Growing { .. } => 0.0,
        Phase::Travelling { progress } => progress,
        _ => 1.0,
    };
    let petal = size * place.scale;
    let spread = petal * (0.35 + 2.0 * (1.0 - closing));

    for k in 0..4 {
        let dir = Point::polar(1.0, k as f64 * FRAC_PI_2 - FRAC_PI_2);
        let side = dir.perpendicular();
        let tip = center + dir * spread;
        let base = center + dir * (spread + petal);
        let color = match duration {
            Some(_) => TOUCH_HOLD_COLORS[k],
            None if ctx.annotations.is_simultaneous(note.id) => EACH_COLOR,
            None => TOUCH_COLOR,
        };
        let paint = Paint::Solid(color.with_alpha(place.alpha));
        let rim = Stroke::new(RIM_COLOR.with_alpha(place.alpha), petal * 0.12);
        surface.polygon(
            &[tip, base + side * (petal * 0.9), base - side * (petal * 0.9)],
            Style::fill(paint).with_stroke(rim),
        );
    }
    surface.circle(
        center,
        petal * 0.25,
        Style::fill(Paint::Solid(RIM_COLOR.with_alpha(place.alpha))),
    );

    if let (Some(duration), Phase::Holding) = (duration, phase) {
        if duration.ms > 0.0 {
            let progress = ((ctx.now_ms - arrival) / duration.ms).clamp(0.0, 1.0);
            draw_progress_ring(surface, center, petal * 2.6, progress, petal * 0.2);
        }
    }

    if ctx.annotations.visible_touches(note.id) >= 2 {
        let half = petal * 3.2;
        let stroke = Stroke::new(EACH_COLOR.with_alpha(place.alpha), petal * 0.12);
        surface.polygon(
            &[
                center + Point::new(-half, -half),
                center + Point::new(half, -half),
                center + Point::new(half, half),
                center + Point::new(-half, half),
            ],
            Style::stroke(stroke),
        );
    }
}

/// Clockwise ring from the top covering `progress` of a full turn.
fn draw_progress_ring<S: Surface>(
    surface: &mut S,
    center: Point,
    radius: f64,
    progress: f64,
    width: f64,
) {
    let steps = ((48.0 * progress).ceil() as usize).max(1);
    let points: Vec<Point> = (0..=steps)
        .map(|i| {
            let a = -FRAC_PI_2 + TAU * progress * i as f64 / steps as f64;
            center + Point::polar(radius, a)
        })
        .collect();
    surface.polyline(&points, Stroke::new(RIM_COLOR, width));
}

/// Expanding burst after a firework touch resolves.
fn draw_firework<S: Surface>(
    surface: &mut S,
    ctx: &FrameContext,
    center: Point,
    size: f64,
    resolve_ms: f64,
) {
    let since = ctx.now_ms - resolve_ms;
    if !(0.0..FIREWORK_MS).contains(&since) {
        return;
    }
    let t = since / FIREWORK_MS;
    let color = BREAK_STOPS[1].with_alpha(1.0 - t);
    surface.circle(
        center,
        size * (1.0 + 6.0 * t),
        Style::stroke(Stroke::new(color, size * 0.3 * (1.0 - t) + 0.5)),
    );
    for k in 0..8 {
        let dir = Point::polar(1.0, k as f64 * TAU / 8.0);
        let from = center + dir * (size * (1.0 + 4.0 * t));
        let to = center + dir * (size * (1.6 + 6.5 * t));
        surface.polyline(&[from, to], Stroke::new(BREAK_STOPS[0].with_alpha(1.0 - t), 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse;
    use crate::config::Config;
    use crate::render::annotate::annotate;
    use crate::render::approach::Approach;
    use crate::render::layout::RadialLayout;
    use crate::render::surface::{DisplayList, DrawCommand};

    fn with_ctx(config: &Config, text: &str, now_offset: f64, f: impl FnOnce(&FrameContext, &[Note], &mut DisplayList)) {
        let chart = parse(text, None).unwrap();
        let now = chart.notes()[0].timing.ms + now_offset;
        let approach = Approach::new(config.hi_speed);
        let annotations = annotate(&chart, now, &approach);
        let ctx = FrameContext {
            layout: RadialLayout::new(400.0, 400.0, config.mirror_mode),
            approach,
            config,
            annotations: &annotations,
            now_ms: now,
        };
        let mut list = DisplayList::new(400.0, 400.0);
        f(&ctx, chart.notes(), &mut list);
    }

    fn first_fill(list: &DisplayList) -> Option<Paint> {
        list.commands().iter().find_map(|c| match c {
            DrawCommand::Circle { style, .. } | DrawCommand::Polygon { style, .. } => style.fill,
            _ => None,
        })
    }

    #[test]
    fn test_tap_hidden_before_window() {
        let config = Config::default();
        with_ctx(&config, "(120)1,", -5000.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert!(list.is_empty());
        });
    }

    #[test]
    fn test_tap_colours() {
        let config = Config::default();
        with_ctx(&config, "(120)1,", -100.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert_eq!(first_fill(list), Some(Paint::Solid(TAP_COLOR)));
        });
        with_ctx(&config, "(120)1/5,", -100.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert_eq!(first_fill(list), Some(Paint::Solid(EACH_COLOR)));
        });
        with_ctx(&config, "(120)1b,", -100.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert!(matches!(first_fill(list), Some(Paint::Radial(_))));
        });
    }

    #[test]
    fn test_ex_cover_follows_config() {
        let mut config = Config::default();
        with_ctx(&config, "(120)1x,", -100.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert_eq!(list.len(), 3);
        });
        config.highlight_ex_notes = false;
        with_ctx(&config, "(120)1x,", -100.0, |ctx, notes, list| {
            draw_tap(list, ctx, &notes[0]);
            assert_eq!(list.len(), 2);
        });
    }

    #[test]
    fn test_hold_has_hole_and_stays_on_ring() {
        let config = Config::default();
        with_ctx(&config, "(120)1h[1:1],", 500.0, |ctx, notes, list| {
            let NoteKind::HoldStart { duration } = notes[0].kind else {
                panic!("expected hold");
            };
            draw_hold(list, ctx, &notes[0], duration);
            assert_eq!(list.len(), 2);
            let DrawCommand::Polygon { points, .. } = &list.commands()[0] else {
                panic!("expected polygon");
            };
            // head tip sits just outside the ring on button 1's ray
            let head_tip = points[3];
            let ring = ctx.layout.radius;
            let dist = head_tip.distance(ctx.layout.center);
            assert!((dist - ring - ctx.layout.note_size()).abs() < 1e-6);
        });
    }

    #[test]
    fn test_touch_overlap_box() {
        let config = Config::default();
        with_ctx(&config, "(120){8}B1,B1,", -100.0, |ctx, notes, list| {
            draw_touch(list, ctx, &notes[0]);
            let boxes = list
                .commands()
                .iter()
                .filter(|c| matches!(c, DrawCommand::Polygon { points, style } if points.len() == 4 && style.fill.is_none()))
                .count();
            assert_eq!(boxes, 1);
        });
    }

    #[test]
    fn test_touch_with_tap_uses_each_colour() {
        let config = Config::default();
        let petal_rgb = |text: &str| {
            let mut rgb = None;
            with_ctx(&config, text, -100.0, |ctx, notes, list| {
                let touch = notes
                    .iter()
                    .find(|n| matches!(n.kind, NoteKind::Touch))
                    .unwrap();
                draw_touch(list, ctx, touch);
                if let Some(Paint::Solid(c)) = first_fill(list) {
                    rgb = Some((c.r, c.g, c.b));
                }
            });
            rgb
        };
        let rgb = |c: Color| Some((c.r, c.g, c.b));
        assert_eq!(petal_rgb("(120)C,"), rgb(TOUCH_COLOR));
        assert_eq!(petal_rgb("(120)1/C,"), rgb(EACH_COLOR));
    }

    #[test]
    fn test_touch_petals_close_in() {
        let config = Config::default();
        let petal_tip = |offset: f64| {
            let mut dist = 0.0;
            with_ctx(&config, "(120)C,", offset, |ctx, notes, list| {
                draw_touch(list, ctx, &notes[0]);
                if let DrawCommand::Polygon { points, .. } = &list.commands()[0] {
                    dist = points[0].distance(ctx.layout.center);
                }
            });
            dist
        };
        assert!(petal_tip(-300.0) > petal_tip(-50.0));
    }

    #[test]
    fn test_star_outline_has_ten_points() {
        let pts = star_points(Point::ORIGIN, 10.0, 0.0);
        assert_eq!(pts.len(), 10);
        assert!((pts[0].length() - 10.0).abs() < 1e-9);
        assert!((pts[1].length() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_hexagon_points() {
        let pts = hexagon_points(Point::ORIGIN, 2.0);
        assert_eq!(pts.len(), 6);
        assert!(pts.iter().all(|p| (p.length() - 2.0).abs() < 1e-9));
    }
}
