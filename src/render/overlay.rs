//! Judgment line and text overlays.

use super::frame::FrameContext;
use super::layout::{unit_button, unit_zone};
use super::notes::{EACH_COLOR, RIM_COLOR};
use super::surface::{Color, Paint, Point, Stroke, Style, Surface, TextAlign};
use crate::chart::{BpmEvent, Button, Chart, TouchArea, TouchZone};
use crate::config::JudgmentLineDesign;
use crate::timeline::tempo;
use std::f64::consts::TAU;

pub const TEXT_COLOR: Color = Color::rgb(220, 220, 230);
pub const TEMPO_UP_COLOR: Color = Color::rgb(90, 230, 110);
pub const TEMPO_DOWN_COLOR: Color = Color::rgb(240, 80, 80);

/// How long the tempo readout stays coloured after a change.
pub const TEMPO_FLASH_MS: f64 = 500.0;

const LINE_COLOR: Color = Color::rgb(150, 150, 170);
const SENSOR_COLOR: Color = Color::rgb(70, 70, 95);
const LABEL_RADIUS: f64 = 1.13;

/// Draws the judgment ring in the configured design.
pub fn draw_judgment_line<S: Surface>(surface: &mut S, ctx: &FrameContext) {
    let design = ctx.config.judgment_line_design;
    if design == JudgmentLineDesign::Blind {
        return;
    }
    let layout = &ctx.layout;

    if design == JudgmentLineDesign::Sensor {
        draw_sensors(surface, ctx);
    }
    if matches!(design, JudgmentLineDesign::Simple | JudgmentLineDesign::Sensor) {
        let ring: Vec<Point> = (0..=96)
            .map(|i| layout.center + Point::polar(layout.radius, TAU * i as f64 / 96.0))
            .collect();
        surface.polyline(&ring, Stroke::new(LINE_COLOR, layout.scale(0.01).max(1.0)));
    }

    for number in 1..=8u8 {
        let Some(button) = Button::new(number) else { continue };
        surface.circle(
            layout.button(button),
            layout.note_size() * 0.3,
            Style::fill(Paint::Solid(RIM_COLOR)),
        );
        if design != JudgmentLineDesign::NoLine {
            // Labels name the physical button, so they ignore mirroring.
            let at = layout.center + unit_button(button) * (layout.radius * LABEL_RADIUS);
            surface.text(at, &number.to_string(), LINE_COLOR, TextAlign::Center);
        }
    }
}

fn draw_sensors<S: Surface>(surface: &mut S, ctx: &FrameContext) {
    let layout = &ctx.layout;
    let stroke = Stroke::new(SENSOR_COLOR, 1.0);
    let mut zones = vec![Some(TouchZone::center())];
    for area in [TouchArea::A, TouchArea::B, TouchArea::D, TouchArea::E] {
        zones.extend((1..=8).map(|i| TouchZone::new(area, i)));
    }
    for zone in zones.into_iter().flatten() {
        let radius = match zone.area {
            TouchArea::C => 0.2,
            TouchArea::B | TouchArea::E => 0.13,
            TouchArea::A | TouchArea::D => 0.11,
        };
        let center = layout.center + unit_zone(zone) * layout.radius;
        surface.circle(center, layout.scale(radius), Style::stroke(stroke));
    }
}

/// Colour of the tempo readout at `beat`.
///
/// # Returns
///
/// [`TEMPO_UP_COLOR`] or [`TEMPO_DOWN_COLOR`] within [`TEMPO_FLASH_MS`] of a
/// tempo change, otherwise [`TEXT_COLOR`].
pub fn tempo_color(chart: &Chart, beat: f64, now_ms: f64) -> Color {
    let events = chart.bpm_events();
    let idx = events.partition_point(|e| e.beat <= beat + 1e-9);
    let (Some(current), Some(previous)) = (
        idx.checked_sub(1).and_then(|i| events.get(i)),
        idx.checked_sub(2).and_then(|i| events.get(i)),
    ) else {
        return TEXT_COLOR;
    };
    let since = now_ms - event_ms(chart, current);
    if since < 0.0 || since >= TEMPO_FLASH_MS || current.bpm == previous.bpm {
        TEXT_COLOR
    } else if current.bpm > previous.bpm {
        TEMPO_UP_COLOR
    } else {
        TEMPO_DOWN_COLOR
    }
}

fn event_ms(chart: &Chart, event: &BpmEvent) -> f64 {
    tempo::beats_to_ms(event.beat, chart.bpm_events(), chart.base_bpm())
}

/// Formats a BPM without a trailing `.0` for whole values.
pub fn format_bpm(bpm: f64) -> String {
    if (bpm - bpm.round()).abs() < 1e-6 {
        format!("{}", bpm.round() as i64)
    } else {
        format!("{:.2}", bpm)
    }
}

/// Tempo readout in the top left corner.
pub fn draw_tempo<S: Surface>(surface: &mut S, chart: &Chart, beat: f64, now_ms: f64) {
    let bpm = tempo::bpm_at(beat, chart.bpm_events(), chart.base_bpm());
    surface.text(
        Point::new(2.0, 2.0),
        &format!("BPM {}", format_bpm(bpm)),
        tempo_color(chart, beat, now_ms),
        TextAlign::Left,
    );
}

/// Note and break tallies in the top right corner.
pub fn draw_tallies<S: Surface>(surface: &mut S, ctx: &FrameContext) {
    let (width, _) = surface.size();
    let tally = ctx.annotations.tally;
    surface.text(
        Point::new(width - 2.0, 2.0),
        &format!("NOTE {}/{}", tally.resolved_notes, tally.total_notes),
        TEXT_COLOR,
        TextAlign::Right,
    );
    if tally.total_breaks > 0 {
        surface.text(
            Point::new(width - 2.0, 14.0),
            &format!("BREAK {}/{}", tally.resolved_breaks, tally.total_breaks),
            EACH_COLOR,
            TextAlign::Right,
        );
    }
}

/// Frame-rate readout in the bottom left corner.
pub fn draw_fps<S: Surface>(surface: &mut S, fps: u32) {
    let (_, height) = surface.size();
    surface.text(
        Point::new(2.0, height - 12.0),
        &format!("{} FPS", fps),
        TEXT_COLOR,
        TextAlign::Left,
    );
}
