//! Radial layout of the eight buttons and the touch zones.
//!
//! Geometry is computed in "unit" space, where the judgment ring has radius
//! 1 and the centre is the origin, then mapped to the surface. Mirroring is
//! a reflection applied during that mapping, so button placement and the
//! handedness of every slide path change together.

use super::surface::Point;
pub use crate::geometry::{button_angle, unit_button};
use crate::chart::{Button, Position, TouchArea, TouchZone};
use crate::config::MirrorMode;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Ring radius as a fraction of the smaller surface dimension.
const RING_FRACTION: f64 = 0.42;

/// Note head radius relative to the ring radius.
const NOTE_FRACTION: f64 = 0.085;

/// Unit-space angle of the D/E zone with `index` (D1 is straight up).
fn edge_angle(index: u8) -> f64 {
    -FRAC_PI_2 + (index.saturating_sub(1)) as f64 * FRAC_PI_4
}

/// Unit-space centre of a touch zone.
pub fn unit_zone(zone: TouchZone) -> Point {
    let button_dir = Button::new(zone.index).map(button_angle).unwrap_or(0.0);
    match zone.area {
        TouchArea::A => Point::polar(0.8, button_dir),
        TouchArea::B => Point::polar(0.42, button_dir),
        TouchArea::C => Point::ORIGIN,
        TouchArea::D => Point::polar(0.85, edge_angle(zone.index)),
        TouchArea::E => Point::polar(0.58, edge_angle(zone.index)),
    }
}

/// Unit-space position of any note position.
pub fn unit_position(position: Position) -> Point {
    match position {
        Position::Button(b) => unit_button(b),
        Position::Touch(z) => unit_zone(z),
    }
}

/// Logical button a button lands on under `mode`.
pub fn mirror_button(button: Button, mode: MirrorMode) -> Button {
    let i = button.number() as i32;
    let mapped = match mode {
        MirrorMode::None => i,
        MirrorMode::Horizontal => 9 - i,
        MirrorMode::Vertical => (4 - i).rem_euclid(8) + 1,
        MirrorMode::Rotate180 => (i + 3).rem_euclid(8) + 1,
    };
    Button::new(mapped as u8).unwrap_or(button)
}

/// Logical zone a touch zone lands on under `mode`.
pub fn mirror_zone(zone: TouchZone, mode: MirrorMode) -> TouchZone {
    let i = zone.index as i32;
    let index = match zone.area {
        TouchArea::C => return zone,
        TouchArea::A | TouchArea::B => match Button::new(zone.index) {
            Some(b) => mirror_button(b, mode).number() as i32,
            None => i,
        },
        TouchArea::D | TouchArea::E => match mode {
            MirrorMode::None => i,
            MirrorMode::Horizontal => (1 - i).rem_euclid(8) + 1,
            MirrorMode::Vertical => (5 - i).rem_euclid(8) + 1,
            MirrorMode::Rotate180 => (i + 3).rem_euclid(8) + 1,
        },
    };
    TouchZone::new(zone.area, index as u8).unwrap_or(zone)
}

/// Applies the mirror reflection to a unit-space point.
pub fn reflect(point: Point, mode: MirrorMode) -> Point {
    match mode {
        MirrorMode::None => point,
        MirrorMode::Horizontal => Point::new(-point.x, point.y),
        MirrorMode::Vertical => Point::new(point.x, -point.y),
        MirrorMode::Rotate180 => -point,
    }
}

/// Placement of the ring on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialLayout {
    pub center: Point,
    /// Judgment ring radius in surface units.
    pub radius: f64,
    pub mirror: MirrorMode,
}

impl RadialLayout {
    /// Centres the ring on a surface of the given size.
    pub fn new(width: f64, height: f64, mirror: MirrorMode) -> Self {
        Self {
            center: Point::new(width / 2.0, height / 2.0),
            radius: width.min(height).max(0.0) * RING_FRACTION,
            mirror,
        }
    }

    /// Maps a unit-space point to the surface, mirroring it.
    pub fn to_screen(&self, unit: Point) -> Point {
        self.center + reflect(unit, self.mirror) * self.radius
    }

    /// Scales a unit-space length to surface units.
    pub fn scale(&self, unit_length: f64) -> f64 {
        unit_length * self.radius
    }

    /// Radius of a tap head.
    pub fn note_size(&self) -> f64 {
        self.radius * NOTE_FRACTION
    }

    pub fn button(&self, button: Button) -> Point {
        self.to_screen(unit_button(button))
    }

    pub fn zone(&self, zone: TouchZone) -> Point {
        self.to_screen(unit_zone(zone))
    }

    pub fn position(&self, position: Position) -> Point {
        self.to_screen(unit_position(position))
    }

    /// Point on a button's ray at `fraction` of the ring radius.
    pub fn along_ray(&self, button: Button, fraction: f64) -> Point {
        self.to_screen(unit_button(button) * fraction)
    }

    /// Screen-space unit vector pointing outward along a button's ray.
    pub fn ray_direction(&self, button: Button) -> Point {
        reflect(unit_button(button), self.mirror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [MirrorMode; 4] = [
        MirrorMode::None,
        MirrorMode::Horizontal,
        MirrorMode::Vertical,
        MirrorMode::Rotate180,
    ];

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_button_one_is_upper_right() {
        let p = unit_button(Button::new(1).unwrap());
        assert!(p.x > 0.0 && p.y < 0.0);
        let p5 = unit_button(Button::new(5).unwrap());
        assert!(close(p5, -p));
    }

    #[test]
    fn test_mirror_tables() {
        let b = |n| Button::new(n).unwrap();
        assert_eq!(mirror_button(b(1), MirrorMode::Horizontal), b(8));
        assert_eq!(mirror_button(b(1), MirrorMode::Vertical), b(4));
        assert_eq!(mirror_button(b(1), MirrorMode::Rotate180), b(5));
        assert_eq!(mirror_button(b(6), MirrorMode::Vertical), b(7));
    }

    #[test]
    fn test_reflection_matches_logical_mapping() {
        let layout = RadialLayout::new(200.0, 100.0, MirrorMode::None);
        for mode in MODES {
            let mirrored = RadialLayout { mirror: mode, ..layout };
            for n in 1..=8 {
                let button = Button::new(n).unwrap();
                let expected = layout.button(mirror_button(button, mode));
                assert!(close(mirrored.button(button), expected), "{mode:?} {n}");
            }
            for area in [TouchArea::A, TouchArea::B, TouchArea::D, TouchArea::E] {
                for i in 1..=8 {
                    let zone = TouchZone::new(area, i).unwrap();
                    let expected = layout.zone(mirror_zone(zone, mode));
                    assert!(close(mirrored.zone(zone), expected), "{mode:?} {zone}");
                }
            }
        }
    }

    #[test]
    fn test_layout_centres_ring() {
        let layout = RadialLayout::new(200.0, 100.0, MirrorMode::None);
        assert_eq!(layout.center, Point::new(100.0, 50.0));
        assert!((layout.radius - 42.0).abs() < 1e-9);
        assert!(close(layout.zone(TouchZone::center()), layout.center));
    }
}
