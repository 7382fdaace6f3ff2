//! Parametric slide paths.
//!
//! Each of the twelve notation primitives resolves to a [`PathGeometry`]
//! in unit space (ring radius 1, centre at the origin) with an absolute
//! rotation direction. Most shapes have no closed-form arc length, so
//! lengths and arc-length positions come from a sampled polyline.

use super::{button_angle, unit_button, Point};
use crate::chart::{Button, SlidePath};
use std::f64::consts::{PI, TAU};

/// Segments in the polyline used for arc-length measurement.
pub const ARC_SAMPLES: usize = 50;

/// Radius of the inner circle that spirals wrap around.
const SPIRAL_RADIUS: f64 = 0.45;

/// Fraction of a spiral spent moving between the ring and the inner circle.
const SPIRAL_RAMP: f64 = 0.2;

/// Distance of S/Z bend control points from the centre.
const BEND_CONTROL: f64 = 0.7;

/// Direction of travel around the centre on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    fn sign(self) -> f64 {
        match self {
            Rotation::Clockwise => 1.0,
            Rotation::CounterClockwise => -1.0,
        }
    }
}

/// Shape family of a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Line,
    /// Along the ring.
    Arc,
    /// Straight to the centre, then straight out.
    ThroughCenter,
    /// Cubic S/Z curve through the centre.
    Bend,
    /// Around the inner circle; `laps` extra full turns.
    Spiral { laps: u8 },
    /// Three straight lanes fanning out to the far side.
    Fan,
}

/// A slide primitive with its endpoints and absolute direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathGeometry {
    pub shape: Shape,
    pub rotation: Rotation,
    pub start: Button,
    pub end: Button,
}

impl PathGeometry {
    /// Resolves a notation primitive between two buttons.
    ///
    /// `<` and `>` are relative to the start button: on the upper half of
    /// the ring `>` runs clockwise, on the lower half counter-clockwise.
    /// `^` takes the shorter way round.
    pub fn resolve(path: SlidePath, start: Button, end: Button) -> Self {
        let upper = start.is_upper_half();
        let (shape, rotation) = match path {
            SlidePath::Straight => (Shape::Line, Rotation::Clockwise),
            SlidePath::ArcRight if upper => (Shape::Arc, Rotation::Clockwise),
            SlidePath::ArcRight => (Shape::Arc, Rotation::CounterClockwise),
            SlidePath::ArcLeft if upper => (Shape::Arc, Rotation::CounterClockwise),
            SlidePath::ArcLeft => (Shape::Arc, Rotation::Clockwise),
            SlidePath::ShortArc => {
                let rotation = if start.clockwise_distance(end) <= 4 {
                    Rotation::Clockwise
                } else {
                    Rotation::CounterClockwise
                };
                (Shape::Arc, rotation)
            }
            SlidePath::ThroughCenter => (Shape::ThroughCenter, Rotation::Clockwise),
            SlidePath::BendS => (Shape::Bend, Rotation::CounterClockwise),
            SlidePath::BendZ => (Shape::Bend, Rotation::Clockwise),
            SlidePath::SpiralP => (Shape::Spiral { laps: 0 }, Rotation::CounterClockwise),
            SlidePath::SpiralQ => (Shape::Spiral { laps: 0 }, Rotation::Clockwise),
            SlidePath::DoubleSpiralP => (Shape::Spiral { laps: 1 }, Rotation::CounterClockwise),
            SlidePath::DoubleSpiralQ => (Shape::Spiral { laps: 1 }, Rotation::Clockwise),
            SlidePath::Wifi => (Shape::Fan, Rotation::Clockwise),
        };
        Self {
            shape,
            rotation,
            start,
            end,
        }
    }

    /// Number of parallel lanes (three for the fan, otherwise one).
    pub fn lanes(&self) -> usize {
        match self.shape {
            Shape::Fan => 3,
            _ => 1,
        }
    }

    /// Point on the main lane at parameter `t` in [0, 1].
    pub fn point_at(&self, t: f64) -> Point {
        self.lane_point_at(self.lanes() / 2, t)
    }

    /// Point on lane `lane` at parameter `t` in [0, 1].
    pub fn lane_point_at(&self, lane: usize, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let from = unit_button(self.start);
        let to = unit_button(self.end);
        match self.shape {
            Shape::Line => from.lerp(to, t),
            Shape::Arc => {
                let a0 = button_angle(self.start);
                Point::polar(1.0, a0 + self.arc_sweep() * t)
            }
            Shape::ThroughCenter => {
                if t < 0.5 {
                    from.lerp(Point::ORIGIN, t * 2.0)
                } else {
                    Point::ORIGIN.lerp(to, t * 2.0 - 1.0)
                }
            }
            Shape::Bend => {
                let side = self.rotation.sign() * PI / 2.0;
                let c1 = Point::polar(BEND_CONTROL, button_angle(self.start) + side);
                let c2 = Point::polar(BEND_CONTROL, button_angle(self.end) + side);
                cubic(from, c1, c2, to, t)
            }
            Shape::Spiral { laps } => self.spiral_point(laps, t),
            Shape::Fan => {
                let target = match lane {
                    0 => unit_button(self.end.offset(-1)),
                    2 => unit_button(self.end.offset(1)),
                    _ => to,
                };
                from.lerp(target, t)
            }
        }
    }

    /// Signed sweep of an arc (radians), never zero.
    fn arc_sweep(&self) -> f64 {
        let steps = match self.rotation {
            Rotation::Clockwise => self.start.clockwise_distance(self.end),
            Rotation::CounterClockwise => self.end.clockwise_distance(self.start),
        };
        let steps = if steps == 0 { 8 } else { steps };
        self.rotation.sign() * steps as f64 * TAU / 8.0
    }

    /// Ring to inner circle, around it, and back out.
    fn spiral_point(&self, laps: u8, t: f64) -> Point {
        let a0 = button_angle(self.start);
        let a1 = button_angle(self.end);
        let sign = self.rotation.sign();
        let mut sweep = (sign * (a1 - a0)).rem_euclid(TAU);
        if sweep < PI / 2.0 {
            sweep += TAU;
        }
        sweep += laps as f64 * TAU;

        let angle = a0 + sign * sweep * t;
        let radius = if t < SPIRAL_RAMP {
            1.0 + (SPIRAL_RADIUS - 1.0) * (t / SPIRAL_RAMP)
        } else if t > 1.0 - SPIRAL_RAMP {
            SPIRAL_RADIUS + (1.0 - SPIRAL_RADIUS) * ((t - (1.0 - SPIRAL_RAMP)) / SPIRAL_RAMP)
        } else {
            SPIRAL_RADIUS
        };
        Point::polar(radius, angle)
    }

    /// Samples the main lane into `ARC_SAMPLES + 1` points.
    pub fn sample(&self) -> SampledPath {
        self.sample_lane(self.lanes() / 2)
    }

    pub fn sample_lane(&self, lane: usize) -> SampledPath {
        SampledPath::new(
            (0..=ARC_SAMPLES)
                .map(|i| self.lane_point_at(lane, i as f64 / ARC_SAMPLES as f64))
                .collect(),
        )
    }

    /// Unit-space length of the main lane.
    pub fn arc_length(&self) -> f64 {
        self.sample().length()
    }
}

fn cubic(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// A polyline with cumulative lengths, for arc-length lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPath {
    points: Vec<Point>,
    cumulative: Vec<f64>,
}

impl SampledPath {
    pub fn new(points: Vec<Point>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += points[i - 1].distance(*p);
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Point and unit tangent at arc length `s` from the start.
    pub fn at_length(&self, s: f64) -> (Point, Point) {
        let n = self.points.len();
        if n < 2 {
            return (self.points.first().copied().unwrap_or_default(), Point::new(1.0, 0.0));
        }
        let s = s.clamp(0.0, self.length());
        let i = self
            .cumulative
            .partition_point(|c| *c < s)
            .clamp(1, n - 1);
        let (a, b) = (self.points[i - 1], self.points[i]);
        let seg = self.cumulative[i] - self.cumulative[i - 1];
        let t = if seg > 0.0 {
            (s - self.cumulative[i - 1]) / seg
        } else {
            0.0
        };
        (a.lerp(b, t), (b - a).normalized())
    }

    /// Point and tangent at a fraction of the total length.
    pub fn at_fraction(&self, fraction: f64) -> (Point, Point) {
        self.at_length(fraction.clamp(0.0, 1.0) * self.length())
    }

    /// Points of the polyline from arc length `s` to the end.
    pub fn tail_from(&self, s: f64) -> Vec<Point> {
        let (head, _) = self.at_length(s);
        let mut out = vec![head];
        out.extend(
            self.points
                .iter()
                .zip(&self.cumulative)
                .filter(|(_, c)| **c > s)
                .map(|(p, _)| *p),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(n: u8) -> Button {
        Button::new(n).unwrap()
    }

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    const ALL: [SlidePath; 12] = [
        SlidePath::Straight,
        SlidePath::ArcLeft,
        SlidePath::ArcRight,
        SlidePath::ShortArc,
        SlidePath::ThroughCenter,
        SlidePath::BendS,
        SlidePath::BendZ,
        SlidePath::SpiralP,
        SlidePath::SpiralQ,
        SlidePath::DoubleSpiralP,
        SlidePath::DoubleSpiralQ,
        SlidePath::Wifi,
    ];

    #[test]
    fn test_every_primitive_connects_its_buttons() {
        for path in ALL {
            let g = PathGeometry::resolve(path, b(1), b(5));
            assert!(close(g.point_at(0.0), unit_button(b(1))), "{path:?} start");
            assert!(close(g.point_at(1.0), unit_button(b(5))), "{path:?} end");
            assert!(g.arc_length() > 0.0);
        }
    }

    #[test]
    fn test_arc_direction_depends_on_start_half() {
        // From button 1 (upper) `>` goes clockwise: 1 -> 2 -> 3
        let upper = PathGeometry::resolve(SlidePath::ArcRight, b(1), b(3));
        assert_eq!(upper.rotation, Rotation::Clockwise);
        assert!(close(upper.point_at(0.5), unit_button(b(2))));
        // From button 4 (lower) `>` goes counter-clockwise: 4 -> 3 -> 2
        let lower = PathGeometry::resolve(SlidePath::ArcRight, b(4), b(2));
        assert_eq!(lower.rotation, Rotation::CounterClockwise);
        assert!(close(lower.point_at(0.5), unit_button(b(3))));
    }

    #[test]
    fn test_arc_lengths() {
        let quarter = PathGeometry::resolve(SlidePath::ShortArc, b(1), b(3));
        assert!((quarter.arc_length() - PI / 2.0).abs() < 1e-3);
        let full = PathGeometry::resolve(SlidePath::ArcRight, b(1), b(1));
        assert!((full.arc_length() - TAU).abs() < 1e-2);
        let line = PathGeometry::resolve(SlidePath::Straight, b(1), b(5));
        assert!((line.arc_length() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_through_center_passes_origin() {
        let g = PathGeometry::resolve(SlidePath::ThroughCenter, b(2), b(7));
        assert!(close(g.point_at(0.5), Point::ORIGIN));
    }

    #[test]
    fn test_spiral_stays_inside_ring() {
        let g = PathGeometry::resolve(SlidePath::DoubleSpiralQ, b(3), b(6));
        let single = PathGeometry::resolve(SlidePath::SpiralQ, b(3), b(6));
        assert!(g.arc_length() > single.arc_length());
        assert!((g.point_at(0.5).length() - SPIRAL_RADIUS).abs() < 1e-9);
    }

    #[test]
    fn test_s_and_z_are_mirror_images() {
        let s = PathGeometry::resolve(SlidePath::BendS, b(1), b(5));
        let z = PathGeometry::resolve(SlidePath::BendZ, b(1), b(5));
        assert!((s.arc_length() - z.arc_length()).abs() < 1e-9);
        assert!(!close(s.point_at(0.25), z.point_at(0.25)));
    }

    #[test]
    fn test_fan_lanes_spread() {
        let g = PathGeometry::resolve(SlidePath::Wifi, b(1), b(5));
        assert_eq!(g.lanes(), 3);
        assert!(close(g.lane_point_at(0, 1.0), unit_button(b(4))));
        assert!(close(g.lane_point_at(2, 1.0), unit_button(b(6))));
    }

    #[test]
    fn test_sampled_lookup() {
        let path = SampledPath::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ]);
        assert_eq!(path.length(), 2.0);
        let (p, tangent) = path.at_length(1.5);
        assert!(close(p, Point::new(1.0, 0.5)));
        assert!(close(tangent, Point::new(0.0, 1.0)));
        assert_eq!(path.tail_from(0.5).len(), 3);
    }
}
