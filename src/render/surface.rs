//! Drawing surface abstraction.
//!
//! The renderer draws through the [`Surface`] trait in a y-down coordinate
//! space whose size is supplied by the host. [`DisplayList`] is a recording
//! implementation: hosts replay it onto their own canvas, and tests inspect
//! it directly.

pub use crate::geometry::Point;

/// An RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same colour with opacity scaled by `alpha` (0-1).
    pub fn with_alpha(self, alpha: f64) -> Self {
        let a = (self.a as f64 * alpha.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Linear blend toward `other`.
    pub fn mix(self, other: Color, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let ch = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self {
            r: ch(self.r, other.r),
            g: ch(self.g, other.g),
            b: ch(self.b, other.b),
            a: ch(self.a, other.a),
        }
    }

    pub fn is_visible(self) -> bool {
        self.a > 0
    }
}

/// How a closed shape is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Radial gradient: centre, middle and edge colours.
    Radial([Color; 3]),
}

impl Paint {
    /// Colour at relative distance `t` (0 centre, 1 edge).
    pub fn sample(&self, t: f64) -> Color {
        match self {
            Paint::Solid(c) => *c,
            Paint::Radial([inner, middle, outer]) => {
                if t < 0.5 {
                    inner.mix(*middle, t * 2.0)
                } else {
                    middle.mix(*outer, (t - 0.5) * 2.0)
                }
            }
        }
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        match self {
            Paint::Solid(c) => Paint::Solid(c.with_alpha(alpha)),
            Paint::Radial(stops) => Paint::Radial(stops.map(|c| c.with_alpha(alpha))),
        }
    }
}

/// Outline settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

/// Fill and outline of a closed shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Style {
    pub fill: Option<Paint>,
    pub stroke: Option<Stroke>,
}

impl Style {
    pub fn fill(paint: Paint) -> Self {
        Self {
            fill: Some(paint),
            stroke: None,
        }
    }

    pub fn stroke(stroke: Stroke) -> Self {
        Self {
            fill: None,
            stroke: Some(stroke),
        }
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            fill: self.fill.map(|p| p.with_alpha(alpha)),
            stroke: self.stroke.map(|s| Stroke {
                color: s.color.with_alpha(alpha),
                ..s
            }),
        }
    }
}

/// Horizontal anchoring of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Something the renderer can draw on.
pub trait Surface {
    /// Width and height in surface units.
    fn size(&self) -> (f64, f64);

    fn circle(&mut self, center: Point, radius: f64, style: Style);

    /// Closed polygon through `points`.
    fn polygon(&mut self, points: &[Point], style: Style);

    /// Open line strip through `points`.
    fn polyline(&mut self, points: &[Point], stroke: Stroke);

    fn text(&mut self, at: Point, text: &str, color: Color, align: TextAlign);
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Circle {
        center: Point,
        radius: f64,
        style: Style,
    },
    Polygon {
        points: Vec<Point>,
        style: Style,
    },
    Polyline {
        points: Vec<Point>,
        stroke: Stroke,
    },
    Text {
        at: Point,
        text: String,
        color: Color,
        align: TextAlign,
    },
}

/// Surface that records every operation in order.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Drops recorded commands, keeping the size.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Changes the surface size and drops recorded commands.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    /// All recorded text strings, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn circle(&mut self, center: Point, radius: f64, style: Style) {
        if radius > 0.0 {
            self.commands.push(DrawCommand::Circle {
                center,
                radius,
                style,
            });
        }
    }

    fn polygon(&mut self, points: &[Point], style: Style) {
        if points.len() >= 3 {
            self.commands.push(DrawCommand::Polygon {
                points: points.to_vec(),
                style,
            });
        }
    }

    fn polyline(&mut self, points: &[Point], stroke: Stroke) {
        if points.len() >= 2 {
            self.commands.push(DrawCommand::Polyline {
                points: points.to_vec(),
                stroke,
            });
        }
    }

    fn text(&mut self, at: Point, text: &str, color: Color, align: TextAlign) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            color,
            align,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_alpha_and_mix() {
        let c = Color::rgb(200, 100, 0).with_alpha(0.5);
        assert_eq!(c.a, 128);
        let m = Color::rgb(0, 0, 0).mix(Color::rgb(255, 255, 255), 0.5);
        assert_eq!(m.r, 128);
    }

    #[test]
    fn test_radial_gradient_stops() {
        let paint = Paint::Radial([
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(0, 0, 255),
        ]);
        assert_eq!(paint.sample(0.0), Color::rgb(255, 0, 0));
        assert_eq!(paint.sample(0.5), Color::rgb(0, 255, 0));
        assert_eq!(paint.sample(1.0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_display_list_skips_degenerate_shapes() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.circle(Point::ORIGIN, 0.0, Style::default());
        list.polygon(&[Point::ORIGIN, Point::new(1.0, 0.0)], Style::default());
        list.polyline(&[Point::ORIGIN], Stroke::new(Color::rgb(1, 1, 1), 1.0));
        assert!(list.is_empty());
        list.text(Point::ORIGIN, "hi", Color::rgb(1, 1, 1), TextAlign::Left);
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["hi"]);
    }
}
