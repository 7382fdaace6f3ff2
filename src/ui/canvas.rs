//! Braille raster for the playfield.
//!
//! [`Raster`] implements the renderer's [`Surface`] at braille resolution:
//! each terminal cell holds a 2x4 grid of dots. Shapes are scan-filled and
//! blended over the background, then the raster is turned into one styled
//! [`Line`] per terminal row. A cell takes the colour of its brightest dot.

use crate::render::{Color, Paint, Point, Stroke, Style, Surface, TextAlign, BACKGROUND};
use ratatui::style::{Color as TermColor, Style as TermStyle};
use ratatui::text::{Line, Span};

/// Dots per cell, horizontally.
pub const DOTS_X: usize = 2;

/// Dots per cell, vertically.
pub const DOTS_Y: usize = 4;

const BRAILLE_BASE: u32 = 0x2800;

/// Bit of the braille code point for dot (column, row) within a cell.
const DOT_BITS: [[u32; DOTS_Y]; DOTS_X] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

/// Smallest per-channel distance from the background for a dot to show.
const LIT_THRESHOLD: i32 = 10;

/// Text placed on top of the dots.
#[derive(Debug, Clone)]
struct Label {
    col: i64,
    row: i64,
    text: String,
    color: Color,
}

/// A dot raster covering `cols` x `rows` terminal cells.
#[derive(Debug, Clone)]
pub struct Raster {
    cols: usize,
    rows: usize,
    /// Blended colour of each dot, `None` where nothing was drawn.
    pixels: Vec<Option<Color>>,
    labels: Vec<Label>,
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb(color.r, color.g, color.b)
}

fn differs_from_background(color: Color) -> bool {
    let d = |a: u8, b: u8| (a as i32 - b as i32).abs();
    d(color.r, BACKGROUND.r).max(d(color.g, BACKGROUND.g)).max(d(color.b, BACKGROUND.b))
        >= LIT_THRESHOLD
}

fn brightness(color: Color) -> u32 {
    color.r as u32 + color.g as u32 + color.b as u32
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = Point::new(b.x - a.x, b.y - a.y);
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len2).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

impl Raster {
    pub fn new(cols: u16, rows: u16) -> Self {
        let cols = cols as usize;
        let rows = rows as usize;
        Self {
            cols,
            rows,
            pixels: vec![None; cols * DOTS_X * rows * DOTS_Y],
            labels: Vec::new(),
        }
    }

    fn width(&self) -> usize {
        self.cols * DOTS_X
    }

    fn height(&self) -> usize {
        self.rows * DOTS_Y
    }

    fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixels[y * self.width() + x]
    }

    /// Whether the dot at (x, y) shows.
    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y).is_some_and(differs_from_background)
    }

    /// Blends `color` over the dot at (x, y).
    fn blend(&mut self, x: i64, y: i64, color: Color) {
        if color.a == 0 || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width() || y >= self.height() {
            return;
        }
        let index = y * self.width() + x;
        let base = self.pixels[index].unwrap_or(BACKGROUND);
        let opaque = Color { a: 255, ..color };
        self.pixels[index] = Some(base.mix(opaque, color.a as f64 / 255.0));
    }

    /// Fills dots whose centres lie between `x0` and `x1` on row `y`.
    fn fill_row(&mut self, y: i64, x0: f64, x1: f64, shade: &dyn Fn(Point) -> Color) {
        let first = (x0 - 0.5).ceil() as i64;
        let last = (x1 - 0.5).floor() as i64;
        for x in first.max(0)..=last.min(self.width() as i64 - 1) {
            let color = shade(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            self.blend(x, y, color);
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f64, paint: Paint) {
        let top = (center.y - radius).floor().max(0.0) as i64;
        let bottom = (center.y + radius).ceil().min(self.height() as f64) as i64;
        let shade = |p: Point| paint.sample(p.distance(center) / radius);
        for y in top..bottom {
            let dy = y as f64 + 0.5 - center.y;
            if dy.abs() > radius {
                continue;
            }
            let half = (radius * radius - dy * dy).sqrt();
            self.fill_row(y, center.x - half, center.x + half, &shade);
        }
    }

    /// Even-odd scanline fill.
    fn fill_polygon(&mut self, points: &[Point], paint: Paint) {
        let n = points.len() as f64;
        let centroid = Point::new(
            points.iter().map(|p| p.x).sum::<f64>() / n,
            points.iter().map(|p| p.y).sum::<f64>() / n,
        );
        let reach = points
            .iter()
            .map(|p| p.distance(centroid))
            .fold(f64::EPSILON, f64::max);
        let shade = |p: Point| paint.sample(p.distance(centroid) / reach);

        let top = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let bottom = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let top = top.floor().max(0.0) as i64;
        let bottom = bottom.ceil().min(self.height() as f64) as i64;

        let mut crossings = Vec::new();
        for y in top..bottom {
            let py = y as f64 + 0.5;
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= py) != (b.y <= py) {
                    crossings.push(a.x + (py - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                self.fill_row(y, pair[0], pair[1], &shade);
            }
        }
    }

    fn stroke_segment(&mut self, a: Point, b: Point, stroke: Stroke) {
        let half = (stroke.width / 2.0).max(0.5);
        let left = (a.x.min(b.x) - half).floor().max(0.0) as i64;
        let right = (a.x.max(b.x) + half).ceil().min(self.width() as f64) as i64;
        let top = (a.y.min(b.y) - half).floor().max(0.0) as i64;
        let bottom = (a.y.max(b.y) + half).ceil().min(self.height() as f64) as i64;
        for y in top..bottom {
            for x in left..right {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if segment_distance(p, a, b) <= half {
                    self.blend(x, y, stroke.color);
                }
            }
        }
    }

    fn stroke_closed(&mut self, points: &[Point], stroke: Stroke) {
        for (i, a) in points.iter().enumerate() {
            self.stroke_segment(*a, points[(i + 1) % points.len()], stroke);
        }
    }

    /// One styled line per terminal row.
    pub fn lines(&self) -> Vec<Line<'static>> {
        let background = TermStyle::default().bg(term_color(BACKGROUND));
        let mut grid: Vec<Vec<(char, Option<Color>)>> = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let mut cells = Vec::with_capacity(self.cols);
            for col in 0..self.cols {
                cells.push(self.cell(col, row));
            }
            grid.push(cells);
        }

        for label in &self.labels {
            if label.row < 0 || label.row as usize >= self.rows {
                continue;
            }
            let cells = &mut grid[label.row as usize];
            for (i, ch) in label.text.chars().enumerate() {
                let col = label.col + i as i64;
                if col >= 0 && (col as usize) < cells.len() {
                    cells[col as usize] = (ch, Some(label.color));
                }
            }
        }

        grid.into_iter()
            .map(|cells| {
                let mut spans = Vec::new();
                let mut run = String::new();
                let mut run_color: Option<Color> = None;
                for (ch, color) in cells {
                    if color != run_color && !run.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut run), style_for(background, run_color)));
                    }
                    run_color = color;
                    run.push(ch);
                }
                if !run.is_empty() {
                    spans.push(Span::styled(run, style_for(background, run_color)));
                }
                Line::from(spans)
            })
            .collect()
    }

    /// Braille character and colour of one cell.
    fn cell(&self, col: usize, row: usize) -> (char, Option<Color>) {
        let mut bits = 0;
        let mut brightest: Option<Color> = None;
        for (dx, column) in DOT_BITS.iter().enumerate() {
            for (dy, bit) in column.iter().enumerate() {
                let (x, y) = (col * DOTS_X + dx, row * DOTS_Y + dy);
                let Some(color) = self.pixel(x, y).filter(|c| differs_from_background(*c)) else {
                    continue;
                };
                bits |= bit;
                if brightest.map_or(true, |b| brightness(color) > brightness(b)) {
                    brightest = Some(color);
                }
            }
        }
        if bits == 0 {
            return (' ', None);
        }
        (char::from_u32(BRAILLE_BASE + bits).unwrap_or(' '), brightest)
    }
}

fn style_for(background: TermStyle, color: Option<Color>) -> TermStyle {
    match color {
        Some(c) => background.fg(term_color(c)),
        None => background,
    }
}

impl Surface for Raster {
    fn size(&self) -> (f64, f64) {
        (self.width() as f64, self.height() as f64)
    }

    fn circle(&mut self, center: Point, radius: f64, style: Style) {
        if radius <= 0.0 {
            return;
        }
        if let Some(paint) = style.fill {
            self.fill_circle(center, radius, paint);
        }
        if let Some(stroke) = style.stroke {
            let segments = ((std::f64::consts::TAU * radius / 2.0) as usize).clamp(12, 256);
            let ring: Vec<Point> = (0..segments)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / segments as f64;
                    let offset = Point::polar(radius, angle);
                    Point::new(center.x + offset.x, center.y + offset.y)
                })
                .collect();
            self.stroke_closed(&ring, stroke);
        }
    }

    fn polygon(&mut self, points: &[Point], style: Style) {
        if points.len() < 3 {
            return;
        }
        if let Some(paint) = style.fill {
            self.fill_polygon(points, paint);
        }
        if let Some(stroke) = style.stroke {
            self.stroke_closed(points, stroke);
        }
    }

    fn polyline(&mut self, points: &[Point], stroke: Stroke) {
        for pair in points.windows(2) {
            self.stroke_segment(pair[0], pair[1], stroke);
        }
    }

    fn text(&mut self, at: Point, text: &str, color: Color, align: TextAlign) {
        let len = text.chars().count() as i64;
        let col = (at.x / DOTS_X as f64).floor() as i64;
        let col = match align {
            TextAlign::Left => col,
            TextAlign::Center => col - len / 2,
            TextAlign::Right => col - len,
        };
        self.labels.push(Label {
            col,
            row: (at.y / DOTS_Y as f64).floor() as i64,
            text: text.to_string(),
            color: Color { a: 255, ..color },
        });
    }
}
