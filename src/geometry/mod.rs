//! Unit-ring geometry shared by the chart model and the renderer.
//!
//! Unit space puts the judgment ring at radius 1 around the origin, with
//! y growing downward. Slide path shapes and their sampled arc lengths live
//! here so that chart timing and drawing agree on them.

pub mod path;
mod point;

pub use point::Point;

use crate::chart::Button;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

/// Unit-space angle of a button (clockwise from +x, y down).
pub fn button_angle(button: Button) -> f64 {
    -FRAC_PI_2 + FRAC_PI_8 + button.index() as f64 * FRAC_PI_4
}

/// Unit-space position of a button on the ring.
pub fn unit_button(button: Button) -> Point {
    Point::polar(1.0, button_angle(button))
}
