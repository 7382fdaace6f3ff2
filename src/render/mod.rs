//! Radial playfield renderer.
//!
//! Draw procedures target the [`Surface`] trait, so the same frame can be
//! replayed onto a terminal canvas or recorded into a [`DisplayList`] for
//! inspection. Geometry is computed in unit space (ring radius 1) and mapped
//! to the surface by [`layout::RadialLayout`].

pub mod annotate;
pub mod approach;
mod frame;
pub mod layout;
mod notes;
mod overlay;
mod slide;
pub mod surface;

pub use frame::{render_frame, FrameContext, FrameStats};
pub use notes::BACKGROUND;
pub use surface::{Color, DisplayList, DrawCommand, Paint, Point, Stroke, Style, Surface, TextAlign};
