//! SVG preview of a canvas page
//!
//! This module walks canvas elements and produces an SVG string
//! with prefixed CSS classes for styling.

pub mod svg;

pub use svg::{render_svg, SvgBuilder, SvgConfig, ViewBox};
