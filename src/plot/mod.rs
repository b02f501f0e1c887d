//! Terminal rendering sink.

pub mod ascii;

pub use ascii::{render_layer_heatmap, render_quadrant_scatter};
