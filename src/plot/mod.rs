//! Plot rendering: ASCII for the terminal, SVG files via Plotters.

pub mod ascii;
pub mod svg;

pub use ascii::{render_fit_plot, render_series_plot};
pub use svg::{ChartSize, ChartText, draw_bounce_chart, draw_contour_chart, draw_fit_chart};
