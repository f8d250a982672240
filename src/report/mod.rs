//! Report rendering: Markdown, HTML and JSON output plus SVG charts.

pub mod chart;
pub mod format;
pub mod generator;

pub use chart::ChartStyle;
pub use generator::*;
