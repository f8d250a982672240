//! SVG line charts of units sold per period.
//!
//! Each chart plots one product's monthly series with circle markers and,
//! when a trend was fitted, a dashed overlay of the fitted line. The x axis
//! is the period index labelled with the year of each period.

use crate::config::ChartConfig;
use crate::models::ProductReport;
use crate::report::format::{escape_html, format_thousands};

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;

/// Colours and size of a chart.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub line_color: String,
    pub trend_color: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::from(&ChartConfig::default())
    }
}

impl From<&ChartConfig> for ChartStyle {
    fn from(config: &ChartConfig) -> Self {
        Self {
            line_color: config.line_color.clone(),
            trend_color: config.trend_color.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

/// Chart title for a product.
pub fn chart_title(product: &str) -> String {
    format!("Sales Evolution - {}", product)
}

/// Vertical range covering the series and the trend, padded by 10%.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let span = max - min;
    let pad = if span == 0.0 {
        (max.abs() * 0.1).max(1.0)
    } else {
        span * 0.1
    };
    (min - pad, max + pad)
}

/// Maps data coordinates to pixels.
struct Plot {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    points: usize,
    y_min: f64,
    y_max: f64,
}

impl Plot {
    fn x(&self, index: usize) -> f64 {
        if self.points <= 1 {
            return self.left + self.width / 2.0;
        }
        self.left + self.width * index as f64 / (self.points - 1) as f64
    }

    fn y(&self, value: f64) -> f64 {
        let t = (value - self.y_min) / (self.y_max - self.y_min);
        self.top + self.height * (1.0 - t)
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Render one product's chart as a standalone SVG document.
pub fn render_svg(product: &ProductReport, style: &ChartStyle) -> String {
    let width = style.width as f64;
    let height = style.height as f64;
    let series = &product.series;
    let line = product.trend.line();

    let fitted = line.map(|l| l.fitted.clone()).unwrap_or_default();
    let (y_min, y_max) = value_range(
        series
            .iter()
            .map(|p| p.units_sold)
            .chain(fitted.iter().copied()),
    );

    let plot = Plot {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: width - MARGIN_LEFT - MARGIN_RIGHT,
        height: height - MARGIN_TOP - MARGIN_BOTTOM,
        points: series.len(),
        y_min,
        y_max,
    };

    let title = escape_html(&chart_title(&product.summary.product));
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12" role="img" aria-label="{title}">"#,
        w = style.width,
        h = style.height,
        title = title
    ));
    lines.push(r#"<rect width="100%" height="100%" fill="white"/>"#.to_string());
    lines.push(format!(
        r#"<text x="{}" y="28" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        title
    ));

    // Horizontal grid and y tick labels.
    for i in 0..Y_TICKS {
        let value = y_min + (y_max - y_min) * i as f64 / (Y_TICKS - 1) as f64;
        let y = plot.y(value);
        lines.push(format!(
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#b0b0b0" stroke-dasharray="4 4" stroke-opacity="0.6"/>"##,
            plot.left,
            y,
            plot.left + plot.width,
            y
        ));
        lines.push(format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
            plot.left - 8.0,
            y,
            format_thousands(value.round())
        ));
    }

    // Vertical grid and year labels, printed once per year.
    let mut last_label: Option<&str> = None;
    for (i, point) in series.iter().enumerate() {
        let x = plot.x(i);
        lines.push(format!(
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#b0b0b0" stroke-dasharray="4 4" stroke-opacity="0.6"/>"##,
            x,
            plot.top,
            x,
            plot.bottom()
        ));
        if last_label != Some(point.year_label.as_str()) {
            lines.push(format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x,
                plot.bottom() + 18.0,
                escape_html(&point.year_label)
            ));
            last_label = Some(point.year_label.as_str());
        }
    }

    // Axes.
    lines.push(format!(
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
        plot.left, plot.top, plot.width, plot.height
    ));
    lines.push(format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">Year</text>"#,
        plot.left + plot.width / 2.0,
        height - 15.0
    ));
    lines.push(format!(
        r#"<text x="18" y="{:.1}" text-anchor="middle" transform="rotate(-90 18 {:.1})">Units sold</text>"#,
        plot.top + plot.height / 2.0,
        plot.top + plot.height / 2.0
    ));

    if series.is_empty() {
        lines.push(format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">No data</text>"#,
            plot.left + plot.width / 2.0,
            plot.top + plot.height / 2.0
        ));
        lines.push("</svg>".to_string());
        return finish(lines);
    }

    let color = escape_html(&style.line_color);
    let trend_color = escape_html(&style.trend_color);

    // Units line with markers.
    let path: Vec<String> = series
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{:.1},{:.1}", plot.x(i), plot.y(p.units_sold)))
        .collect();
    lines.push(format!(
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        path.join(" "),
        color
    ));
    for (i, point) in series.iter().enumerate() {
        lines.push(format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"><title>{}: {}</title></circle>"#,
            plot.x(i),
            plot.y(point.units_sold),
            color,
            escape_html(&point.period),
            format_thousands(point.units_sold)
        ));
    }

    // Dashed trend overlay.
    if !fitted.is_empty() {
        let trend_path: Vec<String> = fitted
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:.1},{:.1}", plot.x(i), plot.y(*v)))
            .collect();
        lines.push(format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2" stroke-dasharray="8 6"/>"#,
            trend_path.join(" "),
            trend_color
        ));
    }

    // Legend.
    let legend_x = plot.left + 12.0;
    let legend_y = plot.top + 16.0;
    lines.push(format!(
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
        legend_x,
        legend_y,
        legend_x + 24.0,
        legend_y,
        color
    ));
    lines.push(format!(
        r#"<text x="{:.1}" y="{:.1}" dominant-baseline="middle">{}</text>"#,
        legend_x + 30.0,
        legend_y,
        escape_html(&product.summary.product)
    ));
    if line.is_some() {
        lines.push(format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2" stroke-dasharray="8 6"/>"#,
            legend_x,
            legend_y + 18.0,
            legend_x + 24.0,
            legend_y + 18.0,
            trend_color
        ));
        lines.push(format!(
            r#"<text x="{:.1}" y="{:.1}" dominant-baseline="middle">Trend</text>"#,
            legend_x + 30.0,
            legend_y + 18.0
        ));
    }

    lines.push("</svg>".to_string());
    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut svg = lines.join("\n");
    svg.push('\n');
    svg
}
