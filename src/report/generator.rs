//! Report generation.
//!
//! This module renders an analysed [`Report`] as Markdown (with SVG charts
//! written next to it), as a self-contained HTML page, or as JSON.

use crate::analysis::top_sellers;
use crate::models::{ProductReport, Report, ReportMetadata, SalesTotals, Trend};
use crate::report::chart::{chart_title, render_svg, ChartStyle};
use crate::report::format::{
    escape_html, escape_table_cell, format_change, format_price, format_ratio, format_thousands,
    slugify,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Generate a complete Markdown report.
///
/// When `charts_dir` is set, each product section links its chart as
/// `<charts_dir>/<chart file name>`.
pub fn generate_markdown_report(report: &Report, charts_dir: Option<&str>) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Sales Analysis\n\n");

    output.push_str(&format!("## Data for {}\n\n", report.metadata.branch));

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // Totals
    output.push_str(&generate_totals_section(report));

    // One section per product
    output.push_str("## Products\n\n");
    if report.products.is_empty() {
        output.push_str("No sales match the selected branch.\n\n");
    }
    for (i, product) in report.products.iter().enumerate() {
        let chart_link = charts_dir.map(|dir| format!("{}/{}", dir, chart_file_name(i, product)));
        output.push_str(&generate_product_section(product, chart_link.as_deref()));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Branch:** {}\n", metadata.branch));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records Analyzed:** {} of {}\n",
        metadata.records_analyzed, metadata.records_loaded
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Totals](#totals)\n");
    toc.push_str("- [Products](#products)\n");

    for product in &report.products {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            product.summary.product,
            slugify(&product.summary.product)
        ));
    }

    toc.push('\n');

    toc
}

/// Generate the totals section.
fn generate_totals_section(report: &Report) -> String {
    let totals: &SalesTotals = &report.totals;
    let mut section = String::new();

    section.push_str("## Totals\n\n");
    section.push_str("| Revenue | Cost | Margin | Units Sold | Products |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| ${} | ${} | {} | {} | {} |\n\n",
        format_thousands(totals.revenue_total),
        format_thousands(totals.cost_total),
        format_ratio(totals.margin),
        format_thousands(totals.units_sold),
        totals.products
    ));

    let summaries: Vec<_> = report.products.iter().map(|p| p.summary.clone()).collect();
    let top = top_sellers(&summaries, 5);
    if !top.is_empty() {
        section.push_str("### Top Sellers\n\n");
        section.push_str("| Product | Units Sold |\n");
        section.push_str("|:---|:---:|\n");
        for summary in top {
            section.push_str(&format!(
                "| {} | {} |\n",
                escape_table_cell(&summary.product),
                format_thousands(summary.units_sold)
            ));
        }
        section.push('\n');
    }

    if report.branches.len() > 1 {
        section.push_str(&format!(
            "*Branches in the file: {}*\n\n",
            report.branches.join(", ")
        ));
    }

    section
}

/// One-line description of a fitted trend.
pub fn describe_trend(trend: &Trend) -> String {
    match trend.line() {
        Some(line) => format!(
            "{} {} ({:+.2} units/period, R² {:.2})",
            line.direction().arrow(),
            line.direction(),
            line.slope,
            line.r_squared
        ),
        None => "Not enough periods for a trend".to_string(),
    }
}

/// Generate the section for a single product.
fn generate_product_section(product: &ProductReport, chart_link: Option<&str>) -> String {
    let summary = &product.summary;
    let mut section = String::new();

    section.push_str(&format!(
        "### {} {{#{}}}\n\n",
        summary.product,
        slugify(&summary.product)
    ));

    section.push_str("| Metric | Value | Change |\n");
    section.push_str("|:---|---:|---:|\n");
    section.push_str(&format!(
        "| Average Price | {} | {} |\n",
        format_price(summary.average_price),
        format_change(summary.price_change_pct)
    ));
    section.push_str(&format!(
        "| Average Margin | {} | |\n",
        format_ratio(summary.average_margin)
    ));
    section.push_str(&format!(
        "| Units Sold | {} | {} |\n\n",
        format_thousands(summary.units_sold),
        format_change(summary.units_change_pct)
    ));

    section.push_str(&format!("**Trend:** {}\n\n", describe_trend(&product.trend)));

    if let Some(link) = chart_link {
        section.push_str(&format!(
            "![{}]({})\n\n",
            chart_title(&summary.product),
            link
        ));
    } else if !product.series.is_empty() {
        section.push_str("| Period | Units Sold |\n");
        section.push_str("|:---|---:|\n");
        for point in &product.series {
            section.push_str(&format!(
                "| {} | {} |\n",
                point.period,
                format_thousands(point.units_sold)
            ));
        }
        section.push('\n');
    }

    section.push_str("---\n\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "*Report generated by salescope*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// File name of a product's chart; the index keeps names unique.
pub fn chart_file_name(index: usize, product: &ProductReport) -> String {
    let slug = slugify(&product.summary.product);
    if slug.is_empty() {
        format!("{:02}.svg", index + 1)
    } else {
        format!("{:02}-{}.svg", index + 1, slug)
    }
}

/// Write one SVG chart per product into `dir`.
pub fn write_charts(report: &Report, dir: &Path, style: &ChartStyle) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create charts directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(report.products.len());
    for (i, product) in report.products.iter().enumerate() {
        let path = dir.join(chart_file_name(i, product));
        std::fs::write(&path, render_svg(product, style))
            .with_context(|| format!("Failed to write chart {}", path.display()))?;
        debug!("Wrote chart {}", path.display());
        written.push(path);
    }

    Ok(written)
}

const HTML_STYLE: &str = r#"
body { font-family: sans-serif; margin: 0 auto; max-width: 1200px; padding: 1rem 2rem; color: #222; }
.product { display: flex; gap: 2rem; align-items: flex-start; border-bottom: 1px solid #ddd; padding: 1rem 0; }
.metrics { min-width: 240px; }
.metric { margin-bottom: 1rem; }
.metric .label { font-size: 0.85rem; color: #666; }
.metric .value { font-size: 1.6rem; }
.delta.up { color: #09ab3b; }
.delta.down { color: #ff2b2b; }
.delta.none { color: #999; }
.info { background: #e8f0fe; padding: 0.75rem 1rem; border-radius: 4px; }
.error { background: #fde8e8; padding: 0.75rem 1rem; border-radius: 4px; }
form.controls { display: flex; gap: 1rem; align-items: flex-end; flex-wrap: wrap; background: #f5f5f5; padding: 1rem; }
form.controls label { display: flex; flex-direction: column; font-size: 0.85rem; }
table { border-collapse: collapse; }
td, th { padding: 0.25rem 0.75rem; border: 1px solid #ddd; }
"#;

/// Wrap body markup in a complete HTML document.
pub fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        HTML_STYLE,
        body
    )
}

fn html_delta(value: Option<f64>) -> String {
    let class = match value {
        Some(v) if v > 0.0 => "up",
        Some(v) if v < 0.0 => "down",
        Some(_) => "",
        None => "none",
    };
    format!(
        "<div class=\"delta {}\">{}</div>",
        class,
        escape_html(&format_change(value))
    )
}

fn html_metric(label: &str, value: &str, delta: Option<String>) -> String {
    format!(
        "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div>{}</div>\n",
        escape_html(label),
        escape_html(value),
        delta.unwrap_or_default()
    )
}

/// Render the report body (totals and product panels) as HTML.
pub fn generate_html_body(report: &Report, style: &ChartStyle) -> String {
    let mut body = String::new();
    let totals = &report.totals;

    body.push_str(&format!(
        "<h2>Data for {}</h2>\n",
        escape_html(&report.metadata.branch.to_string())
    ));
    body.push_str(&format!(
        "<p>{} &middot; {} of {} records &middot; generated {}</p>\n",
        escape_html(&report.metadata.source),
        report.metadata.records_analyzed,
        report.metadata.records_loaded,
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    body.push_str("<table>\n<tr><th>Revenue</th><th>Cost</th><th>Margin</th><th>Units Sold</th><th>Products</th></tr>\n");
    body.push_str(&format!(
        "<tr><td>${}</td><td>${}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n</table>\n",
        format_thousands(totals.revenue_total),
        format_thousands(totals.cost_total),
        format_ratio(totals.margin),
        format_thousands(totals.units_sold),
        totals.products
    ));

    if report.products.is_empty() {
        body.push_str("<p class=\"info\">No sales match the selected branch.</p>\n");
    }

    for product in &report.products {
        let summary = &product.summary;
        body.push_str(&format!(
            "<section class=\"product\" id=\"{}\">\n<div class=\"metrics\">\n<h3>{}</h3>\n",
            escape_html(&slugify(&summary.product)),
            escape_html(&summary.product)
        ));
        body.push_str(&html_metric(
            "Average Price",
            &format_price(summary.average_price),
            Some(html_delta(summary.price_change_pct)),
        ));
        body.push_str(&html_metric(
            "Average Margin",
            &format_ratio(summary.average_margin),
            None,
        ));
        body.push_str(&html_metric(
            "Units Sold",
            &format_thousands(summary.units_sold),
            Some(html_delta(summary.units_change_pct)),
        ));
        body.push_str(&format!(
            "<p>{}</p>\n</div>\n<div class=\"chart\">\n",
            escape_html(&describe_trend(&product.trend))
        ));
        body.push_str(&render_svg(product, style));
        body.push_str("</div>\n</section>\n");
    }

    body
}

/// Generate a self-contained HTML report with inline charts.
pub fn generate_html_report(report: &Report, style: &ChartStyle) -> String {
    let mut body = String::from("<h1>Sales Analysis</h1>\n");
    body.push_str(&generate_html_body(report, style));
    html_document("Sales Analysis", &body)
}
