//! Salescope - sales analysis dashboard
//!
//! A CLI tool that reads a sales CSV export, aggregates per-product
//! metrics and renders a units-sold trend chart for each product, either
//! as a report file or through an upload form in the browser.
//!
//! Exit codes:
//!   0 - Success (also when no input file was given)
//!   1 - Error (invalid arguments, unreadable or malformed input, I/O failure)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod server;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use loader::{LoadOptions, SalesLoader};
use models::{BranchFilter, Report};
use report::ChartStyle;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config can enable verbose logging, so it is read first
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Salescope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    if let Err(e) = run(args, config).await {
        error!("Analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .salescope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize column names, chart colors and the server address.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Where the configuration came from. Logged once logging is up.
#[derive(Debug)]
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    /// The default file exists but could not be used.
    Fallback(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => {
                info!("Loaded default config from {}", DEFAULT_CONFIG_FILE)
            }
            ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
            ConfigOrigin::Fallback(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
        Err(e) => {
            let origin = ConfigOrigin::Fallback(format!("{:#}", e));
            Ok((Config::default(), origin))
        }
    }
}

/// Dispatch to serve mode or a single report pass.
async fn run(args: Args, config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    if args.serve {
        return server::serve(config).await;
    }

    print!("{}", run_once(&args, &config)?);
    Ok(())
}

/// One pass without the server. Returns the text for stdout.
fn run_once(args: &Args, config: &Config) -> Result<String> {
    let Some(ref input) = args.input else {
        return Ok(format!(
            "ℹ️  {}\n   Run with --input <FILE>, or --serve to use the upload form.\n",
            server::UPLOAD_PROMPT
        ));
    };

    let loader = SalesLoader::new(LoadOptions::from(&config.input));
    let records = loader
        .load_path(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    if args.list_branches {
        let mut listing = String::new();
        for branch in analysis::distinct_branches(&records) {
            listing.push_str(&branch);
            listing.push('\n');
        }
        return Ok(listing);
    }

    let filter = BranchFilter::from_selection(
        args.branch.as_deref(),
        &config.input.all_branches_label,
    );
    let source = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| input.display().to_string());

    let report = analysis::build_report(&source, &records, filter);
    let style = ChartStyle::from(&config.chart);

    let output = output_path(args, config);
    let content = render_report(args, &output, &report, &style)?;

    if args.writes_to_stdout() {
        return Ok(content);
    }

    std::fs::write(&output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    Ok(format!(
        "\n✅ Report saved to: {}\n{}",
        output.display(),
        summary_text(&report)
    ))
}

/// Resolve the report path; without `--output` the configured name gets the format's extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    match args.output {
        Some(ref path) => path.clone(),
        None => {
            PathBuf::from(&config.general.output).with_extension(args.format.extension())
        }
    }
}

/// Directory for Markdown charts and the link prefix used inside the report.
fn charts_location(args: &Args, output: &Path) -> Option<(PathBuf, String)> {
    if let Some(ref dir) = args.charts_dir {
        let link = output
            .parent()
            .and_then(|parent| dir.strip_prefix(parent).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(dir);
        return Some((dir.clone(), link.display().to_string()));
    }

    if args.writes_to_stdout() {
        return None;
    }

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "sales_report".to_string());
    let name = format!("{}_charts", stem);
    let dir = output
        .parent()
        .map(|parent| parent.join(&name))
        .unwrap_or_else(|| PathBuf::from(&name));
    Some((dir, name))
}

/// Render the report in the requested format, writing Markdown charts on the way.
fn render_report(
    args: &Args,
    output: &Path,
    report: &Report,
    style: &ChartStyle,
) -> Result<String> {
    let content = match args.format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Html => report::generate_html_report(report, style),
        OutputFormat::Markdown => {
            let charts = charts_location(args, output);
            if let Some((ref dir, _)) = charts {
                let written = report::write_charts(report, dir, style)?;
                info!("Wrote {} charts to {}", written.len(), dir.display());
            }
            let link = charts.as_ref().map(|(_, link)| link.as_str());
            report::generate_markdown_report(report, link)
        }
    };

    Ok(content)
}

/// Short console summary of the pass.
fn summary_text(report: &Report) -> String {
    let totals = &report.totals;
    let mut text = String::new();

    text.push_str(&format!(
        "\n📊 {} - {}\n",
        report.metadata.source, report.metadata.branch
    ));
    text.push_str(&format!(
        "   Records: {} of {} | Products: {}\n",
        report.metadata.records_analyzed, report.metadata.records_loaded, totals.products
    ));
    text.push_str(&format!(
        "   Revenue: ${} | Units sold: {} | Margin: {}\n",
        report::format::format_thousands(totals.revenue_total),
        report::format::format_thousands(totals.units_sold),
        report::format::format_ratio(totals.margin)
    ));

    for product in &report.products {
        text.push_str(&format!(
            "   - {}: {} units, avg price {} ({}), trend: {}\n",
            product.summary.product,
            report::format::format_thousands(product.summary.units_sold),
            report::format::format_price(product.summary.average_price),
            report::format::format_change(product.summary.price_change_pct),
            report::describe_trend(&product.trend)
        ));
    }

    text
}
