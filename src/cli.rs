//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::is_valid_color;
use clap::Parser;
use std::path::PathBuf;

/// Salescope - sales metrics and trend charts from a CSV export
///
/// Groups a sales table by product, computes average price, margin and
/// units sold, and draws a units-sold chart with a linear trend for each
/// product. Markdown/HTML/JSON reports, or an upload form in the browser.
///
/// Examples:
///   salescope --input ventas.csv
///   salescope --input ventas.csv --branch Norte --format html -o norte.html
///   salescope --input ventas.csv --list-branches
///   salescope --serve --bind 0.0.0.0:8501
///   salescope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Sales CSV file to analyze
    ///
    /// Required columns: Sucursal, Producto, Año, Mes, Ingreso_total,
    /// Costo_total, Unidades_vendidas (names can be changed in the config).
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Branch to analyze
    ///
    /// Use the all-branches label (default "Todas") or omit to include every branch.
    #[arg(short, long, value_name = "BRANCH", env = "SALESCOPE_BRANCH")]
    pub branch: Option<String>,

    /// Color of the units-sold line in charts
    ///
    /// Accepts #rgb, #rrggbb or a CSS color name. Default: from config or #1f77b4.
    #[arg(long, value_name = "COLOR")]
    pub color: Option<String>,

    /// Output file path for the report ("-" for stdout)
    ///
    /// Default: from config or sales_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, html, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Directory for the SVG charts of a Markdown report
    ///
    /// Default: "<output name>_charts" next to the report.
    #[arg(long, value_name = "DIR")]
    pub charts_dir: Option<PathBuf>,

    /// Field delimiter of the input file
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Print the branches found in the input and exit
    #[arg(long, requires = "input")]
    pub list_branches: bool,

    /// Serve the upload form in the browser instead of writing a report
    #[arg(long, conflicts_with = "list_branches")]
    pub serve: bool,

    /// Address for --serve
    ///
    /// Default: from config or 127.0.0.1:8501
    #[arg(long, value_name = "ADDR", requires = "serve")]
    pub bind: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .salescope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .salescope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format with SVG chart files (default)
    #[default]
    Markdown,
    /// Self-contained HTML page with inline charts
    Html,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref color) = self.color {
            if !is_valid_color(color) {
                return Err(format!(
                    "Invalid color '{}': use #rgb, #rrggbb or a CSS color name",
                    color
                ));
            }
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
        }

        if self.serve && self.input.is_some() {
            return Err("--serve takes its data from the upload form, not --input".to_string());
        }

        // Validate input file if provided
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Returns true when the report goes to stdout.
    pub fn writes_to_stdout(&self) -> bool {
        self.output.as_deref().map_or(false, |p| p.as_os_str() == "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_args() -> Args {
        Args {
            input: None,
            branch: None,
            color: None,
            output: None,
            format: OutputFormat::Markdown,
            charts_dir: None,
            delimiter: None,
            list_branches: false,
            serve: false,
            bind: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "salescope",
            "--branch",
            "Norte",
            "--format",
            "html",
            "--color",
            "#ff0000",
            "-o",
            "-",
        ])
        .unwrap();

        assert_eq!(args.branch.as_deref(), Some("Norte"));
        assert_eq!(args.format, OutputFormat::Html);
        assert_eq!(args.color.as_deref(), Some("#ff0000"));
        assert!(args.writes_to_stdout());
    }

    #[test]
    fn test_list_branches_requires_input() {
        assert!(Args::try_parse_from(["salescope", "--list-branches"]).is_err());
    }

    #[test]
    fn test_bind_requires_serve() {
        assert!(Args::try_parse_from(["salescope", "--bind", "0.0.0.0:80"]).is_err());
        assert!(Args::try_parse_from(["salescope", "--serve", "--bind", "0.0.0.0:80"]).is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_color() {
        let mut args = make_args();
        args.color = Some("blue!".to_string());
        assert!(args.validate().is_err());

        args.color = Some("#1f77b4".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = make_args();

        args.input = Some(temp_dir.path().join("missing.csv"));
        assert!(args.validate().is_err());

        args.input = Some(temp_dir.path().to_path_buf());
        assert!(args.validate().is_err());

        let file = temp_dir.path().join("ventas.csv");
        std::fs::write(&file, "Sucursal\n").unwrap();
        args.input = Some(file);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_no_input_is_valid() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
