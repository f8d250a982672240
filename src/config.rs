//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.salescope.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".salescope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input table settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Upload form server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "sales_report.md".to_string()
}

/// Input table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field delimiter (a single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Branch selector value meaning "no filter".
    #[serde(default = "default_all_branches_label")]
    pub all_branches_label: String,

    /// Header names of the required columns.
    #[serde(default)]
    pub columns: ColumnConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            all_branches_label: default_all_branches_label(),
            columns: ColumnConfig::default(),
        }
    }
}

impl InputConfig {
    /// Returns the delimiter as a byte, falling back to a comma.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.bytes().next().unwrap_or(b',')
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_all_branches_label() -> String {
    "Todas".to_string()
}

/// Header names of the seven required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_branch_column")]
    pub branch: String,
    #[serde(default = "default_product_column")]
    pub product: String,
    #[serde(default = "default_year_column")]
    pub year: String,
    #[serde(default = "default_month_column")]
    pub month: String,
    #[serde(default = "default_revenue_column")]
    pub revenue_total: String,
    #[serde(default = "default_cost_column")]
    pub cost_total: String,
    #[serde(default = "default_units_column")]
    pub units_sold: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            branch: default_branch_column(),
            product: default_product_column(),
            year: default_year_column(),
            month: default_month_column(),
            revenue_total: default_revenue_column(),
            cost_total: default_cost_column(),
            units_sold: default_units_column(),
        }
    }
}

fn default_branch_column() -> String {
    "Sucursal".to_string()
}

fn default_product_column() -> String {
    "Producto".to_string()
}

fn default_year_column() -> String {
    "Año".to_string()
}

fn default_month_column() -> String {
    "Mes".to_string()
}

fn default_revenue_column() -> String {
    "Ingreso_total".to_string()
}

fn default_cost_column() -> String {
    "Costo_total".to_string()
}

fn default_units_column() -> String {
    "Unidades_vendidas".to_string()
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Colour of the units-sold line.
    #[serde(default = "default_line_color")]
    pub line_color: String,

    /// Colour of the dashed trend overlay.
    #[serde(default = "default_trend_color")]
    pub trend_color: String,

    /// Chart width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Chart height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            line_color: default_line_color(),
            trend_color: default_trend_color(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Default line colour, the classic plotting blue.
pub fn default_line_color() -> String {
    "#1f77b4".to_string()
}

fn default_trend_color() -> String {
    "gray".to_string()
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    480
}

/// Upload form server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

/// Returns true for `#rgb`, `#rrggbb` or a plain CSS colour name.
pub fn is_valid_color(color: &str) -> bool {
    if let Some(hex) = color.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !color.is_empty() && color.len() <= 32 && color.chars().all(|c| c.is_ascii_alphabetic())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.input.delimiter.len() != 1 || !self.input.delimiter.is_ascii() {
            bail!(
                "Delimiter must be a single ASCII character, got {:?}",
                self.input.delimiter
            );
        }
        if self.input.all_branches_label.trim().is_empty() {
            bail!("All-branches label must not be empty");
        }
        for color in [&self.chart.line_color, &self.chart.trend_color] {
            if !is_valid_color(color) {
                bail!("Invalid chart color: {}", color);
            }
        }
        if self.chart.width < 200 || self.chart.height < 150 {
            bail!("Chart must be at least 200x150 pixels");
        }
        if self.server.max_upload_bytes == 0 {
            bail!("Max upload size must be at least 1 byte");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(ref color) = args.color {
            self.chart.line_color = color.clone();
        }

        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }

        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter.to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "sales_report.md");
        assert_eq!(config.input.all_branches_label, "Todas");
        assert_eq!(config.input.columns.year, "Año");
        assert_eq!(config.chart.line_color, "#1f77b4");
        assert_eq!(config.input.delimiter_byte(), b',');
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r##"
[general]
output = "ventas.html"
verbose = true

[input]
delimiter = ";"

[input.columns]
branch = "Tienda"

[chart]
line_color = "#ff0000"
width = 1024
"##;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "ventas.html");
        assert!(config.general.verbose);
        assert_eq!(config.input.delimiter_byte(), b';');
        assert_eq!(config.input.columns.branch, "Tienda");
        assert_eq!(config.input.columns.product, "Producto");
        assert_eq!(config.chart.line_color, "#ff0000");
        assert_eq!(config.chart.width, 1024);
        assert_eq!(config.chart.height, 480);
        assert_eq!(config.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[input.columns]"));
        assert!(toml_str.contains("[chart]"));
        assert!(toml_str.contains("[server]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.input.columns, ColumnConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.input.delimiter = ";;".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chart.line_color = "#12345".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chart.width = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_valid_color() {
        assert!(is_valid_color("#1f77b4"));
        assert!(is_valid_color("#FFF"));
        assert!(is_valid_color("gray"));
        assert!(!is_valid_color("#ggg"));
        assert!(!is_valid_color("red; stroke: x"));
        assert!(!is_valid_color(""));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[chart]\ntrend_color = \"#999\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chart.trend_color, "#999");
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[chart]\nline_color = \"not a color\"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
