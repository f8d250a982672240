//! Sales table loader.
//!
//! Reads a delimited sales export into typed [`SalesRecord`]s. Columns are
//! looked up by header name once, before any row is parsed, so a missing
//! column fails fast with the full list of what is missing. A row that
//! cannot be parsed fails the whole load.

use crate::config::{ColumnConfig, InputConfig};
use crate::error::{SalesError, SalesResult};
use crate::models::SalesRecord;
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Options for reading a sales table.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Header names of the required columns.
    pub columns: ColumnConfig,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            columns: ColumnConfig::default(),
        }
    }
}

impl From<&InputConfig> for LoadOptions {
    fn from(config: &InputConfig) -> Self {
        Self {
            delimiter: config.delimiter_byte(),
            columns: config.columns.clone(),
        }
    }
}

/// Positions of the required columns in the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    branch: usize,
    product: usize,
    year: usize,
    month: usize,
    revenue: usize,
    cost: usize,
    units: usize,
}

/// Loader for sales tables.
pub struct SalesLoader {
    options: LoadOptions,
}

impl SalesLoader {
    /// Create a new loader.
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load all records from a file on disk.
    pub fn load_path(&self, path: &Path) -> SalesResult<Vec<SalesRecord>> {
        info!("Loading sales data from {}", path.display());
        let file = File::open(path)?;
        self.load(file)
    }

    /// Load all records from in-memory CSV text.
    pub fn load_str(&self, text: &str) -> SalesResult<Vec<SalesRecord>> {
        self.load(text.as_bytes())
    }

    /// Load all records from any reader.
    pub fn load<R: Read>(&self, reader: R) -> SalesResult<Vec<SalesRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.options.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let index = self.resolve_columns(&headers)?;
        debug!("Resolved columns: {:?}", index);

        let mut records = Vec::new();
        for (i, result) in csv_reader.records().enumerate() {
            let row = result?;
            records.push(self.parse_row(&row, i + 1, &index)?);
        }

        info!("Loaded {} sales records", records.len());
        Ok(records)
    }

    /// Map every required column to its position, collecting all misses.
    fn resolve_columns(&self, headers: &StringRecord) -> SalesResult<ColumnIndex> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{FEFF}').trim())
            .collect();

        if names.iter().all(|n| n.is_empty()) {
            return Err(SalesError::EmptyHeader);
        }

        let cols = &self.options.columns;
        let mut missing = Vec::new();
        let mut find = |name: &str| -> usize {
            match names.iter().position(|h| *h == name) {
                Some(pos) => pos,
                None => {
                    missing.push(name.to_string());
                    usize::MAX
                }
            }
        };

        let index = ColumnIndex {
            branch: find(&cols.branch),
            product: find(&cols.product),
            year: find(&cols.year),
            month: find(&cols.month),
            revenue: find(&cols.revenue_total),
            cost: find(&cols.cost_total),
            units: find(&cols.units_sold),
        };

        if missing.is_empty() {
            Ok(index)
        } else {
            Err(SalesError::MissingColumns(missing))
        }
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        row_number: usize,
        index: &ColumnIndex,
    ) -> SalesResult<SalesRecord> {
        let cols = &self.options.columns;
        let field = |pos: usize| row.get(pos).unwrap_or("");

        let text = |pos: usize, column: &str| -> SalesResult<String> {
            let value = field(pos);
            if value.is_empty() {
                return Err(parse_error(row_number, column, value));
            }
            Ok(value.to_string())
        };

        let month: u32 = parse_field(field(index.month), row_number, &cols.month)?;
        if !(1..=12).contains(&month) {
            return Err(parse_error(row_number, &cols.month, field(index.month)));
        }

        Ok(SalesRecord {
            branch: text(index.branch, &cols.branch)?,
            product: text(index.product, &cols.product)?,
            year: parse_field(field(index.year), row_number, &cols.year)?,
            month,
            revenue_total: parse_number(field(index.revenue), row_number, &cols.revenue_total)?,
            cost_total: parse_number(field(index.cost), row_number, &cols.cost_total)?,
            units_sold: parse_number(field(index.units), row_number, &cols.units_sold)?,
        })
    }
}

impl Default for SalesLoader {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

fn parse_error(row: usize, column: &str, value: &str) -> SalesError {
    SalesError::Parse {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn parse_field<T: FromStr>(value: &str, row: usize, column: &str) -> SalesResult<T> {
    value.parse().map_err(|_| parse_error(row, column, value))
}

/// Parse a finite number; "NaN" and "inf" are rejected like any other garbage.
fn parse_number(value: &str, row: usize, column: &str) -> SalesResult<f64> {
    let number: f64 = parse_field(value, row, column)?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(parse_error(row, column, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "Sucursal,Producto,Año,Mes,Ingreso_total,Costo_total,Unidades_vendidas";

    fn load(text: &str) -> SalesResult<Vec<SalesRecord>> {
        SalesLoader::default().load_str(text)
    }

    #[test]
    fn test_load_sample_fixture() {
        let records = load(include_str!("../../fixtures/ventas.csv")).unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| (1..=12).contains(&r.month)));
    }

    #[test]
    fn test_load_typed_fields() {
        let csv = format!("{}\nNorte,Café,2023,7,1500.5,900,120\n", HEADER);
        let records = load(&csv).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.branch, "Norte");
        assert_eq!(r.product, "Café");
        assert_eq!(r.year, 2023);
        assert_eq!(r.month, 7);
        assert_eq!(r.revenue_total, 1500.5);
        assert_eq!(r.cost_total, 900.0);
        assert_eq!(r.units_sold, 120.0);
    }

    #[test]
    fn test_extra_columns_and_order_ignored() {
        let csv = "Notas,Unidades_vendidas,Costo_total,Ingreso_total,Mes,Año,Producto,Sucursal\n\
                   x,3,10,20,1,2024,Té,Sur\n";
        let records = load(csv).unwrap();
        assert_eq!(records[0].product, "Té");
        assert_eq!(records[0].units_sold, 3.0);
    }

    #[test]
    fn test_bom_and_whitespace_in_header() {
        let csv = "\u{FEFF}Sucursal, Producto ,Año,Mes,Ingreso_total,Costo_total,Unidades_vendidas\n\
                   Sur,Té,2024,1,20,10,3\n";
        assert_eq!(load(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_columns_enumerated() {
        let csv = "Sucursal,Producto,Año,Ingreso_total\nSur,Té,2024,20\n";
        match load(csv) {
            Err(SalesError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Mes", "Costo_total", "Unidades_vendidas"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(load(""), Err(SalesError::EmptyHeader)));
    }

    #[test]
    fn test_header_only_yields_no_records() {
        assert!(load(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_field_names_row() {
        let csv = format!(
            "{}\nSur,Té,2024,1,20,10,3\nSur,Té,2024,2,veinte,10,3\n",
            HEADER
        );
        match load(&csv) {
            Err(SalesError::Parse { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "Ingreso_total");
                assert_eq!(value, "veinte");
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        let csv = format!("{}\nSur,Té,2024,13,20,10,3\n", HEADER);
        assert!(matches!(
            load(&csv),
            Err(SalesError::Parse { ref column, .. }) if column == "Mes"
        ));
    }

    #[test]
    fn test_short_row_rejected() {
        let csv = format!("{}\nSur,Té,2024,1,20\n", HEADER);
        assert!(matches!(load(&csv), Err(SalesError::Parse { row: 1, .. })));
    }

    #[test]
    fn test_custom_delimiter_and_columns() {
        let options = LoadOptions {
            delimiter: b';',
            columns: ColumnConfig {
                branch: "Branch".to_string(),
                product: "Product".to_string(),
                year: "Year".to_string(),
                month: "Month".to_string(),
                revenue_total: "Revenue".to_string(),
                cost_total: "Cost".to_string(),
                units_sold: "Units".to_string(),
            },
        };
        let csv = "Branch;Product;Year;Month;Revenue;Cost;Units\nEast;Tea;2022;5;10;4;2\n";
        let records = SalesLoader::new(options).load_str(csv).unwrap();
        assert_eq!(records[0].branch, "East");
        assert_eq!(records[0].month, 5);
    }

    #[test]
    fn test_load_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ventas.csv");
        std::fs::write(&path, format!("{}\nSur,Té,2024,1,20,10,3\n", HEADER)).unwrap();

        let records = SalesLoader::default().load_path(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_path_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = SalesLoader::default().load_path(&temp_dir.path().join("nope.csv"));
        assert!(matches!(result, Err(SalesError::Io(_))));
    }
}
