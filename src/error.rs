//! Error types for loading and validating sales data.
//!
//! Everything that can go wrong between the raw CSV bytes and a list of
//! typed [`SalesRecord`](crate::models::SalesRecord)s is a [`SalesError`].
//! Application layers wrap these in `anyhow` with context.

use thiserror::Error;

/// Errors raised while reading a sales table.
#[derive(Debug, Error)]
pub enum SalesError {
    /// The input could not be read.
    #[error("failed to read sales data: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV layer rejected the input (bad quoting, invalid UTF-8, ...).
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The input has no header row at all.
    #[error("the sales file is empty (no header row)")]
    EmptyHeader,

    /// One or more required columns are absent from the header row.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A field could not be converted to its typed value.
    #[error("row {row}: invalid value {value:?} in column '{column}'")]
    Parse {
        /// 1-indexed data row (the header is not counted).
        row: usize,
        column: String,
        value: String,
    },
}

/// Convenience alias used by the loader.
pub type SalesResult<T> = std::result::Result<T, SalesError>;
