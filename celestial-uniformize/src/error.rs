//! Error type for catalog uniformization.
//!
//! Every failure mode is detected before any output is produced, except
//! [`Io`](UniformizeError::Io) and [`Table`](UniformizeError::Table) errors
//! raised while writing. Per-record rejections (out of region, duplicate,
//! bucket full) are not errors; they are counted in the report.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`Configuration`](UniformizeError::Configuration) | Resolutions or region cell are not representable |
//! | [`MissingColumn`](UniformizeError::MissingColumn) | RA, Dec or sort column is absent from the table |
//! | [`NullValues`](UniformizeError::NullValues) | A coordinate column contains nulls |
//! | [`NonNumericColumn`](UniformizeError::NonNumericColumn) | A coordinate or sort column is not numeric |
//! | [`InvalidCoordinate`](UniformizeError::InvalidCoordinate) | A row has non-finite RA or Dec outside `[-90, 90]` |
//! | [`InvalidRegion`](UniformizeError::InvalidRegion) | A region cell list is not strictly ascending |
//! | [`TooManyRows`](UniformizeError::TooManyRows) | The table is too large to address with row indices |
//! | [`Io`](UniformizeError::Io) | A catalog file cannot be opened, created or renamed |
//! | [`Table`](UniformizeError::Table) | The table library fails to read, cast, take or write |

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UniformizeError {
    /// Invalid grid resolution, region cell, or combination of the two.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Column '{column}' not found in table")]
    MissingColumn { column: String },

    #[error("Column '{column}' contains {count} null values")]
    NullValues { column: String, count: usize },

    #[error("Column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    #[error("Row {row}: invalid coordinate (RA {ra}, Dec {dec})")]
    InvalidCoordinate { row: usize, ra: f64, dec: f64 },

    /// Region cell list violates its sorted-set invariant.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Table has {rows} rows, more than can be indexed")]
    TooManyRows { rows: usize },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table error: {0}")]
    Table(#[from] polars::error::PolarsError),
}

impl UniformizeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caught before any work on the table begins.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, UniformizeError>;
