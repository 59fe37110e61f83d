//! Catalog tables on disk and in memory.
//!
//! Catalogs are `polars` DataFrames read from and written to CSV or Parquet,
//! chosen by file extension. The uniformizer only needs three things from a
//! table: numeric columns by name, a row-index `take`, and an atomic write.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Result, UniformizeError};

/// On-disk table encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Pick the format from a path's extension (`.csv`, `.parquet`, `.pq`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(UniformizeError::configuration(format!(
                "Unsupported table format for {:?} (expected .csv or .parquet)",
                path
            ))),
        }
    }
}

/// Read a whole catalog into memory.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let format = TableFormat::from_path(path)?;
    let file = File::open(path).map_err(|e| UniformizeError::io(path, e))?;
    let df = match format {
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(file)
            .finish()?,
        TableFormat::Parquet => ParquetReader::new(file).finish()?,
    };
    Ok(df)
}

/// Write `df` to `path`, replacing any existing file only once the write
/// has completed.
///
/// The table is written to a sibling `.tmp` file and renamed into place; on
/// failure the temporary file is removed and `path` is left untouched.
pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    let format = TableFormat::from_path(path)?;
    let temp_path = temp_path_for(path);
    let result = write_format(df, &temp_path, format);
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, path).map_err(|e| UniformizeError::io(path, e))
}

fn write_format(df: &mut DataFrame, path: &Path, format: TableFormat) -> Result<()> {
    let mut file = File::create(path).map_err(|e| UniformizeError::io(path, e))?;
    match format {
        TableFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df)?,
        TableFormat::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
    }
    file.sync_all().map_err(|e| UniformizeError::io(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Series> {
    if !has_column(df, name) {
        return Err(UniformizeError::missing_column(name));
    }
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Float32
        | DataType::Float64
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Null => {}
        other => {
            return Err(UniformizeError::NonNumericColumn {
                column: name.to_string(),
                dtype: other.to_string(),
            });
        }
    }
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series)
}

/// A required numeric column as `f64`; nulls are an error.
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column_as_f64(df, name)?;
    let values = series.f64()?;
    if values.null_count() > 0 {
        return Err(UniformizeError::NullValues {
            column: name.to_string(),
            count: values.null_count(),
        });
    }
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// A numeric column as `f64` with nulls mapped to NaN.
pub fn float_column_lossy(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column_as_f64(df, name)?;
    let values = series.f64()?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Check a table is small enough to address every row with an index.
pub fn check_row_count(df: &DataFrame) -> Result<()> {
    let rows = df.height();
    if IdxSize::try_from(rows).is_err() {
        return Err(UniformizeError::TooManyRows { rows });
    }
    Ok(())
}

/// New table holding the rows `order` of `df`, in that order, with every
/// column preserved.
pub fn take_rows(df: &DataFrame, order: &[usize]) -> Result<DataFrame> {
    let indices = order
        .iter()
        .map(|&row| IdxSize::try_from(row).map_err(|_| UniformizeError::TooManyRows { rows: row }))
        .collect::<Result<Vec<IdxSize>>>()?;
    let idx = IdxCa::from_vec("row".into(), indices);
    Ok(df.take(&idx)?)
}
