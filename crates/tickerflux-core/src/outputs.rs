use std::fmt;
use std::io::Cursor;

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{DataFrame, JsonFormat, JsonWriter, PolarsError, SerWriter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Parquet,
    /// A single JSON array with one object per row.
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "application/octet-stream",
            OutputFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("column `{column}` still holds {nulls} null values")]
    NullsRemaining { column: String, nulls: usize },
    #[error("failed to write {format} output: {source}")]
    Write {
        format: OutputFormat,
        #[source]
        source: PolarsError,
    },
}

/// Serializes the normalized table. Refuses tables that still contain nulls.
pub fn serialize(df: &DataFrame, format: OutputFormat) -> Result<Vec<u8>, OutputError> {
    ensure_no_nulls(df)?;

    let written = match format {
        OutputFormat::Parquet => create_parquet_bytes(df),
        OutputFormat::Json => create_json_bytes(df),
    };
    written.map_err(|source| OutputError::Write { format, source })
}

pub fn ensure_no_nulls(df: &DataFrame) -> Result<(), OutputError> {
    match df.get_columns().iter().find(|column| column.null_count() > 0) {
        Some(column) => Err(OutputError::NullsRemaining {
            column: column.name().to_string(),
            nulls: column.null_count(),
        }),
        None => Ok(()),
    }
}

fn create_parquet_bytes(df: &DataFrame) -> Result<Vec<u8>, PolarsError> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

fn create_json_bytes(df: &DataFrame) -> Result<Vec<u8>, PolarsError> {
    let mut buffer = Vec::new();
    let mut clone = df.clone();
    JsonWriter::new(&mut buffer)
        .with_json_format(JsonFormat::Json)
        .finish(&mut clone)?;
    Ok(buffer)
}
