use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for timestamp normalization.
pub type NormalizationResult<T> = Result<T, NormalizationError>;

/// Failures of [`crate::normalize::DateTimeNormalizer`].
///
/// All variants are deterministic: retrying the same call with the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The configured time zone is not a known IANA identifier.
    #[error("unknown time zone '{name}'")]
    InvalidTimeZone { name: String },

    /// The value is neither text, a date, nor a timestamp.
    #[error("unable to convert {value} to a timestamp")]
    UnsupportedValueType { value: String },

    /// No configured format (or the custom parser) accepted the text.
    ///
    /// `formats` is empty when the custom parser rejected the value.
    #[error("{}", unparsable_message(.value, .formats))]
    UnparsableValue { value: String, formats: Vec<String> },
}

fn unparsable_message(value: &str, formats: &[String]) -> String {
    if formats.is_empty() {
        format!("unable to convert \"{value}\" to a timestamp")
    } else {
        format!("value \"{value}\" does not match any of the formats {formats:?}")
    }
}

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV/JSON/Parquet (and optional Excel) ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel ingestion error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel_writer")]
    /// Error while writing an `.xlsx` workbook.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet ingestion error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Input discovery error (bad glob pattern or unreadable directory entry).
    #[error("discovery error: {message}")]
    Discovery { message: String },

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// A normalizer could not be built (e.g. unknown time zone in configuration).
    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// A configuration file could not be parsed.
    #[error("config error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}
