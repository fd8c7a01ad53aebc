//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - performs ingestion into an in-memory [`crate::types::DataSet`]
//! - normalizes timestamp fields through their [`crate::normalize::DateTimeNormalizer`]
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - `excel` (feature `excel`)
//!
//! Supporting helpers: [`discovery`] (find inputs under a directory), [`text`] (read text with
//! optional encoding detection) and `xlsx` (feature `excel_writer`, legacy workbook conversion).

use std::sync::LazyLock;

use crate::error::{IngestionError, IngestionResult};
use crate::normalize::DateTimeNormalizer;
use crate::types::{Field, Value};

pub mod csv;
pub mod discovery;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod text;
pub mod unified;
#[cfg(feature = "excel_writer")]
pub mod xlsx;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use unified::{
    ingest_from_dir, ingest_from_path, ExcelSheetSelection, IngestionFormat, IngestionOptions, IngestionRequest,
};

static DEFAULT_NORMALIZER: LazyLock<DateTimeNormalizer> = LazyLock::new(DateTimeNormalizer::iso8601);

/// Normalize one cell of a timestamp field, reporting failures as [`IngestionError::ParseError`].
pub(crate) fn normalize_cell(row: usize, field: &Field, value: &Value, raw: &str) -> IngestionResult<Value> {
    let normalizer = field.normalizer.as_ref().unwrap_or(&DEFAULT_NORMALIZER);
    normalizer
        .normalize(value)
        .map(Value::Timestamp)
        .map_err(|e| IngestionError::ParseError {
            row,
            column: field.name.clone(),
            raw: raw.to_string(),
            message: e.to_string(),
        })
}
