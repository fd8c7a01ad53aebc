//! `timestamp-ingest` ingests tabular files into an in-memory [`types::DataSet`] and normalizes
//! timestamp columns on the way in.
//!
//! The core piece is [`normalize::DateTimeNormalizer`]. It turns a raw cell (text, a date or a
//! timestamp) into a single [`types::Timestamp`]. Text is tried against an ordered list of
//! strftime-style formats, first match wins; without formats an optional custom parser is used.
//! If a time zone is configured, every result is converted into it.
//!
//! ## Normalizing values
//!
//! ```rust
//! use timestamp_ingest::normalize::DateTimeNormalizer;
//! use timestamp_ingest::types::Value;
//!
//! # fn main() -> Result<(), timestamp_ingest::NormalizationError> {
//! let n = DateTimeNormalizer::new(["%d %m %Y", "%Y-%m-%d"], None, Some("UTC"))?;
//! let ts = n.normalize(&Value::Utf8("18 9 2018".to_string()))?;
//! assert_eq!(ts.to_string(), "2018-09-18T00:00:00+00:00");
//!
//! // Unknown zones are rejected up front.
//! assert!(DateTimeNormalizer::new(Vec::<String>::new(), None, Some("Not/AZone")).is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Ingesting files
//!
//! Schema fields of type [`types::DataType::Timestamp`] carry a normalizer. [`types::Field::new`]
//! binds an ISO 8601 default; [`types::Field::timestamp`] binds a custom one. Normalizers can
//! also come from a config file via [`config::load_ingest_config`].
//!
//! ```no_run
//! use timestamp_ingest::config::load_ingest_config;
//! use timestamp_ingest::ingestion::{ingest_from_path, IngestionOptions};
//! use timestamp_ingest::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), timestamp_ingest::IngestionError> {
//! let schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("listed_at", DataType::Timestamp),
//! ]);
//! let schema = load_ingest_config("app.toml", "ingest")?.apply(&schema)?;
//!
//! // Auto-detects by extension (.csv/.json/.parquet/.xlsx/...).
//! let ds = ingest_from_path("listings.csv", &schema, &IngestionOptions::default())?;
//! println!("rows={}", ds.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! **File formats:**
//!
//! - **CSV**: `.csv`
//! - **JSON**: `.json` (array-of-objects) and `.ndjson` (newline-delimited objects)
//! - **Parquet**: `.parquet`, `.pq`
//! - **Excel/workbooks** (Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! Across formats, empty cells / empty strings / explicit JSON `null` map to [`types::Value::Null`].
//! A cell that fails normalization fails ingestion with [`IngestionError::ParseError`].
//!
//! ## Modules
//!
//! - [`normalize`]: the timestamp normalizer
//! - [`ingestion`]: unified ingestion entrypoints and format-specific implementations
//! - [`config`]: per-column normalizer settings from TOML/JSON files
//! - [`execution`]: parallel column normalization for datasets already in memory
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: error types
//!
//! ## Logging
//!
//! The crate never prints. It emits [`tracing`] events (format attempts at `trace`, zone
//! resolution and per-file progress at `debug`); install a subscriber to see them.

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod normalize;
pub mod types;

pub use error::{IngestionError, IngestionResult, NormalizationError, NormalizationResult};
pub use normalize::DateTimeNormalizer;
pub use types::Timestamp;
