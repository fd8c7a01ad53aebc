//! Normalizer configuration loaded from TOML or JSON files.
//!
//! Settings live under a caller-chosen section so they can share a file with the rest of an
//! application's configuration:
//!
//! ```toml
//! [ingest]
//! time_zone = "Europe/Moscow"      # default for every timestamp column
//!
//! [ingest.columns.created_at]
//! formats = ["%d %m %Y", "%Y-%m-%d"]
//!
//! [ingest.columns.shipped_at]
//! formats = ["%d/%m/%Y %H:%M"]
//! time_zone = "Asia/Tokyo"         # overrides the section default
//! ```
//!
//! A missing section yields an empty [`IngestConfig`], which leaves schemas unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{IngestionError, IngestionResult};
use crate::normalize::{DateTimeNormalizer, ISO8601_FORMATS};
use crate::types::{DataType, Field, Schema};

/// Timestamp settings for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSettings {
    /// Formats tried in order. Empty means [`ISO8601_FORMATS`].
    pub formats: Vec<String>,
    /// Target time zone; falls back to [`IngestConfig::time_zone`].
    pub time_zone: Option<String>,
}

/// One configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Default target time zone for timestamp columns.
    pub time_zone: Option<String>,
    /// Per-column settings, keyed by schema field name.
    pub columns: BTreeMap<String, ColumnSettings>,
}

impl IngestConfig {
    /// Parse `section` out of TOML text.
    pub fn from_toml_str(input: &str, section: &str) -> Result<Self, String> {
        let table: toml::Table = toml::from_str(input).map_err(|e| e.to_string())?;
        match table.get(section) {
            None => Ok(Self::default()),
            Some(value) => value.clone().try_into().map_err(|e: toml::de::Error| e.to_string()),
        }
    }

    /// Parse `section` out of a JSON object.
    pub fn from_json_str(input: &str, section: &str) -> Result<Self, String> {
        let root: serde_json::Value = serde_json::from_str(input).map_err(|e| e.to_string())?;
        let obj = root
            .as_object()
            .ok_or_else(|| "top-level json value must be an object".to_string())?;
        match obj.get(section) {
            None => Ok(Self::default()),
            Some(value) => Self::deserialize(value).map_err(|e| e.to_string()),
        }
    }

    /// Build the normalizer configured for `column`.
    ///
    /// Returns `Ok(None)` when neither the column nor the section configures anything.
    /// Unknown time zones fail with [`IngestionError::Normalization`].
    pub fn normalizer_for(&self, column: &str) -> IngestionResult<Option<DateTimeNormalizer>> {
        let settings = self.columns.get(column);
        if settings.is_none() && self.time_zone.is_none() {
            return Ok(None);
        }

        let formats: Vec<String> = match settings {
            Some(s) if !s.formats.is_empty() => s.formats.clone(),
            _ => ISO8601_FORMATS.iter().map(|f| f.to_string()).collect(),
        };
        let time_zone = settings
            .and_then(|s| s.time_zone.as_deref())
            .or(self.time_zone.as_deref());

        Ok(Some(DateTimeNormalizer::new(formats, None, time_zone)?))
    }

    /// Bind configured normalizers to the timestamp fields of `schema`.
    ///
    /// Every configured column must exist in the schema with [`DataType::Timestamp`].
    pub fn apply(&self, schema: &Schema) -> IngestionResult<Schema> {
        for name in self.columns.keys() {
            match schema.fields.iter().find(|f| &f.name == name) {
                Some(f) if f.data_type == DataType::Timestamp => {}
                Some(f) => {
                    return Err(IngestionError::SchemaMismatch {
                        message: format!(
                            "configured column '{name}' has type {:?}, expected Timestamp",
                            f.data_type
                        ),
                    });
                }
                None => {
                    return Err(IngestionError::SchemaMismatch {
                        message: format!("configured column '{name}' is not in the schema"),
                    });
                }
            }
        }

        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let bound = match field.data_type {
                DataType::Timestamp => self.normalizer_for(&field.name)?,
                _ => None,
            };
            fields.push(match bound {
                Some(normalizer) => Field::timestamp(field.name.clone(), normalizer),
                None => field.clone(),
            });
        }
        Ok(Schema::new(fields))
    }
}

/// Load `section` from a config file.
///
/// `.json` files are parsed as JSON; anything else as TOML.
pub fn load_ingest_config(path: impl AsRef<Path>, section: &str) -> IngestionResult<IngestConfig> {
    let path = path.as_ref();
    let input = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        IngestConfig::from_json_str(&input, section)
    } else {
        IngestConfig::from_toml_str(&input, section)
    };
    let config = parsed.map_err(|message| IngestionError::Config {
        path: path.to_path_buf(),
        message,
    })?;
    tracing::debug!(
        path = %path.display(),
        section,
        columns = config.columns.len(),
        "loaded ingest config"
    );
    Ok(config)
}
