//! Parquet ingestion implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Field as SchemaField, Schema, Timestamp, Value};

use super::normalize_cell;

/// Ingest a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - Validates that all schema fields exist as Parquet leaf columns (by column path string)
/// - Uses the Parquet record API (`RowIter`) for a first implementation
/// - Timestamp fields accept `DATE`, `TIMESTAMP(MILLIS|MICROS)` and string columns
pub fn ingest_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns = parquet_leaf_column_paths(&reader);
    for field in &schema.fields {
        if !available_columns.contains(field.name.as_str()) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("missing required column '{}'", field.name),
            });
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        // Build a name->Field map for lookup.
        let mut map: HashMap<&str, &Field> = HashMap::new();
        for (name, field) in row.get_column_iter() {
            map.insert(name.as_str(), field);
        }

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = map.get(f.name.as_str()).ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("row {row_num} missing required column '{}'", f.name),
            })?;
            out_row.push(convert_parquet_field(row_num, f, v)?);
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> HashSet<String> {
    let mut set = HashSet::new();
    let cols = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns();
    for c in cols {
        set.insert(c.path().string());
    }
    set
}

fn convert_parquet_field(row: usize, field: &SchemaField, f: &Field) -> IngestionResult<Value> {
    if matches!(f, Field::Null) {
        return Ok(Value::Null);
    }

    let column = field.name.as_str();
    match field.data_type {
        DataType::Utf8 => match f {
            Field::Str(s) => Ok(Value::Utf8(s.clone())),
            _ => Err(IngestionError::ParseError {
                row,
                column: column.to_string(),
                raw: f.to_string(),
                message: "expected string".to_string(),
            }),
        },
        DataType::Bool => match f {
            Field::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(IngestionError::ParseError {
                row,
                column: column.to_string(),
                raw: f.to_string(),
                message: "expected bool".to_string(),
            }),
        },
        DataType::Int64 => match f {
            Field::Byte(v) => Ok(Value::Int64(i64::from(*v))),
            Field::Short(v) => Ok(Value::Int64(i64::from(*v))),
            Field::Int(v) => Ok(Value::Int64(i64::from(*v))),
            Field::Long(v) => Ok(Value::Int64(*v)),
            Field::UByte(v) => Ok(Value::Int64(i64::from(*v))),
            Field::UShort(v) => Ok(Value::Int64(i64::from(*v))),
            Field::UInt(v) => Ok(Value::Int64(i64::from(*v))),
            Field::ULong(v) => i64::try_from(*v)
                .map(Value::Int64)
                .map_err(|_| IngestionError::ParseError {
                    row,
                    column: column.to_string(),
                    raw: f.to_string(),
                    message: "u64 out of range for i64".to_string(),
                }),
            _ => Err(IngestionError::ParseError {
                row,
                column: column.to_string(),
                raw: f.to_string(),
                message: "expected integer".to_string(),
            }),
        },
        DataType::Float64 => match f {
            Field::Float(v) => Ok(Value::Float64(f64::from(*v))),
            Field::Double(v) => Ok(Value::Float64(*v)),
            _ => Err(IngestionError::ParseError {
                row,
                column: column.to_string(),
                raw: f.to_string(),
                message: "expected number".to_string(),
            }),
        },
        DataType::Timestamp => {
            let raw = f.to_string();
            let value = match f {
                Field::Str(s) if s.trim().is_empty() => return Ok(Value::Null),
                Field::Str(s) => Some(Value::Utf8(s.clone())),
                Field::Date(days) => date_from_epoch_days(*days).map(Value::Date),
                Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms).map(utc_value),
                Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us).map(utc_value),
                // Plain scalars reach the normalizer, which rejects them as unsupported.
                Field::Bool(b) => Some(Value::Bool(*b)),
                Field::Byte(v) => Some(Value::Int64(i64::from(*v))),
                Field::Short(v) => Some(Value::Int64(i64::from(*v))),
                Field::Int(v) => Some(Value::Int64(i64::from(*v))),
                Field::Long(v) => Some(Value::Int64(*v)),
                Field::UByte(v) => Some(Value::Int64(i64::from(*v))),
                Field::UShort(v) => Some(Value::Int64(i64::from(*v))),
                Field::UInt(v) => Some(Value::Int64(i64::from(*v))),
                Field::ULong(v) => Some(i64::try_from(*v).map_or(Value::Float64(*v as f64), Value::Int64)),
                Field::Float(v) => Some(Value::Float64(f64::from(*v))),
                Field::Double(v) => Some(Value::Float64(*v)),
                _ => {
                    return Err(IngestionError::ParseError {
                        row,
                        column: column.to_string(),
                        raw,
                        message: "expected date, timestamp or string".to_string(),
                    });
                }
            };
            let value = value.ok_or_else(|| IngestionError::ParseError {
                row,
                column: column.to_string(),
                raw: raw.clone(),
                message: "timestamp out of range".to_string(),
            })?;
            normalize_cell(row, field, &value, &raw)
        }
    }
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::TimeDelta::days(i64::from(days)))
}

fn utc_value(dt: DateTime<Utc>) -> Value {
    Value::Timestamp(Timestamp::Aware(dt.fixed_offset()))
}
