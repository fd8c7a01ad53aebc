//! Core data model types for ingestion.
//!
//! This crate ingests supported formats into an in-memory [`DataSet`], using a user-provided
//! [`Schema`] (a list of typed [`Field`]s). Timestamp fields carry the
//! [`DateTimeNormalizer`] that turns raw cells into [`Timestamp`]s.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::normalize::DateTimeNormalizer;

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Calendar date plus time-of-day, produced by the field's [`DateTimeNormalizer`].
    Timestamp,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Normalizer used for [`DataType::Timestamp`] fields; `None` for every other type.
    pub normalizer: Option<DateTimeNormalizer>,
}

impl Field {
    /// Create a new field.
    ///
    /// [`DataType::Timestamp`] fields get [`DateTimeNormalizer::iso8601`]; use
    /// [`Field::timestamp`] to bind a specific normalizer.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let normalizer = (data_type == DataType::Timestamp).then(DateTimeNormalizer::iso8601);
        Self {
            name: name.into(),
            data_type,
            normalizer,
        }
    }

    /// Create a timestamp field normalized by `normalizer`.
    pub fn timestamp(name: impl Into<String>, normalizer: DateTimeNormalizer) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Timestamp,
            normalizer: Some(normalizer),
        }
    }
}

/// A list of fields describing the expected shape of incoming data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A calendar date combined with a time-of-day, optionally carrying a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// Wall-clock time without zone information.
    Naive(NaiveDateTime),
    /// A fixed instant with its UTC offset.
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Local wall-clock date and time, dropping any offset.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::Naive(dt) => *dt,
            Self::Aware(dt) => dt.naive_local(),
        }
    }

    /// UTC offset, if the timestamp carries one.
    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Self::Naive(_) => None,
            Self::Aware(dt) => Some(*dt.offset()),
        }
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self::Naive(dt)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Aware(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Aware(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date without time-of-day.
    Date(NaiveDate),
    /// Date plus time-of-day.
    Timestamp(Timestamp),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => write!(f, "{s:?}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of the named column, in row order. Rows too short to hold the column read as null.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        static NULL: Value = Value::Null;
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|row| row.get(idx).unwrap_or(&NULL)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveTime;

    #[test]
    fn timestamp_fields_get_default_normalizer() {
        let f = Field::new("created_at", DataType::Timestamp);
        assert_eq!(f.normalizer, Some(DateTimeNormalizer::iso8601()));

        let g = Field::new("id", DataType::Int64);
        assert!(g.normalizer.is_none());
    }

    #[test]
    fn aware_timestamp_exposes_offset_and_wall_clock() {
        let dt = DateTime::parse_from_rfc3339("2021-07-08T12:34:25+09:00").unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts.offset(), FixedOffset::east_opt(9 * 3600));
        assert_eq!(
            ts.naive_local(),
            NaiveDate::from_ymd_opt(2021, 7, 8)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(12, 34, 25).unwrap())
        );
        assert_eq!(ts.to_string(), "2021-07-08T12:34:25+09:00");
    }

    #[test]
    fn column_returns_values_in_row_order() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
        let ds = DataSet::new(schema, vec![vec![Value::Int64(1)], vec![Value::Null]]);
        assert_eq!(ds.column("id"), Some(vec![&Value::Int64(1), &Value::Null]));
        assert_eq!(ds.column("missing"), None);
    }

    #[test]
    fn column_reads_short_rows_as_null() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64), Field::new("title", DataType::Utf8)]);
        let ds = DataSet::new(
            schema,
            vec![vec![Value::Int64(1), Value::Utf8("Desk lamp".to_string())], vec![Value::Int64(2)]],
        );
        assert_eq!(ds.column("title"), Some(vec![&Value::Utf8("Desk lamp".to_string()), &Value::Null]));
    }
}
