//! Timestamp normalization for raw spreadsheet/text values.
//!
//! A [`DateTimeNormalizer`] is configured once (per column, typically) and then applied to many
//! values:
//!
//! - text is trimmed and parsed with the configured formats, tried **in order** (first match
//!   wins), or with a custom parser when no formats are configured
//! - timestamps pass through unchanged
//! - dates become timestamps at midnight
//! - anything else is rejected with [`NormalizationError::UnsupportedValueType`]
//!
//! If a time zone is configured, the result is re-expressed in that zone.
//!
//! ```rust
//! use timestamp_ingest::normalize::DateTimeNormalizer;
//! use timestamp_ingest::types::Value;
//!
//! let normalizer = DateTimeNormalizer::with_formats(["%d/%m/%Y", "%d %m %Y"]);
//! let ts = normalizer.normalize(&Value::Utf8(" 18 9 2018 ".to_string())).unwrap();
//! assert_eq!(ts.to_string(), "2018-09-18T00:00:00");
//! ```

mod pattern;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, trace};

use crate::error::{NormalizationError, NormalizationResult};
use crate::types::{Timestamp, Value};

/// Custom text parser used when a normalizer has no formats.
///
/// Returning `Err` marks the text as unparsable; the message is only used for diagnostics.
pub type DateTimeParser = Arc<dyn Fn(&str) -> Result<Timestamp, String> + Send + Sync>;

/// Formats used by [`DateTimeNormalizer::iso8601`], in fallback order.
pub const ISO8601_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d",
];

/// Converts raw values into [`Timestamp`]s.
///
/// Configuration is immutable after construction, so a normalizer can be shared freely across
/// threads and calls.
#[derive(Clone)]
pub struct DateTimeNormalizer {
    formats: Vec<String>,
    parser: Option<DateTimeParser>,
    time_zone: Option<Tz>,
}

impl DateTimeNormalizer {
    /// Create a normalizer.
    ///
    /// - `formats`: strftime patterns tried in order; may be empty
    /// - `parser`: used for text only when `formats` is empty
    /// - `time_zone`: IANA identifier (e.g. `"Europe/Moscow"`) results are converted into
    ///
    /// Fails with [`NormalizationError::InvalidTimeZone`] if `time_zone` is not a known zone.
    pub fn new<I, S>(
        formats: I,
        parser: Option<DateTimeParser>,
        time_zone: Option<&str>,
    ) -> NormalizationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let time_zone = time_zone.map(resolve_time_zone).transpose()?;
        Ok(Self {
            formats: formats.into_iter().map(Into::into).collect(),
            parser,
            time_zone,
        })
    }

    /// Normalizer that parses text with `formats` and performs no zone conversion.
    pub fn with_formats<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
            parser: None,
            time_zone: None,
        }
    }

    /// Normalizer that parses text with a custom function.
    pub fn with_parser<F>(parser: F) -> Self
    where
        F: Fn(&str) -> Result<Timestamp, String> + Send + Sync + 'static,
    {
        Self {
            formats: Vec::new(),
            parser: Some(Arc::new(parser)),
            time_zone: None,
        }
    }

    /// Normalizer for ISO 8601 style text (see [`ISO8601_FORMATS`]).
    pub fn iso8601() -> Self {
        Self::with_formats(ISO8601_FORMATS.iter().copied())
    }

    /// Return a copy of this normalizer that converts results into `time_zone`.
    pub fn in_time_zone(mut self, time_zone: &str) -> NormalizationResult<Self> {
        self.time_zone = Some(resolve_time_zone(time_zone)?);
        Ok(self)
    }

    /// Configured formats, in fallback order.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Configured target time zone.
    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone
    }

    /// Whether a custom parser is configured.
    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// Normalize one value into a timestamp.
    pub fn normalize(&self, value: &Value) -> NormalizationResult<Timestamp> {
        let ts = match value {
            Value::Utf8(s) => self.parse_text(s.trim())?,
            Value::Timestamp(ts) => *ts,
            Value::Date(d) => Timestamp::Naive(d.and_time(NaiveTime::MIN)),
            other => {
                return Err(NormalizationError::UnsupportedValueType {
                    value: other.to_string(),
                });
            }
        };
        Ok(self.convert(ts))
    }

    /// Normalize text; shorthand for `normalize(&Value::Utf8(..))`.
    pub fn normalize_str(&self, value: &str) -> NormalizationResult<Timestamp> {
        self.parse_text(value.trim()).map(|ts| self.convert(ts))
    }

    fn parse_text(&self, value: &str) -> NormalizationResult<Timestamp> {
        if self.formats.is_empty() {
            let parser = self.parser.as_ref().ok_or_else(|| NormalizationError::UnparsableValue {
                value: value.to_string(),
                formats: Vec::new(),
            })?;
            return parser(value).map_err(|message| {
                trace!(value, %message, "custom parser rejected value");
                NormalizationError::UnparsableValue {
                    value: value.to_string(),
                    formats: Vec::new(),
                }
            });
        }

        for format in &self.formats {
            if let Some(ts) = pattern::parse_with_format(value, format) {
                trace!(value, format = format.as_str(), "format matched");
                return Ok(ts);
            }
        }
        Err(NormalizationError::UnparsableValue {
            value: value.to_string(),
            formats: self.formats.clone(),
        })
    }

    fn convert(&self, ts: Timestamp) -> Timestamp {
        let Some(tz) = self.time_zone else {
            return ts;
        };
        // Naive wall-clock values are taken as UTC.
        let instant: DateTime<Utc> = match ts {
            Timestamp::Naive(dt) => dt.and_utc(),
            Timestamp::Aware(dt) => dt.with_timezone(&Utc),
        };
        Timestamp::Aware(instant.with_timezone(&tz).fixed_offset())
    }
}

fn resolve_time_zone(name: &str) -> NormalizationResult<Tz> {
    let tz = name
        .parse::<Tz>()
        .map_err(|_| NormalizationError::InvalidTimeZone {
            name: name.to_string(),
        })?;
    debug!(time_zone = tz.name(), "resolved time zone");
    Ok(tz)
}

impl fmt::Debug for DateTimeNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateTimeNormalizer")
            .field("formats", &self.formats)
            .field("parser_set", &self.parser.is_some())
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

/// Parsers compare by identity: two normalizers are equal only if they share the same parser.
impl PartialEq for DateTimeNormalizer {
    fn eq(&self, other: &Self) -> bool {
        let same_parser = match (&self.parser, &other.parser) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.formats == other.formats && self.time_zone == other.time_zone && same_parser
    }
}

impl Eq for DateTimeNormalizer {}
