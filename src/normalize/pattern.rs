//! Single-pattern parsing.
//!
//! The whole input must match the strftime pattern. Fields the pattern leaves out take the C
//! `strptime` defaults: year 1900, January, day 1, midnight. A parsed offset makes the result
//! aware; otherwise it is naive.

use chrono::format::{self, Parsed, StrftimeItems};

use crate::types::Timestamp;

const DEFAULT_YEAR: i64 = 1900;

/// Parse `value` against one strftime `format`.
pub(crate) fn parse_with_format(value: &str, format: &str) -> Option<Timestamp> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, value, StrftimeItems::new(format)).ok()?;

    if parsed.timestamp().is_none() {
        fill_date_defaults(&mut parsed).ok()?;
        fill_time_defaults(&mut parsed).ok()?;
    }

    if parsed.offset().is_some() {
        parsed.to_datetime().ok().map(Timestamp::Aware)
    } else {
        parsed
            .to_naive_datetime_with_offset(0)
            .ok()
            .map(Timestamp::Naive)
    }
}

fn fill_date_defaults(parsed: &mut Parsed) -> format::ParseResult<()> {
    let has_year = parsed.year().is_some()
        || parsed.year_div_100().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.isoyear_mod_100().is_some();
    if !has_year {
        parsed.set_year(DEFAULT_YEAR)?;
    }

    // Week numbers and day-of-year pin the date on their own.
    let has_week_or_ordinal = parsed.ordinal().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some()
        || parsed.isoweek().is_some();
    if !has_week_or_ordinal {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }
    Ok(())
}

fn fill_time_defaults(parsed: &mut Parsed) -> format::ParseResult<()> {
    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        // `%p` without an hour.
        (Some(_), None) => parsed.set_hour12(12)?,
        // `%I` without `%p` reads as AM.
        (None, Some(_)) => parsed.set_ampm(false)?,
        (Some(_), Some(_)) => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    if parsed.second().is_none() {
        parsed.set_second(0)?;
    }
    Ok(())
}
