use std::sync::{Arc, Once};

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use timestamp_ingest::normalize::{DateTimeNormalizer, DateTimeParser};
use timestamp_ingest::types::{Timestamp, Value};
use timestamp_ingest::NormalizationError;

static TRACING: Once = Once::new();

// RUST_LOG=timestamp_ingest=trace shows every format attempt.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn naive(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
}

#[test]
fn day_first_format_yields_midnight() {
    init_tracing();
    let n = DateTimeNormalizer::new(["%d %m %Y"], None, None).unwrap();
    let ts = n.normalize(&Value::Utf8("18 9 2018".to_string())).unwrap();
    assert_eq!(ts, Timestamp::Naive(naive(2018, 9, 18, 0, 0, 0)));
}

#[test]
fn custom_parser_is_used_without_formats() {
    init_tracing();
    let fixed = Timestamp::Naive(naive(2018, 9, 18, 0, 0, 0));
    let parser: DateTimeParser = Arc::new(move |_: &str| -> Result<Timestamp, String> { Ok(fixed) });
    let n = DateTimeNormalizer::new(Vec::<String>::new(), Some(parser), None).unwrap();

    assert_eq!(n.normalize(&Value::Utf8("anything at all".to_string())).unwrap(), fixed);
}

#[test]
fn formats_take_precedence_over_parser() {
    init_tracing();
    let parser: DateTimeParser = Arc::new(|_: &str| -> Result<Timestamp, String> { Err("never".to_string()) });
    let n = DateTimeNormalizer::new(["%d $m %Y"], Some(parser), None).unwrap();

    let err = n.normalize(&Value::Utf8("18 9 2018".to_string())).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::UnparsableValue {
            value: "18 9 2018".to_string(),
            formats: vec!["%d $m %Y".to_string()],
        }
    );
}

#[test]
fn utc_zone_keeps_instant() {
    init_tracing();
    let n = DateTimeNormalizer::new(Vec::<String>::new(), None, Some("UTC")).unwrap();
    let ts = n
        .normalize(&Value::Timestamp(Timestamp::Naive(naive(2018, 9, 18, 0, 0, 0))))
        .unwrap();

    let expected = FixedOffset::east_opt(0)
        .unwrap()
        .from_local_datetime(&naive(2018, 9, 18, 0, 0, 0))
        .unwrap();
    assert_eq!(ts, Timestamp::Aware(expected));
}

#[test]
fn unknown_zone_is_rejected_at_construction() {
    let err = DateTimeNormalizer::new(Vec::<String>::new(), None, Some("Not/AZone")).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::InvalidTimeZone {
            name: "Not/AZone".to_string()
        }
    );
}

#[test]
fn non_temporal_values_are_unsupported() {
    let n = DateTimeNormalizer::iso8601();
    for value in [Value::Int64(7), Value::Float64(1.5), Value::Bool(true), Value::Null] {
        let err = n.normalize(&value).unwrap_err();
        assert!(matches!(err, NormalizationError::UnsupportedValueType { .. }), "{value:?}");
    }
}

#[test]
fn aware_values_are_shifted_into_zone() {
    init_tracing();
    let n = DateTimeNormalizer::iso8601().in_time_zone("Europe/Berlin").unwrap();

    let winter = n.normalize_str("2018-01-15T12:00:00+00:00").unwrap();
    let summer = n.normalize_str("2018-07-15T12:00:00+00:00").unwrap();
    assert_eq!(winter.to_string(), "2018-01-15T13:00:00+01:00");
    assert_eq!(summer.to_string(), "2018-07-15T14:00:00+02:00");
}

#[test]
fn normalizer_is_shareable_across_threads() {
    let n = Arc::new(DateTimeNormalizer::with_formats(["%d %m %Y"]));
    let handles: Vec<_> = (1..=4)
        .map(|day| {
            let n = Arc::clone(&n);
            std::thread::spawn(move || n.normalize_str(&format!("{day} 9 2018")).unwrap())
        })
        .collect();

    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), Timestamp::Naive(naive(2018, 9, i as u32 + 1, 0, 0, 0)));
    }
}

#[test]
fn partial_format_wins_before_later_complete_one() {
    init_tracing();
    let n = DateTimeNormalizer::with_formats(["%Y-%m-%d %H", "%Y-%m-%d %H:%M"]);
    assert_eq!(n.normalize_str("2021-07-08 12").unwrap(), Timestamp::Naive(naive(2021, 7, 8, 12, 0, 0)));
    assert_eq!(n.normalize_str("2021-07-08 12:30").unwrap(), Timestamp::Naive(naive(2021, 7, 8, 12, 30, 0)));

    let months = DateTimeNormalizer::with_formats(["%b %Y", "%Y"]);
    assert_eq!(months.normalize_str("Sep 2018").unwrap(), Timestamp::Naive(naive(2018, 9, 1, 0, 0, 0)));
    assert_eq!(months.normalize_str("2018").unwrap(), Timestamp::Naive(naive(2018, 1, 1, 0, 0, 0)));
}
