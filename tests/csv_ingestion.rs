use chrono::{NaiveDate, NaiveDateTime};

use timestamp_ingest::ingestion::csv::{ingest_csv_from_path, ingest_csv_from_reader, ingest_csv_from_str};
use timestamp_ingest::normalize::DateTimeNormalizer;
use timestamp_ingest::types::{DataType, Field, Schema, Timestamp, Value};
use timestamp_ingest::IngestionError;

fn listed_at(y: i32, m: u32, d: u32) -> Value {
    let dt: NaiveDateTime = NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
    Value::Timestamp(Timestamp::Naive(dt))
}

fn listings_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("title", DataType::Utf8),
        Field::new("price", DataType::Float64),
        Field::new("active", DataType::Bool),
        Field::timestamp("listed_at", DateTimeNormalizer::with_formats(["%d %m %Y", "%Y-%m-%d"])),
    ])
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let ds = ingest_csv_from_path("tests/fixtures/listings.csv", &listings_schema()).unwrap();

    assert_eq!(ds.row_count(), 3);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Desk lamp".to_string()),
            Value::Float64(19.5),
            Value::Bool(true),
            listed_at(2018, 9, 18),
        ]
    );
    // Second format in the fallback list.
    assert_eq!(ds.rows[1][4], listed_at(2018, 9, 19));
    // Empty cell.
    assert_eq!(ds.rows[2][4], Value::Null);
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let input = "listed_at,title,id,active,price\n18 9 2018,Desk lamp,1,true,19.5\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &listings_schema()).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
    assert_eq!(ds.rows[0][4], listed_at(2018, 9, 18));
}

#[test]
fn ingest_csv_default_timestamp_field_reads_iso8601() {
    let schema = Schema::new(vec![Field::new("seen_at", DataType::Timestamp)]);
    let input = "seen_at\n2018-09-18T10:00:00+02:00\n2018-09-18 10:00:00\n";

    let ds = ingest_csv_from_str(input, &schema).unwrap();
    assert_eq!(ds.rows[0][0].to_string(), "2018-09-18T10:00:00+02:00");
    assert_eq!(ds.rows[1][0].to_string(), "2018-09-18T10:00:00");
}

#[test]
fn ingest_csv_converts_into_configured_time_zone() {
    let normalizer = DateTimeNormalizer::new(["%d/%m/%Y %H:%M"], None, Some("Asia/Tokyo")).unwrap();
    let schema = Schema::new(vec![Field::timestamp("listed_at", normalizer)]);

    let ds = ingest_csv_from_str("listed_at\n18/09/2018 00:00\n", &schema).unwrap();
    assert_eq!(ds.rows[0][0].to_string(), "2018-09-18T09:00:00+09:00");
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let input = "id,title,price,active\n1,Desk lamp,19.5,true\n";
    let err = ingest_csv_from_str(input, &listings_schema()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'listed_at'"));
}

#[test]
fn ingest_csv_errors_on_type_parse() {
    let input = "id,title,price,active,listed_at\nnot_an_int,Desk lamp,19.5,true,18 9 2018\n";
    let err = ingest_csv_from_str(input, &listings_schema()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("column 'id'"));
}

#[test]
fn ingest_csv_reports_unparsable_timestamp_with_row_and_formats() {
    let input = "id,title,price,active,listed_at\n1,a,1.0,true,18 9 2018\n2,b,2.0,false,next tuesday\n";
    let err = ingest_csv_from_str(input, &listings_schema()).unwrap_err();

    match err {
        IngestionError::ParseError { row, column, raw, message } => {
            assert_eq!(row, 3);
            assert_eq!(column, "listed_at");
            assert_eq!(raw, "next tuesday");
            assert!(message.contains("does not match any of the formats"));
            assert!(message.contains("%d %m %Y"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
