use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use timestamp_ingest::config::load_ingest_config;
#[cfg(feature = "excel_writer")]
use timestamp_ingest::ingestion::ExcelSheetSelection;
use timestamp_ingest::ingestion::{ingest_from_dir, ingest_from_path, IngestionFormat, IngestionOptions};
use timestamp_ingest::normalize::DateTimeNormalizer;
use timestamp_ingest::types::{DataType, Field, Schema, Value};

fn listings_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("title", DataType::Utf8),
        Field::timestamp("listed_at", DateTimeNormalizer::with_formats(["%d %m %Y", "%Y-%m-%d"])),
    ])
}

fn write_listings_parquet(path: &Path) {
    let schema_str = r#"
    message schema {
      REQUIRED INT64 id;
      REQUIRED BINARY title (UTF8);
      REQUIRED BINARY listed_at (UTF8);
    }
    "#;

    let schema = Arc::new(parse_message_type(schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::Int64ColumnWriter(w) => {
                w.write_batch(&[1_i64, 2_i64], None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) if col_idx == 1 => {
                let values = [ByteArray::from("Desk lamp"), ByteArray::from("Bookshelf")];
                w.write_batch(&values, None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let values = [ByteArray::from("18 9 2018"), ByteArray::from("2018-09-19")];
                w.write_batch(&values, None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
        col_idx += 1;
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn unified_ingest_csv_auto_by_extension() {
    let ds = ingest_from_path("tests/fixtures/listings.csv", &listings_schema(), &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
    assert_eq!(ds.rows[0][2].to_string(), "2018-09-18T00:00:00");
}

#[test]
fn unified_ingest_json_explicit_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listings.data");
    fs::write(&path, r#"[{"id": 1, "title": "Desk lamp", "listed_at": "18 9 2018"}]"#).unwrap();

    let opts = IngestionOptions {
        format: Some(IngestionFormat::Json),
        ..Default::default()
    };
    let ds = ingest_from_path(&path, &listings_schema(), &opts).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][2].to_string(), "2018-09-18T00:00:00");
}

#[test]
fn unified_ingest_parquet_auto_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listings.parquet");
    write_listings_parquet(&path);

    let ds = ingest_from_path(&path, &listings_schema(), &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[1][1], Value::Utf8("Bookshelf".to_string()));
    assert_eq!(ds.rows[1][2].to_string(), "2018-09-19T00:00:00");
}

#[test]
fn unified_ingest_rejects_unknown_extension() {
    let err = ingest_from_path("tests/fixtures/ingest.toml", &listings_schema(), &IngestionOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("cannot infer format from extension 'toml'"));
}

#[test]
fn unified_ingest_guesses_legacy_encoding() {
    let schema = Schema::new(vec![
        Field::new("title", DataType::Utf8),
        Field::timestamp("listed_at", DateTimeNormalizer::with_formats(["%d/%m/%Y %H:%M"])),
    ]);

    // Not valid UTF-8, so the plain CSV reader refuses it.
    let plain = ingest_from_path("tests/fixtures/listings_cp1252.csv", &schema, &IngestionOptions::default());
    assert!(plain.is_err());

    let opts = IngestionOptions {
        guess_encoding: true,
        ..Default::default()
    };
    let ds = ingest_from_path("tests/fixtures/listings_cp1252.csv", &schema, &opts).unwrap();
    assert_eq!(ds.rows[0][0], Value::Utf8("Café table".to_string()));
    assert_eq!(ds.rows[1][1].to_string(), "2018-09-19T08:05:00");
}

#[test]
fn unified_ingest_with_config_file_schema() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("listed_at", DataType::Timestamp),
    ]);
    let schema = load_ingest_config("tests/fixtures/ingest.toml", "ingest")
        .unwrap()
        .apply(&schema)
        .unwrap();

    let ds = ingest_from_path("tests/fixtures/listings.csv", &schema, &IngestionOptions::default()).unwrap();
    assert_eq!(ds.rows[0][1].to_string(), "2018-09-18T03:00:00+03:00");
    assert_eq!(ds.rows[1][1].to_string(), "2018-09-19T03:00:00+03:00");
    assert_eq!(ds.rows[2][1], Value::Null);
}

#[test]
fn unified_ingest_from_dir_concatenates_in_path_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("2018/09")).unwrap();
    fs::write(dir.path().join("b.csv"), "id,title,listed_at\n2,Bookshelf,2018-09-19\n").unwrap();
    fs::write(dir.path().join("2018/09/a.csv"), "id,title,listed_at\n1,Desk lamp,18 9 2018\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a listing").unwrap();

    let ds = ingest_from_dir(dir.path(), "csv", &listings_schema(), &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
    assert_eq!(ds.rows[1][0], Value::Int64(2));
}

#[test]
fn unified_ingest_from_dir_stops_at_first_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "id,title,listed_at\n1,Desk lamp,someday\n").unwrap();
    fs::write(dir.path().join("b.csv"), "id,title,listed_at\n2,Bookshelf,2018-09-19\n").unwrap();

    let err = ingest_from_dir(dir.path(), "csv", &listings_schema(), &IngestionOptions::default()).unwrap_err();
    assert!(err.to_string().contains("raw='someday'"));
}

#[cfg(feature = "excel_writer")]
#[test]
fn unified_ingest_excel_all_sheets_auto_by_extension() {
    use rust_xlsxwriter::{Format, Workbook};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listings.xlsx");
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let mut wb = Workbook::new();
    for (name, id, serial) in [("Sheet1", 1.0, 43361.0), ("Second", 2.0, 43362.0)] {
        let ws = wb.add_worksheet();
        ws.set_name(name).unwrap();
        ws.write_string(0, 0, "id").unwrap();
        ws.write_string(0, 1, "title").unwrap();
        ws.write_string(0, 2, "listed_at").unwrap();
        ws.write_number(1, 0, id).unwrap();
        ws.write_string(1, 1, "Desk lamp").unwrap();
        ws.write_number_with_format(1, 2, serial, &date_format).unwrap();
    }
    wb.save(&path).unwrap();

    let opts = IngestionOptions {
        excel_sheet_selection: ExcelSheetSelection::AllSheets,
        ..Default::default()
    };
    let ds = ingest_from_path(&path, &listings_schema(), &opts).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][2].to_string(), "2018-09-18T00:00:00");
    assert_eq!(ds.rows[1][2].to_string(), "2018-09-19T00:00:00");
}
