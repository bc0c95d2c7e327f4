use dataload::ingestion::{load_file, probe_csv_schema, LoaderOptions};
use dataload::sink::MemorySink;
use dataload::types::{ColumnType, InferenceMode, Value};
use dataload::LoadError;

const PEOPLE: &str = "tests/fixtures/people.csv";

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn probe_infers_types_in_header_order() {
    let schema = probe_csv_schema(PEOPLE, 100, InferenceMode::Precise).unwrap();
    assert_eq!(schema.column_names(), vec!["id", "name", "score", "zip"]);
    assert_eq!(schema.type_of("id"), Some(ColumnType::Integer));
    assert_eq!(schema.type_of("name"), Some(ColumnType::Text));
    assert_eq!(schema.type_of("score"), Some(ColumnType::Float));
    assert_eq!(schema.type_of("zip"), Some(ColumnType::Integer));
}

#[test]
fn all_text_mode_keeps_leading_zero_columns_as_text() {
    let schema = probe_csv_schema(PEOPLE, 100, InferenceMode::AllText).unwrap();
    assert!(schema.columns.iter().all(|c| c.column_type == ColumnType::Text));
}

#[test]
fn numeric_mode_uses_a_single_numeric_type() {
    let schema = probe_csv_schema(PEOPLE, 100, InferenceMode::Numeric).unwrap();
    assert_eq!(
        schema.column_defs_clause(),
        r#"("id" NUMERIC, "name" TEXT, "score" NUMERIC, "zip" NUMERIC)"#
    );
}

#[test]
fn load_people_csv() {
    let sink = MemorySink::new();
    let report = load_file(PEOPLE, &sink, &LoaderOptions::default()).unwrap();

    assert_eq!(report.table, "fixtures_people");
    assert_eq!(report.rows, 3);
    assert_eq!(report.batches, 1);

    let t = sink.table("fixtures_people").unwrap();
    assert_eq!(
        t.column_defs,
        r#"("id" INTEGER, "name" TEXT, "score" FLOAT, "zip" INTEGER)"#
    );
    assert_eq!(
        t.rows,
        vec![
            vec![text("1"), text("Ada"), text("98.5"), text("02134")],
            vec![text("2"), text("Grace"), Value::Null, text("10001")],
            vec![text("3"), Value::Null, text("77"), Value::Null],
        ]
    );
}

#[test]
fn table_name_includes_parent_directory() {
    let sink = MemorySink::new();
    let opts = LoaderOptions::default();
    let report = load_file("tests/fixtures/2024-01/orders.csv", &sink, &opts).unwrap();
    assert_eq!(report.table, "2024_01_orders");

    let t = sink.table("2024_01_orders").unwrap();
    assert_eq!(t.rows[2], vec![text("3"), text("7.25"), text("has, comma")]);
    assert_eq!(t.rows[1][2], Value::Null);
}

#[test]
fn row_count_is_preserved_across_batches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.csv");
    let mut body = String::from("n,sq\n");
    for i in 0..1_003 {
        body.push_str(&format!("{i},{}\n", i * i));
    }
    std::fs::write(&path, body).unwrap();

    let sink = MemorySink::new();
    let opts = LoaderOptions {
        batch_size: 150,
        look_up_size: 10,
        ..Default::default()
    };
    let report = load_file(&path, &sink, &opts).unwrap();
    assert_eq!(report.rows, 1_003);

    let t = sink.table(&report.table).unwrap();
    assert_eq!(t.rows.len(), 1_003);
    assert_eq!(t.batch_sizes.len(), 7);
    assert!(t.batch_sizes[..6].iter().all(|&n| n == 150));
    assert_eq!(t.batch_sizes[6], 103);
    // CSV is transcoded on one thread, so file order survives
    assert_eq!(t.rows[1_002][0], text("1002"));
}

#[test]
fn short_row_after_the_sample_fails_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragged.csv");
    std::fs::write(&path, "a,b\n1,2\n3,4\n5\n").unwrap();

    let sink = MemorySink::new();
    let opts = LoaderOptions {
        look_up_size: 1,
        batch_size: 1,
        ..Default::default()
    };
    let err = load_file(&path, &sink, &opts).unwrap_err();
    assert!(matches!(err, LoadError::Arity { row: 4, expected: 2, found: 1 }), "{err}");

    // rows before the bad one were already flushed; nothing is rolled back
    let t = sink.table(&dataload::ingestion::table_name(&path)).unwrap();
    assert_eq!(t.rows.len(), 2);
}

#[test]
fn missing_file_is_an_open_error() {
    let sink = MemorySink::new();
    let err = load_file("tests/fixtures/does_not_exist.csv", &sink, &LoaderOptions::default())
        .unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }));
    assert_eq!(err.severity(), dataload::error::Severity::Critical);
}

#[test]
fn gzip_csv_is_loaded_transparently() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zipped.csv.gz");
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    enc.write_all(b"k,v\na,1\nb,2\n").unwrap();
    std::fs::write(&path, enc.finish().unwrap()).unwrap();

    let sink = MemorySink::new();
    let report = load_file(&path, &sink, &LoaderOptions::default()).unwrap();
    assert!(report.table.ends_with("_zipped"));
    assert_eq!(report.schema.type_of("v"), Some(ColumnType::Integer));
    assert_eq!(sink.table(&report.table).unwrap().rows.len(), 2);
}
