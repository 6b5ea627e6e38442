use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xmlmelt::pipeline::{extract_pass, filter_pass, infer_pass};
use xmlmelt::schema::{parse_schema, parse_schema_blocks};
use xmlmelt::{run_pipeline, ColumnType, PipelineConfig, XmlMeltError};

const ORDERS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ex:Export xmlns:ex="urn:example:export"><ex:Order><ex:id>42</ex:id><ex:ts>2024-10-01T00:00:00</ex:ts></ex:Order><ex:Order><ex:id>abc</ex:id></ex:Order><ex:Marker/></ex:Export>
"#;

fn setup(xml: &str) -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("export.xml");
    fs::write(&input, xml).unwrap();

    let config = PipelineConfig {
        input,
        log_file: None,
        ..PipelineConfig::default().with_output_dir(dir.path())
    };
    (dir, config)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn conflicting_values_widen_and_empty_tables_are_filtered() {
    let (_dir, config) = setup(ORDERS_XML);
    let reports = run_pipeline(&config).unwrap();
    assert_eq!(reports.len(), 3);

    assert_eq!(
        read(&config.schema_output),
        "CREATE TABLE IF NOT EXISTS Export (\n    Order TEXT,\n    Marker TEXT\n);\n\n\
         CREATE TABLE IF NOT EXISTS Order (\n    id TEXT,\n    ts TIMESTAMP\n);\n\n\
         CREATE TABLE IF NOT EXISTS id (\n\n);\n\n\
         CREATE TABLE IF NOT EXISTS ts (\n\n);\n\n\
         CREATE TABLE IF NOT EXISTS Marker (\n\n);\n\n"
    );
    assert_eq!(reports[0].tables, 5);
    assert_eq!(reports[0].widened, 1);

    assert_eq!(
        read(&config.filtered_schema_output),
        "CREATE TABLE IF NOT EXISTS Export (\n    Order TEXT,\n    Marker TEXT\n);\n\n\
         CREATE TABLE IF NOT EXISTS Order (\n    id TEXT,\n    ts TIMESTAMP\n);\n\n"
    );
    assert_eq!(reports[1].dropped_tables, 3);

    assert_eq!(
        read(&config.data_output),
        "INSERT INTO Export (Order, Order, Marker) VALUES (NULL, NULL, NULL);\n\
         INSERT INTO Order (id, ts) VALUES ('42', '2024-10-01T00:00:00');\n\
         INSERT INTO Order (id) VALUES ('abc');\n"
    );
    assert_eq!(reports[2].rows, 3);
}

#[test]
fn statements_follow_document_start_order() {
    let xml = "<Export><Order><id>1</id><Line><sku>A</sku></Line></Order></Export>";
    let (_dir, config) = setup(xml);
    let reports = run_pipeline(&config).unwrap();

    assert_eq!(
        read(&config.data_output),
        "INSERT INTO Export (Order) VALUES (NULL);\n\
         INSERT INTO Order (id, Line) VALUES ('1', NULL);\n\
         INSERT INTO Line (sku) VALUES ('A');\n"
    );
    assert_eq!(reports[2].rows, 3);
}

#[test]
fn wide_root_extracts_every_row_in_order() {
    let mut xml = String::from("<Export>");
    for i in 0..5_000 {
        xml.push_str(&format!("<Order><id>{}</id></Order>", i));
    }
    xml.push_str("</Export>");

    let (_dir, mut config) = setup(&xml);
    // Force the held-back Order statements through a temporary file.
    config.spill_limit_bytes = 1024;
    let reports = run_pipeline(&config).unwrap();

    let data = read(&config.data_output);
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 5_001);
    assert!(lines[0].starts_with("INSERT INTO Export (Order, Order,"));
    assert_eq!(lines[1], "INSERT INTO Order (id) VALUES ('0');");
    assert_eq!(lines[5_000], "INSERT INTO Order (id) VALUES ('4999');");
    assert_eq!(reports[2].rows, 5_001);
}

#[test]
fn text_after_the_root_is_fatal() {
    let (_dir, config) = setup("<r><a>1</a></r>garbage");
    let err = infer_pass(&config).unwrap_err();

    assert!(matches!(err, XmlMeltError::DocumentParse { .. }));
    assert!(!config.schema_output.exists());
}

#[test]
fn filter_keeps_exactly_the_populated_tables() {
    let (_dir, config) = setup(ORDERS_XML);
    infer_pass(&config).unwrap();
    filter_pass(&config).unwrap();

    let unfiltered = parse_schema_blocks(&read(&config.schema_output)).schema;
    let filtered = parse_schema_blocks(&read(&config.filtered_schema_output)).schema;

    for (table, columns) in unfiltered.tables() {
        assert_eq!(filtered.contains_table(table), !columns.is_empty(), "{}", table);
        if let Some(kept) = filtered.table(table) {
            assert!(kept.iter().eq(columns.iter()));
        }
    }
    assert_eq!(filtered.len(), 2);
}

#[test]
fn rerunning_produces_identical_artifacts() {
    let (_dir, config) = setup(ORDERS_XML);

    run_pipeline(&config).unwrap();
    let first = [
        read(&config.schema_output),
        read(&config.filtered_schema_output),
        read(&config.data_output),
    ];

    run_pipeline(&config).unwrap();
    let second = [
        read(&config.schema_output),
        read(&config.filtered_schema_output),
        read(&config.data_output),
    ];

    assert_eq!(first, second);
}

#[test]
fn extraction_follows_an_edited_schema() {
    let xml = "<Export>\
        <Order><ID>1</ID><id>7</id><note>first</note></Order>\
        <ORDER><note>only unknown</note></ORDER>\
        <order><id> 9 </id></order>\
        </Export>";
    let (_dir, config) = setup(xml);
    fs::write(
        &config.filtered_schema_output,
        "CREATE TABLE IF NOT EXISTS order (\n    id INT\n);\n",
    )
    .unwrap();

    let report = extract_pass(&config).unwrap();

    assert_eq!(
        read(&config.data_output),
        "INSERT INTO order (id) VALUES ('7');\n\
         INSERT INTO order (id) VALUES ('9');\n"
    );
    assert_eq!(report.rows, 2);
    assert_eq!(report.tables, 1);
}

#[test]
fn numeric_columns_are_typed() {
    let xml = "<Feed>\
        <Tick><seq>1</seq><volume>3000000000</volume><price>10.5</price><delta>-2</delta></Tick>\
        <Tick><seq>2</seq><volume>4000000000</volume><price>11</price><delta>-3</delta></Tick>\
        </Feed>";
    let (_dir, config) = setup(xml);
    infer_pass(&config).unwrap();

    let schema = parse_schema(&read(&config.schema_output));
    let tick = schema.table("Tick").unwrap();
    assert_eq!(tick.get("seq"), Some(&ColumnType::Int));
    assert_eq!(tick.get("volume"), Some(&ColumnType::BigInt));
    // 10.5 is DECIMAL but 11 is INT, so price widens
    assert_eq!(tick.get("price"), Some(&ColumnType::Text));
    assert_eq!(tick.get("delta"), Some(&ColumnType::Decimal));
}

#[test]
fn malformed_document_aborts_and_leaves_no_data() {
    let (_dir, config) = setup(ORDERS_XML);
    run_pipeline(&config).unwrap();

    fs::write(&config.input, "<Export><Order><id>1</id></Export>").unwrap();
    let err = extract_pass(&config).unwrap_err();

    assert!(matches!(err, XmlMeltError::DocumentParse { .. }));
    assert!(!config.data_output.exists());
}

#[test]
fn missing_schema_artifact_is_io_error() {
    let (_dir, config) = setup(ORDERS_XML);
    let err = filter_pass(&config).unwrap_err();
    assert!(matches!(err, XmlMeltError::Io { .. }));
    assert!(!config.filtered_schema_output.exists());
}
