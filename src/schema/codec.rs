//! DDL text form of a schema.
//!
//! Each table is written as one block:
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS Order (
//!     id INT,
//!     ts TIMESTAMP
//! );
//! ```
//!
//! and the parser recovers `table -> {column -> type}` from any text made of
//! such blocks.

use crate::types::{ColumnType, Columns, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, Write};

static CREATE_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)CREATE TABLE IF NOT EXISTS (\S+)\s*\((.*?)\);").unwrap()
});

/// Lines carrying any of these are table constraints, not columns
const CONSTRAINT_MARKERS: [&str; 3] = ["PRIMARY KEY", "FOREIGN KEY", "UNIQUE"];

const COLUMN_INDENT: &str = "    ";

/// DDL block for one table, including the blank separator line
fn table_block(table: &str, columns: &Columns) -> String {
    let body: Vec<String> = columns
        .iter()
        .map(|(column, column_type)| format!("{}{} {}", COLUMN_INDENT, column, column_type))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n\n",
        table,
        body.join(",\n")
    )
}

/// Write every table of `schema` as a DDL block, in order
pub fn write_schema<W: Write>(schema: &Schema, writer: &mut W) -> io::Result<()> {
    for (table, columns) in schema.tables() {
        writer.write_all(table_block(table, columns).as_bytes())?;
    }
    Ok(())
}

/// Serialize `schema` to DDL text
pub fn serialize_schema(schema: &Schema) -> String {
    schema
        .tables()
        .map(|(table, columns)| table_block(table, columns))
        .collect()
}

/// Result of parsing schema text, with counts of what was left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub schema: Schema,
    /// Non-blank lines that did not yield a (name, type) pair
    pub skipped_lines: usize,
    /// Lines dropped because they declare constraints
    pub constraint_lines: usize,
}

/// Parse every table block, keeping tables without columns
pub fn parse_schema_blocks(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for caps in CREATE_TABLE_REGEX.captures_iter(text) {
        let table = &caps[1];
        let body = &caps[2];
        outcome.schema.table_mut(table);

        for raw in body.lines() {
            if CONSTRAINT_MARKERS.iter().any(|marker| raw.contains(marker)) {
                outcome.constraint_lines += 1;
                continue;
            }

            let line = raw.trim();
            let line = line.strip_suffix(',').unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let (Some(name), Some(type_token)) = (tokens.next(), tokens.next()) else {
                tracing::debug!(table, line, "skipping schema line without a type");
                outcome.skipped_lines += 1;
                continue;
            };

            match type_token.parse::<ColumnType>() {
                Ok(column_type) => {
                    outcome
                        .schema
                        .table_mut(table)
                        .insert(name.to_string(), column_type);
                }
                Err(_) => {
                    tracing::debug!(table, line, "skipping schema line with unknown type");
                    outcome.skipped_lines += 1;
                }
            }
        }
    }

    outcome
}

/// Parse schema text, restoring only tables with at least one column
pub fn parse_schema(text: &str) -> Schema {
    let mut schema = parse_schema_blocks(text).schema;
    schema.retain_tables(|_, columns| !columns.is_empty());
    schema
}
