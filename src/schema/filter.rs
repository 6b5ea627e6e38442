use crate::types::Schema;

/// Drop every table that has no columns.
///
/// Consumes the schema and filters in place, so only one copy is ever
/// resident. Order, names and column types of the kept tables are untouched.
pub fn filter_schema(mut schema: Schema) -> Schema {
    schema.retain_tables(|_, columns| !columns.is_empty());
    schema
}
