//! Schema builder with a streaming accumulator.
//!
//! Walk events are folded into the schema one at a time as the walker
//! produces them; nothing about an element is kept once its observations are
//! recorded. Column types only ever widen, and any disagreement widens to
//! `TEXT`.

use crate::error::Result;
use crate::schema::inference::infer_type;
use crate::types::{ColumnType, Columns, Schema};
use crate::walker::WalkEvent;
use indexmap::IndexMap;
use serde::Serialize;

/// Aggregate counts collected while building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Start tags seen
    pub elements: u64,
    /// Observations that widened an existing column to TEXT
    pub widened: u64,
}

/// Accumulates a schema from walk events.
///
/// Tables are kept in the order their first start tag was seen.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: IndexMap<String, Columns>,
    stats: BuildStats,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, keeping its first-seen position
    pub fn observe_table(&mut self, table: &str) {
        if !self.tables.contains_key(table) {
            self.tables.insert(table.to_string(), Columns::new());
        }
    }

    /// Record one typed observation of `table.column`
    pub fn observe(&mut self, table: &str, column: &str, column_type: ColumnType) {
        self.observe_table(table);
        let columns = &mut self.tables[table];

        match columns.get_mut(column) {
            None => {
                columns.insert(column.to_string(), column_type);
            }
            Some(existing) if *existing != column_type => {
                let widened = existing.widen(column_type);
                if widened != *existing {
                    self.stats.widened += 1;
                }
                *existing = widened;
            }
            Some(_) => {}
        }
    }

    /// Fold one walk event: every start tag is a table and every closed
    /// direct child is a column of its parent, typed from its text
    pub fn observe_event(&mut self, event: &WalkEvent) {
        match event {
            WalkEvent::Start { name } => {
                self.stats.elements += 1;
                self.observe_table(name);
            }
            WalkEvent::Child { parent, child } => {
                let column_type = infer_type(child.text.as_deref());
                self.observe(parent, &child.name, column_type);
            }
            WalkEvent::End { .. } => {}
        }
    }

    /// Number of distinct tables seen so far
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    pub fn build(self) -> Schema {
        self.tables.into_iter().collect()
    }
}

/// Build a schema from a stream of walk events, stopping at the first error
pub fn infer_schema<I>(events: I) -> Result<Schema>
where
    I: IntoIterator<Item = Result<WalkEvent>>,
{
    let mut builder = SchemaBuilder::new();
    for event in events {
        builder.observe_event(&event?);
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::XmlWalker;

    fn columns(schema: &Schema, table: &str) -> Vec<(String, ColumnType)> {
        schema
            .table(table)
            .unwrap()
            .iter()
            .map(|(name, ty)| (name.clone(), *ty))
            .collect()
    }

    #[test]
    fn test_empty_builder() {
        let schema = SchemaBuilder::new().build();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_first_seen_column_order() {
        let mut builder = SchemaBuilder::new();
        builder.observe("order", "id", ColumnType::Int);
        builder.observe("order", "ts", ColumnType::Timestamp);
        builder.observe("item", "sku", ColumnType::Text);
        builder.observe("order", "amount", ColumnType::Decimal);

        let schema = builder.build();
        let tables: Vec<&str> = schema.tables().map(|(name, _)| name).collect();
        assert_eq!(tables, vec!["order", "item"]);
        assert_eq!(
            columns(&schema, "order"),
            vec![
                ("id".to_string(), ColumnType::Int),
                ("ts".to_string(), ColumnType::Timestamp),
                ("amount".to_string(), ColumnType::Decimal),
            ]
        );
    }

    #[test]
    fn test_conflict_widens_to_text_for_good() {
        let mut builder = SchemaBuilder::new();
        builder.observe("t", "c", ColumnType::Int);
        builder.observe("t", "c", ColumnType::BigInt);
        builder.observe("t", "c", ColumnType::Int);
        builder.observe("t", "c", ColumnType::Text);

        assert_eq!(builder.stats().widened, 1);
        let schema = builder.build();
        assert_eq!(columns(&schema, "t"), vec![("c".to_string(), ColumnType::Text)]);
    }

    #[test]
    fn test_repeated_observation_is_noop() {
        let mut once = SchemaBuilder::new();
        once.observe("t", "c", ColumnType::Decimal);

        let mut many = SchemaBuilder::new();
        for _ in 0..5 {
            many.observe("t", "c", ColumnType::Decimal);
        }

        assert_eq!(many.stats().widened, 0);
        assert_eq!(once.build(), many.build());
    }

    #[test]
    fn test_final_type_is_order_independent() {
        let observations = [
            ColumnType::Int,
            ColumnType::Int,
            ColumnType::Decimal,
            ColumnType::Int,
        ];

        let mut forward = SchemaBuilder::new();
        let mut backward = SchemaBuilder::new();
        for ty in observations {
            forward.observe("t", "c", ty);
        }
        for ty in observations.iter().rev() {
            backward.observe("t", "c", *ty);
        }

        assert_eq!(forward.build(), backward.build());
    }

    #[test]
    fn test_conflicting_orders_widen_id() {
        let xml = "<Export>\
            <Order><id>42</id><ts>2024-10-01T00:00:00</ts></Order>\
            <Order><id>abc</id></Order>\
            </Export>";
        let schema = infer_schema(XmlWalker::new(xml.as_bytes())).unwrap();

        assert_eq!(
            columns(&schema, "Order"),
            vec![
                ("id".to_string(), ColumnType::Text),
                ("ts".to_string(), ColumnType::Timestamp),
            ]
        );
    }

    #[test]
    fn test_tables_follow_start_tag_order() {
        let xml = "<Export><Order><id>1</id></Order><Marker/></Export>";
        let schema = infer_schema(XmlWalker::new(xml.as_bytes())).unwrap();

        let tables: Vec<&str> = schema.tables().map(|(name, _)| name).collect();
        assert_eq!(tables, vec!["Export", "Order", "id", "Marker"]);
        assert_eq!(schema.table("id").unwrap().len(), 0);
        assert_eq!(schema.table("Marker").unwrap().len(), 0);
    }

    #[test]
    fn test_wide_root_is_folded_incrementally() {
        let mut xml = String::from("<Export>");
        for i in 0..20_000 {
            xml.push_str(&format!("<Order><id>{}</id></Order>", i));
        }
        xml.push_str("</Export>");

        let mut builder = SchemaBuilder::new();
        let mut walker = XmlWalker::new(xml.as_bytes());
        let mut root_columns_before_end = 0;
        while let Some(event) = walker.next() {
            let event = event.unwrap();
            if let WalkEvent::End { name } = &event {
                if name == "Export" {
                    root_columns_before_end = builder.tables["Export"].len();
                }
            }
            builder.observe_event(&event);
        }

        // Every Order was recorded on Export before the root closed.
        assert_eq!(root_columns_before_end, 1);
        let schema = builder.build();
        assert_eq!(
            columns(&schema, "Export"),
            vec![("Order".to_string(), ColumnType::Text)]
        );
        assert_eq!(columns(&schema, "Order"), vec![("id".to_string(), ColumnType::Int)]);
    }

    #[test]
    fn test_stats_count_elements() {
        let xml = "<r><a>1</a><a>x</a></r>";
        let mut builder = SchemaBuilder::new();
        for event in XmlWalker::new(xml.as_bytes()) {
            builder.observe_event(&event.unwrap());
        }

        let stats = builder.stats();
        assert_eq!(stats.elements, 3);
        assert_eq!(stats.widened, 1);
        assert_eq!(builder.table_count(), 2);
    }
}
