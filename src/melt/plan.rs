//! Schema-guided extraction plan
//!
//! Pre-computes, from a loaded schema, the lookups the extractor needs for
//! every element: which table a tag resolves to (ignoring case) and which
//! child names are declared columns of that table (exact match).

use crate::types::Schema;
use std::collections::{HashMap, HashSet};

/// Extraction rule for one declared table
#[derive(Debug, Clone)]
pub struct TablePlan {
    /// Canonical table name, as declared in the schema
    pub table: String,

    /// Declared column names, matched case-sensitively
    pub columns: HashSet<String>,
}

impl TablePlan {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }
}

/// Complete extraction plan derived from a schema
#[derive(Debug, Clone, Default)]
pub struct MeltPlan {
    table_plans: Vec<TablePlan>,
    /// Lowercased table name -> index into `table_plans`
    by_name: HashMap<String, usize>,
}

impl MeltPlan {
    /// Build the plan from a schema.
    ///
    /// When declared tables differ only in case, the first one declared wins.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut plan = MeltPlan::default();

        for (table, columns) in schema.tables() {
            let key = table.to_lowercase();
            if plan.by_name.contains_key(&key) {
                continue;
            }
            plan.by_name.insert(key, plan.table_plans.len());
            plan.table_plans.push(TablePlan {
                table: table.to_string(),
                columns: columns.keys().cloned().collect(),
            });
        }

        plan
    }

    /// Resolve an element tag to its table plan, ignoring case
    pub fn resolve(&self, tag: &str) -> Option<&TablePlan> {
        self.lookup(tag).map(|id| &self.table_plans[id])
    }

    /// Index of the table plan a tag resolves to
    pub(crate) fn lookup(&self, tag: &str) -> Option<usize> {
        self.by_name.get(&tag.to_lowercase()).copied()
    }

    pub(crate) fn table_plan(&self, id: usize) -> &TablePlan {
        &self.table_plans[id]
    }

    /// Number of distinct tables the plan can match
    pub fn len(&self) -> usize {
        self.table_plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    #[test]
    fn test_resolve_ignores_case() {
        let mut schema = Schema::new();
        schema
            .table_mut("order")
            .insert("Id".to_string(), ColumnType::Int);

        let plan = MeltPlan::from_schema(&schema);
        let table_plan = plan.resolve("ORDER").unwrap();
        assert_eq!(table_plan.table, "order");
        assert!(table_plan.has_column("Id"));
        assert!(!table_plan.has_column("id"));
        assert!(plan.resolve("orders").is_none());
    }

    #[test]
    fn test_first_declared_table_wins() {
        let mut schema = Schema::new();
        schema
            .table_mut("Item")
            .insert("a".to_string(), ColumnType::Text);
        schema
            .table_mut("ITEM")
            .insert("b".to_string(), ColumnType::Text);

        let plan = MeltPlan::from_schema(&schema);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.resolve("item").unwrap().table, "Item");
    }
}
