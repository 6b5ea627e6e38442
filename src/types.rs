use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relational column type inferred from element text.
///
/// `Text` is the top of the lattice: every conflict widens to it and nothing
/// narrows it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "BIGINT")]
    BigInt,
    #[serde(rename = "DECIMAL(18,6)")]
    Decimal,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
}

impl ColumnType {
    pub const ALL: [ColumnType; 5] = [
        ColumnType::Text,
        ColumnType::Int,
        ColumnType::BigInt,
        ColumnType::Decimal,
        ColumnType::Timestamp,
    ];

    /// DDL spelling of this type
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Decimal => "DECIMAL(18,6)",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Least general type covering both observations.
    ///
    /// Equal types stay put, anything else collapses to `Text`.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        if self == other {
            self
        } else {
            ColumnType::Text
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Returned when a DDL type token is not one of the known column types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumnType(pub String);

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_sql().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownColumnType(s.to_string()))
    }
}

/// Ordered column definitions of one table
pub type Columns = IndexMap<String, ColumnType>;

/// Table name -> ordered column definitions.
///
/// Both levels keep insertion order, and equality is order-sensitive so that
/// two schemas compare equal only if they would serialize identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    tables: IndexMap<String, Columns>,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            tables: IndexMap::new(),
        }
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.values().map(IndexMap::len).sum()
    }

    pub fn table(&self, name: &str) -> Option<&Columns> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get a table's column map, creating an empty one at the end if unseen
    pub fn table_mut(&mut self, name: &str) -> &mut Columns {
        if !self.tables.contains_key(name) {
            self.tables.insert(name.to_string(), Columns::new());
        }
        &mut self.tables[name]
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Columns)> {
        self.tables.iter().map(|(name, columns)| (name.as_str(), columns))
    }

    /// Keep only the tables for which `keep` returns true, in place
    pub fn retain_tables<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Columns) -> bool,
    {
        self.tables.retain(|name, columns| keep(name, columns));
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.tables.len() == other.tables.len()
            && self
                .tables
                .iter()
                .zip(other.tables.iter())
                .all(|((a, a_cols), (b, b_cols))| a == b && a_cols.iter().eq(b_cols.iter()))
    }
}

impl Eq for Schema {}

impl FromIterator<(String, Columns)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, Columns)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (name, columns) in iter {
            schema.table_mut(&name).extend(columns);
        }
        schema
    }
}

/// One extracted row: the values of one matched element, in encounter order.
///
/// Rows are transient and live only until their insert statement is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Canonical table name as declared in the schema
    pub table: String,

    /// Column name and trimmed text, `None` for absent or blank text
    pub cells: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new(table: impl Into<String>) -> Self {
        Row {
            table: table.into(),
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.cells.push((column.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Render as a literal insert statement, newline-terminated.
    ///
    /// Values are wrapped in single quotes verbatim. Embedded quotes are NOT
    /// escaped, so values containing `'` produce invalid SQL.
    pub fn to_insert_statement(&self) -> String {
        let columns = self
            .cells
            .iter()
            .map(|(column, _)| column.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let values = self
            .cells
            .iter()
            .map(|(_, value)| match value {
                Some(text) => format!("'{}'", text),
                None => "NULL".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!("INSERT INTO {} ({}) VALUES ({});\n", self.table, columns, values)
    }
}
