//! # xmlmelt - XML export to SQL toolkit
//!
//! Turns a large XML export into a relational schema and a stream of insert
//! statements, in three file-persisted passes so memory stays bounded by the
//! document's nesting depth rather than its size.
//!
//! ## Modules
//!
//! - **walker**: streaming, forward-only traversal events
//! - **schema**: type inference, schema building, DDL codec and filtering
//! - **melt**: schema-directed extraction of rows into insert statements
//! - **pipeline**: the infer / filter / extract passes over files
//!
//! ## Quick Start
//!
//! ```rust
//! use xmlmelt::melt::{InsertWriter, PlannedMelter};
//! use xmlmelt::schema::{infer_schema, parse_schema, serialize_schema};
//! use xmlmelt::walker::XmlWalker;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let xml = "<Export><Order><id>42</id><ts>2024-10-01T00:00:00</ts></Order></Export>";
//!
//! let schema = infer_schema(XmlWalker::new(xml.as_bytes()))?;
//! let ddl = serialize_schema(&schema);
//! assert!(ddl.contains("CREATE TABLE IF NOT EXISTS Order ("));
//!
//! let mut melter = PlannedMelter::from_schema(&parse_schema(&ddl));
//! let mut out = Vec::new();
//! let mut writer = InsertWriter::new(&mut out);
//! for event in XmlWalker::new(xml.as_bytes()) {
//!     melter.melt(event?, &mut writer)?;
//! }
//! writer.finish()?;
//!
//! // Container elements are tables too, and statements follow start order.
//! assert_eq!(
//!     String::from_utf8(out)?,
//!     "INSERT INTO Export (Order) VALUES (NULL);\n\
//!      INSERT INTO Order (id, ts) VALUES ('42', '2024-10-01T00:00:00');\n"
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod melt;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod walker;

// Re-export commonly used types for convenience
pub use config::PipelineConfig;
pub use error::{Result, XmlMeltError};
pub use melt::{InsertWriter, MeltPlan, PlannedMelter};
pub use pipeline::{run_pass, run_pipeline, Pass, PassReport};
pub use schema::{infer_schema, parse_schema, serialize_schema, SchemaBuilder};
pub use types::{ColumnType, Row, Schema};
pub use walker::{Child, WalkEvent, XmlWalker};
