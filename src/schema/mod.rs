//! Relational schema inference
//!
//! Pass 1 folds walked elements into a [`SchemaBuilder`] and serializes the
//! result as DDL text. Later passes never share the in-memory schema; they
//! parse it back from that text with the codec.

pub mod builder;
pub mod codec;
pub mod filter;
pub mod inference;

pub use builder::{infer_schema, BuildStats, SchemaBuilder};
pub use codec::{parse_schema, parse_schema_blocks, serialize_schema, write_schema, ParseOutcome};
pub use filter::filter_schema;
pub use inference::infer_type;
