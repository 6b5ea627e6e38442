//! xmlmelt-infer: Infer a SQL schema from an XML document
//!
//! Runs only the schema inference walk and prints the result, without
//! touching any pipeline artifacts.
//!
//! Usage:
//!   # DDL to stdout
//!   xmlmelt-infer export.xml
//!
//!   # Only tables that have columns, as compact JSON
//!   xmlmelt-infer export.xml --populated --json --compact
//!
//!   # Read from stdin
//!   cat export.xml | xmlmelt-infer

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{stdin, BufRead, BufReader};
use std::path::PathBuf;
use xmlmelt::schema::{filter_schema, serialize_schema, SchemaBuilder};
use xmlmelt::{logging, XmlWalker};

#[derive(Parser, Debug)]
#[command(name = "xmlmelt-infer")]
#[command(about = "Infer a SQL schema from an XML document", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Drop tables without columns
    #[arg(long)]
    populated: bool,

    /// Print the schema as JSON instead of DDL
    #[arg(long)]
    json: bool,

    /// Compact JSON output (no pretty-printing)
    #[arg(long, requires = "json")]
    compact: bool,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(None, args.verbose).context("Failed to initialize logging")?;

    let reader: Box<dyn BufRead> = if let Some(path) = &args.input {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let mut builder = SchemaBuilder::new();
    for event in XmlWalker::new(reader) {
        let event = event.context("Failed to parse XML")?;
        builder.observe_event(&event);
    }

    let stats = builder.stats();
    let mut schema = builder.build();
    if args.populated {
        schema = filter_schema(schema);
    }
    tracing::info!(
        elements = stats.elements,
        tables = schema.len(),
        widened = stats.widened,
        "schema inferred"
    );

    let output = if args.json && args.compact {
        serde_json::to_string(&schema)?
    } else if args.json {
        serde_json::to_string_pretty(&schema)?
    } else {
        serialize_schema(&schema)
    };

    print!("{}", output);
    if args.json {
        println!();
    }

    Ok(())
}
