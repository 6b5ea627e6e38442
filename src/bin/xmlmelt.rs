//! xmlmelt: Convert a large XML export into a SQL schema and insert statements
//!
//! Runs three passes, each reading the previous pass's file:
//!   1. infer   - walk the document and write every table it finds
//!   2. filter  - drop tables without columns
//!   3. extract - walk the document again and write one INSERT per row
//!
//! Usage:
//!   # Run all passes with the default file names in the current directory
//!   xmlmelt export.xml
//!
//!   # Write artifacts to a directory and print per-pass counts as JSON
//!   xmlmelt export.xml --output-dir ./sql --report
//!
//!   # Re-run only the extraction against an edited filtered schema
//!   xmlmelt export.xml --pass extract

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use xmlmelt::{logging, run_pass, run_pipeline, Pass, PipelineConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PassArg {
    Infer,
    Filter,
    Extract,
}

impl From<PassArg> for Pass {
    fn from(arg: PassArg) -> Self {
        match arg {
            PassArg::Infer => Pass::Infer,
            PassArg::Filter => Pass::Filter,
            PassArg::Extract => Pass::Extract,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "xmlmelt")]
#[command(about = "Convert an XML export into a SQL schema and insert statements", long_about = None)]
struct Args {
    /// Input XML document (defaults to the configured input)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON file with pipeline settings; flags override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Run only this pass
    #[arg(long, value_enum)]
    pass: Option<PassArg>,

    /// Directory for all output artifacts and the process log
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Unfiltered schema output
    #[arg(long)]
    schema_output: Option<PathBuf>,

    /// Filtered schema output
    #[arg(long)]
    filtered_schema_output: Option<PathBuf>,

    /// Insert statements output
    #[arg(long)]
    data_output: Option<PathBuf>,

    /// Process log file
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,

    /// Log progress every N elements (0 disables, needs --verbose to show)
    #[arg(long)]
    progress_every: Option<u64>,

    /// In-memory bytes of nested statements per open element before spilling
    /// to a temporary file
    #[arg(long, value_name = "BYTES")]
    spill_limit: Option<usize>,

    /// Print pass reports as JSON on stdout
    #[arg(long)]
    report: bool,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;

    logging::init(config.log_file.as_deref(), args.verbose)
        .context("Failed to initialize logging")?;

    let reports = match args.pass {
        Some(pass) => vec![run_pass(&config, pass.into())?],
        None => run_pipeline(&config)?,
    };

    if args.report {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        config = config.with_output_dir(dir);
    }
    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(path) = &args.schema_output {
        config.schema_output = path.clone();
    }
    if let Some(path) = &args.filtered_schema_output {
        config.filtered_schema_output = path.clone();
    }
    if let Some(path) = &args.data_output {
        config.data_output = path.clone();
    }
    if let Some(path) = &args.log_file {
        config.log_file = Some(path.clone());
    }
    if args.no_log_file {
        config.log_file = None;
    }
    if let Some(n) = args.progress_every {
        config.progress_every = n;
    }
    if let Some(bytes) = args.spill_limit {
        config.spill_limit_bytes = bytes;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
