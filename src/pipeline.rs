//! The three-pass XML to SQL pipeline.
//!
//! 1. **infer**: walk the document, build the schema, write it as DDL.
//! 2. **filter**: parse that DDL, drop tables without columns, write it again.
//! 3. **extract**: parse the filtered DDL, walk the document a second time and
//!    stream one insert statement per matching element.
//!
//! Passes communicate only through the files they write. Each artifact is
//! flushed and closed before the next pass opens it, and an artifact whose
//! pass fails is removed.

use crate::config::PipelineConfig;
use crate::error::{Result, XmlMeltError};
use crate::logging::resident_memory_mb;
use crate::melt::{InsertWriter, MeltPlan, PlannedMelter};
use crate::schema::{filter_schema, parse_schema, parse_schema_blocks, write_schema, SchemaBuilder};
use crate::walker::{WalkEvent, XmlWalker};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Infer,
    Filter,
    Extract,
}

impl Pass {
    pub const ALL: [Pass; 3] = [Pass::Infer, Pass::Filter, Pass::Extract];
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Infer => "infer",
            Pass::Filter => "filter",
            Pass::Extract => "extract",
        })
    }
}

/// Aggregate counts for one completed pass.
///
/// Counts that do not apply to a pass are left at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    pub elapsed_secs: f64,
    /// Tables in the schema this pass wrote or loaded
    pub tables: usize,
    /// Columns across those tables
    pub columns: usize,
    /// Elements walked
    pub elements: u64,
    /// Insert statements written
    pub rows: u64,
    /// Columns widened to TEXT on conflict
    pub widened: u64,
    /// Schema lines that could not be parsed
    pub skipped_lines: usize,
    /// Tables removed by the filter
    pub dropped_tables: usize,
    /// Resident memory when the pass finished, where the platform reports it
    pub rss_mb: Option<f64>,
}

impl PassReport {
    fn new(pass: Pass, started: Instant) -> Self {
        PassReport {
            pass,
            elapsed_secs: started.elapsed().as_secs_f64(),
            tables: 0,
            columns: 0,
            elements: 0,
            rows: 0,
            widened: 0,
            skipped_lines: 0,
            dropped_tables: 0,
            rss_mb: None,
        }
    }
}

/// Run all three passes in order
pub fn run_pipeline(config: &PipelineConfig) -> Result<Vec<PassReport>> {
    config.validate()?;
    Pass::ALL
        .iter()
        .map(|pass| run_pass(config, *pass))
        .collect()
}

/// Run a single pass against the artifacts named in `config`
pub fn run_pass(config: &PipelineConfig, pass: Pass) -> Result<PassReport> {
    tracing::info!(%pass, rss_mb = ?resident_memory_mb(), "starting pass");
    let report = match pass {
        Pass::Infer => infer_pass(config),
        Pass::Filter => filter_pass(config),
        Pass::Extract => extract_pass(config),
    };

    match report {
        Ok(mut report) => {
            report.rss_mb = resident_memory_mb();
            tracing::info!(
                %pass,
                elapsed = format_args!("{:.2}s", report.elapsed_secs),
                tables = report.tables,
                columns = report.columns,
                elements = report.elements,
                rows = report.rows,
                rss_mb = ?report.rss_mb,
                "finished pass"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(%pass, error = %e, rss_mb = ?resident_memory_mb(), "pass failed");
            Err(e)
        }
    }
}

/// Pass 1: document -> unfiltered schema
pub fn infer_pass(config: &PipelineConfig) -> Result<PassReport> {
    let started = Instant::now();
    let mut walker = XmlWalker::open(&config.input)?;

    let mut builder = SchemaBuilder::new();
    while let Some(event) = walker.next() {
        let event = event?;
        builder.observe_event(&event);

        let elements = builder.stats().elements;
        if matches!(event, WalkEvent::Start { .. }) && progress_due(config, elements) {
            tracing::debug!(
                elements,
                depth = walker.depth(),
                tables = builder.table_count(),
                elapsed = format_args!("{:.2}s", started.elapsed().as_secs_f64()),
                "progress"
            );
        }
    }

    let stats = builder.stats();
    let schema = builder.build();
    tracing::info!(tables = schema.len(), "identified tables");

    write_artifact(&config.schema_output, |out| {
        write_schema(&schema, out).map_err(|e| XmlMeltError::io(&config.schema_output, e))
    })?;
    tracing::info!(path = %config.schema_output.display(), "schema written");

    Ok(PassReport {
        tables: schema.len(),
        columns: schema.column_count(),
        elements: stats.elements,
        widened: stats.widened,
        ..PassReport::new(Pass::Infer, started)
    })
}

/// Pass 2: unfiltered schema -> filtered schema
pub fn filter_pass(config: &PipelineConfig) -> Result<PassReport> {
    let started = Instant::now();
    let text = read_artifact(&config.schema_output)?;

    let outcome = parse_schema_blocks(&text);
    let before = outcome.schema.len();
    let schema = filter_schema(outcome.schema);

    write_artifact(&config.filtered_schema_output, |out| {
        write_schema(&schema, out)
            .map_err(|e| XmlMeltError::io(&config.filtered_schema_output, e))
    })?;
    tracing::info!(
        path = %config.filtered_schema_output.display(),
        kept = schema.len(),
        dropped = before - schema.len(),
        "filtered schema written"
    );

    Ok(PassReport {
        tables: schema.len(),
        columns: schema.column_count(),
        skipped_lines: outcome.skipped_lines,
        dropped_tables: before - schema.len(),
        ..PassReport::new(Pass::Filter, started)
    })
}

/// Pass 3: filtered schema + document -> insert statements
pub fn extract_pass(config: &PipelineConfig) -> Result<PassReport> {
    let started = Instant::now();
    let text = read_artifact(&config.filtered_schema_output)?;
    let schema = parse_schema(&text);
    tracing::info!(
        path = %config.filtered_schema_output.display(),
        tables = schema.len(),
        "loaded schema"
    );

    let plan = MeltPlan::from_schema(&schema);
    if plan.is_empty() {
        tracing::warn!("schema declares no tables, no statements will be written");
    }
    tracing::debug!(matchable = plan.len(), "extraction plan ready");

    let mut melter = PlannedMelter::with_spill_limit(plan, config.spill_limit_bytes);
    let mut walker = XmlWalker::open(&config.input)?;
    let data_output = &config.data_output;

    let rows = write_artifact(data_output, |out| {
        let mut writer = InsertWriter::new(out);
        while let Some(event) = walker.next() {
            let event = event?;
            let is_start = matches!(event, WalkEvent::Start { .. });
            melter
                .melt(event, &mut writer)
                .map_err(|e| XmlMeltError::io(data_output, e))?;

            let stats = melter.stats();
            if is_start && progress_due(config, stats.elements) {
                tracing::debug!(
                    elements = stats.elements,
                    depth = walker.depth(),
                    rows = stats.rows,
                    pending_cells = melter.pending_cells(),
                    elapsed = format_args!("{:.2}s", started.elapsed().as_secs_f64()),
                    "progress"
                );
            }
        }
        writer.finish().map_err(|e| XmlMeltError::io(data_output, e))
    })?;
    tracing::info!(path = %data_output.display(), rows, "data written");

    let stats = melter.stats();
    Ok(PassReport {
        tables: schema.len(),
        columns: schema.column_count(),
        elements: stats.elements,
        rows,
        ..PassReport::new(Pass::Extract, started)
    })
}

fn progress_due(config: &PipelineConfig, elements: u64) -> bool {
    config.progress_every > 0 && elements % config.progress_every == 0
}

fn read_artifact(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| XmlMeltError::io(path, e))
}

/// Create `path`, run `body` against a buffered writer and flush it.
///
/// On failure the partial file is removed.
fn write_artifact<T, F>(path: &Path, body: F) -> Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T>,
{
    let file = File::create(path).map_err(|e| XmlMeltError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let outcome = body(&mut writer).and_then(|value| {
        writer.flush().map_err(|e| XmlMeltError::io(path, e))?;
        Ok(value)
    });

    if outcome.is_err() {
        drop(writer);
        let _ = std::fs::remove_file(path);
    }
    outcome
}
