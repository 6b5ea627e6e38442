use crate::error::{Result, XmlMeltError};
use crate::melt::DEFAULT_SPILL_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations and reporting settings for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source XML document
    pub input: PathBuf,

    /// Pass 1 output: every discovered table
    pub schema_output: PathBuf,

    /// Pass 2 output: tables with at least one column
    pub filtered_schema_output: PathBuf,

    /// Pass 3 output: insert statements
    pub data_output: PathBuf,

    /// Append-only process log, `None` to log to stderr only
    pub log_file: Option<PathBuf>,

    /// Log progress every N elements (0 disables)
    pub progress_every: u64,

    /// Bytes of nested statements an open element may hold in memory before
    /// they move to a temporary file
    pub spill_limit_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input: PathBuf::from("base-20241001T000000-20241005T010000.xml"),
            schema_output: PathBuf::from("schema_output.sql"),
            filtered_schema_output: PathBuf::from("filtered_schema_output.sql"),
            data_output: PathBuf::from("data_output.sql"),
            log_file: Some(PathBuf::from("process_log.txt")),
            progress_every: 100_000,
            spill_limit_bytes: DEFAULT_SPILL_LIMIT,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path).map_err(|e| XmlMeltError::io(&path, e))?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| {
            XmlMeltError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(config)
    }

    /// Place every artifact (not the input) inside `dir`, keeping file names
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        let relocate = |path: &Path| match path.file_name() {
            Some(name) => dir.join(name),
            None => dir.join(path),
        };
        self.schema_output = relocate(&self.schema_output);
        self.filtered_schema_output = relocate(&self.filtered_schema_output);
        self.data_output = relocate(&self.data_output);
        self.log_file = self.log_file.as_deref().map(relocate);
        self
    }

    /// Reject configurations where one artifact would overwrite another
    pub fn validate(&self) -> Result<()> {
        let artifacts = [
            ("schema_output", &self.schema_output),
            ("filtered_schema_output", &self.filtered_schema_output),
            ("data_output", &self.data_output),
        ];

        for (i, (name, path)) in artifacts.iter().enumerate() {
            if *path == &self.input {
                return Err(XmlMeltError::Config(format!(
                    "{} would overwrite the input document {}",
                    name,
                    path.display()
                )));
            }
            for (other, other_path) in &artifacts[i + 1..] {
                if path == other_path {
                    return Err(XmlMeltError::Config(format!(
                        "{} and {} both point to {}",
                        name,
                        other,
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}
