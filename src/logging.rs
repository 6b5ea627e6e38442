//! Process log setup.
//!
//! Events go to stderr and, when a log file is configured, are also appended
//! to it without ANSI colors so the file stays readable.

use crate::error::{Result, XmlMeltError};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let default_directive = if verbose { "xmlmelt=debug" } else { "xmlmelt=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| XmlMeltError::io(path, e))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| XmlMeltError::Config(format!("logging already initialized: {}", e)))
}

/// Resident set size of this process in MiB, if the platform reports it
pub fn resident_memory_mb() -> Option<f64> {
    memory_stats::memory_stats().map(|stats| stats.physical_mem as f64 / (1024.0 * 1024.0))
}
