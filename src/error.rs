//! Errors surfaced by the pipeline.
//!
//! Only precondition and schema failures are errors. Partial-data conditions (missing logs, malformed
//! counter blocks, absent counters) degrade to missing values and are reported through the `log` facade.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Error returned by the manifest loader, the report writers and configuration parsing.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The manifest file does not exist; nothing downstream can run.
    #[error("manifest `{0}` not found; run the experiments first")]
    ManifestNotFound(PathBuf),

    /// The manifest exists but could not be read as CSV.
    #[error("failed to read manifest `{path}`")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The manifest header lacks a column the pipeline requires.
    #[error("manifest `{path}` has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A mode rename was not of the form `old:new`.
    #[error("invalid mode rename `{0}`, expected `old:new`")]
    InvalidRename(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
