// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fallible feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can abort the pipeline at startup.
///
/// Steady-state anomalies (framing problems, order rejections) are never
/// errors; they are counted in [`crate::metrics::PipelineStats`] and the
/// stream continues.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed file could not be opened or memory-mapped.
    #[error("failed to open feed {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The feed file has zero length; there is nothing to map.
    #[error("feed file is empty: {0}")]
    EmptyInput(PathBuf),
}
