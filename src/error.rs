//! Error taxonomy for the image assembly pipeline.
//!
//! Every stage returns `Result<_, BuildError>` and no stage retries or
//! recovers; the binary converts the first failure into a logged message
//! and a non-zero exit.

use std::path::Path;
use thiserror::Error;

/// Errors surfaced by the assembly pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A mandatory input is missing or unusable (e.g. the kernel path
    /// points at a directory).
    #[error("invalid input: {0}")]
    Input(String),

    /// Host-side I/O failure (stat/read of source artifacts, creating the
    /// image file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The derived partition geometry would not fit on the disk.
    #[error("invalid partition geometry: {0}")]
    Geometry(String),

    /// The partitioning engine rejected the GPT table.
    #[error("partitioning failed: {0}")]
    Partition(String),

    /// The filesystem engine failed to format or populate the volume.
    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl BuildError {
    /// Input error for a path that must name a regular file.
    pub fn not_a_file(path: &Path) -> Self {
        BuildError::Input(format!("'{}' is not a regular file", path.display()))
    }
}
