//! Filesystem population: directories, configuration text, artifacts.
//!
//! Operations run in a fixed order and the first failure aborts the run;
//! a partially written image is left exactly as the failure left it.

use std::fs;

use crate::artifact::ArtifactSet;
use crate::error::BuildError;
use crate::image::fat::FatVolume;
use crate::layout::BootLayout;

/// Write the chosen layout onto a freshly formatted volume.
///
/// Directories come first, then generated configuration files, then each
/// present artifact in role order. Each artifact is read fully into
/// memory and written in one pass; the buffer is dropped before the next
/// copy, so peak memory is bounded by the largest single artifact.
pub fn populate(
    volume: &FatVolume,
    layout: BootLayout,
    artifacts: &ArtifactSet,
    cmdline: Option<&str>,
) -> Result<(), BuildError> {
    for dir in layout.directories() {
        volume.mkdir(dir)?;
    }

    for (path, content) in layout.config_files(artifacts, cmdline) {
        volume.write_file(path, content.as_bytes())?;
    }

    for artifact in artifacts.iter() {
        if let Some(dest) = layout.destination(artifact) {
            let bytes = fs::read(&artifact.source)?;
            volume.write_file(&dest, &bytes)?;
        }
    }

    Ok(())
}
