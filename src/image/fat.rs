//! FAT32 volume formatting and file operations.
//!
//! Wraps `fatfs` over an `fscommon::StreamSlice` windowing the partition
//! byte range, with buffered access through `BufStream`. Paths use the
//! image-absolute `/a/b` form; the leading slash is stripped before the
//! engine sees them.

use std::fs::File;
use std::io::Write;

use fatfs::{FatType, FormatVolumeOptions, FsOptions};
use fscommon::{BufStream, StreamSlice};

use crate::error::BuildError;

type PartitionStream = BufStream<StreamSlice<File>>;

/// A formatted FAT32 volume inside the image, ready for population.
pub struct FatVolume {
    fs: fatfs::FileSystem<PartitionStream>,
}

impl FatVolume {
    /// Format the byte range `[start, end)` of `file` as FAT32 with the
    /// given volume label and mount it.
    pub(crate) fn format(
        file: File,
        start: u64,
        end: u64,
        volume_label: [u8; 11],
    ) -> Result<Self, BuildError> {
        let slice = StreamSlice::new(file, start, end).map_err(fs_err)?;
        let mut stream = BufStream::new(slice);

        fatfs::format_volume(
            &mut stream,
            FormatVolumeOptions::new()
                .fat_type(FatType::Fat32)
                .volume_label(volume_label),
        )
        .map_err(fs_err)?;

        let fs = fatfs::FileSystem::new(stream, FsOptions::new()).map_err(fs_err)?;
        Ok(FatVolume { fs })
    }

    /// Create one directory. The parent must already exist and the path
    /// itself must not; both violations surface as filesystem errors.
    pub fn mkdir(&self, path: &str) -> Result<(), BuildError> {
        let path = normalize(path);
        let root = self.fs.root_dir();

        if root.open_dir(path).is_ok() || root.open_file(path).is_ok() {
            return Err(BuildError::Filesystem(format!(
                "'/{}' already exists",
                path
            )));
        }

        root.create_dir(path).map_err(fs_err)?;
        Ok(())
    }

    /// Create-or-truncate `path` and write `bytes` in a single pass.
    pub fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), BuildError> {
        let path = normalize(path);
        let mut file = self.fs.root_dir().create_file(path).map_err(fs_err)?;
        file.truncate().map_err(fs_err)?;
        file.write_all(bytes).map_err(fs_err)?;
        file.flush().map_err(fs_err)?;
        Ok(())
    }

    /// Flush everything and release the underlying image file.
    pub fn finish(self) -> Result<(), BuildError> {
        self.fs.unmount().map_err(fs_err)
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn fs_err(err: std::io::Error) -> BuildError {
    BuildError::Filesystem(err.to_string())
}
