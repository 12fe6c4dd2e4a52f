//! Raw image creation and GPT partitioning.
//!
//! Thin binding of the disk engine contract onto the `gpt` crate: create
//! the raw file, write a protective MBR, and lay down a GPT with the
//! partition entries described by a [`GptTableSpec`]. The core pipeline
//! only ever goes through this module and [`fat`], never through the
//! engine crates directly.

pub mod fat;

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

use gpt::disk::LogicalBlockSize;
use gpt::mbr::ProtectiveMBR;
use gpt::partition_types;
use gpt::GptConfig;
use uuid::Uuid;

use crate::error::BuildError;
use crate::geometry::SECTOR_SIZE;
use fat::FatVolume;

/// One partition entry of the table, in sectors. All partitions created
/// by this builder are EFI system partitions.
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    pub name: String,
    pub start_sector: u64,
    pub end_sector: u64,
}

/// GPT table description handed to the partitioning engine.
#[derive(Debug, Clone)]
pub struct GptTableSpec {
    pub logical_block_size: u64,
    pub physical_block_size: u64,
    pub protective_mbr: bool,
    pub partitions: Vec<PartitionSpec>,
}

/// Which partition to format and how to label the volume.
#[derive(Debug, Clone)]
pub struct FilesystemSpec {
    /// 1-based partition index into the written table.
    pub partition: usize,
    /// FAT volume label, space padded to 11 bytes.
    pub volume_label: [u8; 11],
}

/// A raw disk image file being assembled.
pub struct RawImage {
    file: File,
    size: u64,
    partitions: Vec<PartitionSpec>,
}

impl RawImage {
    /// Create (or truncate) the image file at `path` with `total_size`
    /// bytes.
    pub fn create(path: &Path, total_size: u64) -> Result<Self, BuildError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.set_len(total_size)?;

        Ok(RawImage {
            file,
            size: total_size,
            partitions: Vec::new(),
        })
    }

    /// Write the protective MBR and the GPT described by `table`.
    pub fn partition(&mut self, table: &GptTableSpec) -> Result<(), BuildError> {
        if table.logical_block_size != SECTOR_SIZE || table.physical_block_size != SECTOR_SIZE {
            return Err(BuildError::Partition(format!(
                "only {}-byte blocks are supported",
                SECTOR_SIZE
            )));
        }

        if table.protective_mbr {
            let lb_count = u32::try_from(self.size / SECTOR_SIZE - 1).unwrap_or(u32::MAX);
            ProtectiveMBR::with_lb_size(lb_count)
                .overwrite_lba0(&mut self.file)
                .map_err(|err| {
                    BuildError::Partition(format!("writing protective MBR: {}", err))
                })?;
        }

        let mut disk = GptConfig::new()
            .writable(true)
            .initialized(false)
            .logical_block_size(LogicalBlockSize::Lb512)
            .create_from_device(Box::new(&mut self.file), None)
            .map_err(|err| BuildError::Partition(format!("creating GPT: {}", err)))?;

        let mut entries = BTreeMap::new();
        for (idx, part) in table.partitions.iter().enumerate() {
            entries.insert(
                idx as u32 + 1,
                gpt::partition::Partition {
                    part_type_guid: partition_types::EFI,
                    part_guid: Uuid::new_v4(),
                    first_lba: part.start_sector,
                    last_lba: part.end_sector,
                    flags: 0,
                    name: part.name.clone(),
                },
            );
        }

        disk.update_partitions(entries)
            .map_err(|err| BuildError::Partition(format!("placing partitions: {}", err)))?;
        disk.write()
            .map_err(|err| BuildError::Partition(format!("writing GPT: {}", err)))?;

        self.partitions = table.partitions.clone();
        Ok(())
    }

    /// Format one partition's byte range as FAT32 and hand back the
    /// volume for population. Consumes the image; the volume owns the
    /// underlying file until [`FatVolume::finish`].
    pub fn create_filesystem(self, spec: &FilesystemSpec) -> Result<FatVolume, BuildError> {
        let part = spec
            .partition
            .checked_sub(1)
            .and_then(|idx| self.partitions.get(idx))
            .ok_or_else(|| {
                BuildError::Filesystem(format!("no partition {} in table", spec.partition))
            })?;

        let start = part.start_sector * SECTOR_SIZE;
        let end = (part.end_sector + 1) * SECTOR_SIZE;
        FatVolume::format(self.file, start, end, spec.volume_label)
    }
}
