//! Size alignment and GPT partition geometry.
//!
//! The summed artifact size is rounded up to the layout's alignment unit
//! to form the size budget, then converted into the sector range of the
//! single EFI system partition plus the total disk size. A fixed 4 MiB is
//! always reserved on top of the ESP for the protective MBR and the GPT
//! header/entry copies.

use crate::error::BuildError;
use crate::layout::{BootLayout, MIB};

/// Logical (and physical) block size of the image.
pub const SECTOR_SIZE: u64 = 512;

/// First sector of the ESP, the conventional 1 MiB alignment offset.
pub const PARTITION_START_SECTOR: u64 = 2048;

/// Space reserved beyond the ESP for GPT/MBR metadata.
pub const GPT_RESERVE: u64 = 4 * MIB;

/// Round `total` up to the next multiple of `unit`.
pub fn align_up(total: u64, unit: u64) -> u64 {
    match total % unit {
        0 => total,
        rem => total + (unit - rem),
    }
}

/// Size budget for the image: summed artifact bytes aligned to the
/// layout's unit.
pub fn size_budget(total_artifact_size: u64, layout: BootLayout) -> u64 {
    align_up(total_artifact_size, layout.alignment_unit())
}

/// Sector-level placement of the single ESP and the resulting disk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionGeometry {
    pub logical_block_size: u64,
    pub esp_size: u64,
    pub disk_size: u64,
    pub start_sector: u64,
    pub sector_count: u64,
    pub end_sector: u64,
}

impl PartitionGeometry {
    /// Derive the geometry for `budget` bytes under the given convention.
    ///
    /// Loader-entries images use the budget as the ESP size directly; the
    /// fallback convention adds its own 4 MiB ESP reserve first. Both add
    /// the fixed GPT reserve on top for the total disk size.
    pub fn for_layout(budget: u64, layout: BootLayout) -> Result<Self, BuildError> {
        let esp_size = budget + layout.esp_reserve();
        if esp_size < PARTITION_START_SECTOR * SECTOR_SIZE {
            return Err(BuildError::Geometry(format!(
                "ESP of {} bytes cannot start at sector {}",
                esp_size, PARTITION_START_SECTOR
            )));
        }

        // alignment_unit is a multiple of 512, so this divides evenly.
        let sector_count = esp_size / SECTOR_SIZE;

        Ok(PartitionGeometry {
            logical_block_size: SECTOR_SIZE,
            esp_size,
            disk_size: esp_size + GPT_RESERVE,
            start_sector: PARTITION_START_SECTOR,
            sector_count,
            end_sector: sector_count - PARTITION_START_SECTOR + 1,
        })
    }
}
