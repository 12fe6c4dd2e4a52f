//! The assembly pipeline: size → geometry → image → partition →
//! filesystem → populate.
//!
//! Strictly sequential with no retries and no rollback; the first error
//! ends the run and whatever was written so far stays on disk.

use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactRole, ArtifactSet};
use crate::error::BuildError;
use crate::geometry::{size_budget, PartitionGeometry};
use crate::image::{FilesystemSpec, GptTableSpec, PartitionSpec, RawImage};
use crate::layout::{BootLayout, MIB};
use crate::populate::populate;

/// FAT volume label; cloud-init's NoCloud datasource discovers the seed
/// files by this label.
pub const VOLUME_LABEL: [u8; 11] = *b"CIDATA     ";

/// Everything one build needs, resolved from the CLI once per run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Destination raw image file.
    pub disk: PathBuf,
    /// Boot discovery convention the image serves.
    pub layout: BootLayout,
    pub kernel: PathBuf,
    pub initrd: Option<PathBuf>,
    pub rootfs: Option<PathBuf>,
    /// Kernel command line, embedded verbatim in the `options` line.
    pub cmdline: Option<String>,
    pub meta_data: Option<PathBuf>,
    pub user_data: Option<PathBuf>,
    pub network_config: Option<PathBuf>,
}

impl BuildRequest {
    fn sources(&self) -> [(ArtifactRole, Option<&Path>); 6] {
        [
            (ArtifactRole::Kernel, Some(self.kernel.as_path())),
            (ArtifactRole::Initrd, self.initrd.as_deref()),
            (ArtifactRole::Rootfs, self.rootfs.as_deref()),
            (ArtifactRole::MetaData, self.meta_data.as_deref()),
            (ArtifactRole::UserData, self.user_data.as_deref()),
            (
                ArtifactRole::NetworkConfig,
                self.network_config.as_deref(),
            ),
        ]
    }
}

/// Build the image described by `request` and return its path.
///
/// No file is created until the artifact set has resolved and the
/// geometry is known, so input errors never leave a partial image behind.
pub fn assemble(request: &BuildRequest) -> Result<PathBuf, BuildError> {
    println!("=== Building Boot Disk Image ===");

    let artifacts = ArtifactSet::resolve(&request.sources())?;
    let budget = size_budget(artifacts.total_size(), request.layout);
    let geometry = PartitionGeometry::for_layout(budget, request.layout)?;

    println!("  Artifacts: {} bytes", artifacts.total_size());
    println!("  ESP size:  {} MiB", geometry.esp_size / MIB);
    println!("  Disk size: {} MiB", geometry.disk_size / MIB);

    println!("Creating raw image at {}...", request.disk.display());
    let mut image = RawImage::create(&request.disk, geometry.disk_size)?;

    println!("Writing GPT (ESP sectors {}..{})...", geometry.start_sector, geometry.end_sector);
    image.partition(&GptTableSpec {
        logical_block_size: geometry.logical_block_size,
        physical_block_size: geometry.logical_block_size,
        protective_mbr: true,
        partitions: vec![PartitionSpec {
            name: "ESP".to_string(),
            start_sector: geometry.start_sector,
            end_sector: geometry.end_sector,
        }],
    })?;

    println!("Formatting FAT32 filesystem...");
    let volume = image.create_filesystem(&FilesystemSpec {
        partition: 1,
        volume_label: VOLUME_LABEL,
    })?;

    println!("Populating filesystem...");
    populate(&volume, request.layout, &artifacts, request.cmdline.as_deref())?;
    volume.finish()?;

    println!("Finished: {}", request.disk.display());
    Ok(request.disk.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatfs::FsOptions;
    use fscommon::StreamSlice;
    use std::fs::{self, OpenOptions};
    use std::io::Read;
    use tempfile::TempDir;

    fn request(disk: PathBuf, layout: BootLayout, kernel: PathBuf) -> BuildRequest {
        BuildRequest {
            disk,
            layout,
            kernel,
            initrd: None,
            rootfs: None,
            cmdline: None,
            meta_data: None,
            user_data: None,
            network_config: None,
        }
    }

    fn open_esp(disk: &Path) -> fatfs::FileSystem<StreamSlice<fs::File>> {
        let gpt_disk = gpt::GptConfig::new().writable(false).open(disk).unwrap();
        let part = gpt_disk.partitions().get(&1).unwrap().clone();
        let file = OpenOptions::new().read(true).write(true).open(disk).unwrap();
        let slice =
            StreamSlice::new(file, part.first_lba * 512, (part.last_lba + 1) * 512).unwrap();
        fatfs::FileSystem::new(slice, FsOptions::new()).unwrap()
    }

    fn read_to_string(fs: &fatfs::FileSystem<StreamSlice<fs::File>>, path: &str) -> String {
        let mut file = fs.root_dir().open_file(path).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_assemble_loader_entries_image() {
        let temp = TempDir::new().unwrap();
        let kernel = temp.path().join("vmlinuz");
        let initrd = temp.path().join("initrd.img");
        let meta_data = temp.path().join("meta-data");
        // FAT32 floor is ~65525 clusters, so the fixture kernel is large.
        fs::write(&kernel, vec![0xAAu8; 40 * MIB as usize]).unwrap();
        fs::write(&initrd, vec![0xBBu8; MIB as usize]).unwrap();
        fs::write(&meta_data, "instance-id: test\n").unwrap();

        let disk = temp.path().join("disk.img");
        let mut req = request(disk.clone(), BootLayout::LoaderEntries, kernel);
        req.initrd = Some(initrd);
        req.meta_data = Some(meta_data);
        req.cmdline = Some("console=ttyS0".to_string());

        assemble(&req).unwrap();

        // 41 MiB of artifacts → 44 MiB budget → 48 MiB disk.
        assert_eq!(fs::metadata(&disk).unwrap().len(), 48 * MIB);

        let esp = open_esp(&disk);
        assert_eq!(
            read_to_string(&esp, "loader/entries/default.conf"),
            "title Default\nlinux /boot/vmlinuz\ninitrd /boot/initrd.img\noptions console=ttyS0\n"
        );
        assert_eq!(
            read_to_string(&esp, "loader/loader.conf"),
            crate::layout::LOADER_CONF
        );
        assert_eq!(read_to_string(&esp, "meta-data"), "instance-id: test\n");

        let mut kernel_file = esp.root_dir().open_file("boot/vmlinuz").unwrap();
        let mut copied = Vec::new();
        kernel_file.read_to_end(&mut copied).unwrap();
        assert_eq!(copied.len(), 40 * MIB as usize);
        assert!(copied.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_assemble_efi_fallback_image() {
        let temp = TempDir::new().unwrap();
        let payload = temp.path().join("payload.efi");
        fs::write(&payload, vec![0xCCu8; 40 * MIB as usize]).unwrap();

        let disk = temp.path().join("disk.img");
        let req = request(disk.clone(), BootLayout::EfiFallback, payload);
        assemble(&req).unwrap();

        // 40 MiB budget + 4 MiB ESP reserve + 4 MiB GPT reserve.
        assert_eq!(fs::metadata(&disk).unwrap().len(), 48 * MIB);

        let esp = open_esp(&disk);
        assert!(esp.root_dir().open_dir("loader").is_err());
        let mut file = esp.root_dir().open_file("EFI/BOOT/BOOTX64.EFI").unwrap();
        let mut copied = Vec::new();
        file.read_to_end(&mut copied).unwrap();
        assert_eq!(copied.len(), 40 * MIB as usize);
    }

    #[test]
    fn test_missing_kernel_leaves_no_image() {
        let temp = TempDir::new().unwrap();
        let disk = temp.path().join("disk.img");
        let req = request(
            disk.clone(),
            BootLayout::LoaderEntries,
            temp.path().join("no-such-kernel"),
        );

        let err = assemble(&req).unwrap_err();
        assert!(matches!(err, BuildError::Input(_)));
        assert!(!disk.exists());
    }
}
