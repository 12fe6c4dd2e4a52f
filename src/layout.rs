//! Boot layout conventions and boot-loader configuration text.
//!
//! Two mutually exclusive conventions are supported, each matching one
//! UEFI boot discovery mechanism:
//!
//! - **Loader entries**: a systemd-boot style menu described by
//!   `/loader/loader.conf` and `/loader/entries/default.conf`, with the
//!   artifacts placed under `/boot/`.
//! - **EFI fallback**: the UEFI removable-media default path; the single
//!   bootable payload is copied to `/EFI/BOOT/BOOTX64.EFI` and no
//!   configuration text is generated.
//!
//! A given image serves exactly one mechanism, so the convention is fixed
//! for the whole run.

use std::path::Path;

use crate::artifact::{Artifact, ArtifactRole, ArtifactSet};

pub const MIB: u64 = 1024 * 1024;

/// Fixed content of `/loader/loader.conf` (loader-entries convention).
pub const LOADER_CONF: &str = "default       default\n\
                               timeout       0\n\
                               editor        no\n\
                               auto-entries  0\n\
                               auto-firmware 0\n\
                               console-mode  auto\n";

/// Which boot discovery convention the image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootLayout {
    /// Boot-loader-spec style menu under `/loader`.
    LoaderEntries,
    /// UEFI removable-media fallback path `/EFI/BOOT/BOOTX64.EFI`.
    EfiFallback,
}

impl BootLayout {
    /// Alignment unit applied to the summed artifact size.
    pub fn alignment_unit(&self) -> u64 {
        match self {
            BootLayout::LoaderEntries => 4 * MIB,
            BootLayout::EfiFallback => MIB,
        }
    }

    /// Extra ESP space reserved on top of the aligned size budget.
    pub fn esp_reserve(&self) -> u64 {
        match self {
            BootLayout::LoaderEntries => 0,
            BootLayout::EfiFallback => 4 * MIB,
        }
    }

    /// Directories that must exist before any file is written, in
    /// creation order (parents first).
    pub fn directories(&self) -> &'static [&'static str] {
        match self {
            BootLayout::LoaderEntries => &["/loader", "/loader/entries", "/boot"],
            BootLayout::EfiFallback => &["/EFI", "/EFI/BOOT"],
        }
    }

    /// Destination path inside the image for one artifact, or `None` if
    /// the artifact has no place in this convention.
    pub fn destination(&self, artifact: &Artifact) -> Option<String> {
        match artifact.role {
            ArtifactRole::Kernel => Some(match self {
                BootLayout::LoaderEntries => {
                    format!("/boot/{}", base_name(&artifact.source))
                }
                BootLayout::EfiFallback => "/EFI/BOOT/BOOTX64.EFI".to_string(),
            }),
            ArtifactRole::Initrd | ArtifactRole::Rootfs => match self {
                BootLayout::LoaderEntries => {
                    Some(format!("/boot/{}", base_name(&artifact.source)))
                }
                // The fallback path boots a single self-contained payload.
                BootLayout::EfiFallback => None,
            },
            // NoCloud seed files sit at the filesystem root in both
            // conventions; the datasource finds them by volume label.
            ArtifactRole::MetaData => Some("/meta-data".to_string()),
            ArtifactRole::UserData => Some("/user-data".to_string()),
            ArtifactRole::NetworkConfig => Some("/network-config".to_string()),
        }
    }

    /// Generated configuration files for this convention, as
    /// `(path, content)` pairs in write order. Empty for the fallback
    /// convention, which carries no configuration text.
    pub fn config_files(
        &self,
        artifacts: &ArtifactSet,
        cmdline: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        match self {
            BootLayout::LoaderEntries => vec![
                ("/loader/loader.conf", LOADER_CONF.to_string()),
                (
                    "/loader/entries/default.conf",
                    entry_conf(
                        &base_name(&artifacts.kernel().source),
                        artifacts
                            .get(ArtifactRole::Initrd)
                            .map(|a| base_name(&a.source))
                            .as_deref(),
                        cmdline,
                    ),
                ),
            ],
            BootLayout::EfiFallback => vec![],
        }
    }
}

/// Render `/loader/entries/default.conf`.
///
/// The `initrd` line is emitted only when an initrd is present and the
/// `options` line only for a non-empty command line, so identical inputs
/// always produce byte-identical text.
pub fn entry_conf(kernel: &str, initrd: Option<&str>, cmdline: Option<&str>) -> String {
    let mut conf = String::from("title Default\n");
    conf.push_str(&format!("linux /boot/{}\n", kernel));
    if let Some(initrd) = initrd {
        conf.push_str(&format!("initrd /boot/{}\n", initrd));
    }
    if let Some(cmdline) = cmdline.filter(|c| !c.is_empty()) {
        conf.push_str(&format!("options {}\n", cmdline));
    }
    conf
}

/// Final `/`-separated component of a source path.
///
/// Splits on `/` directly rather than going through the host's path
/// semantics, so the result does not depend on the platform the builder
/// runs on.
pub fn base_name(path: &Path) -> String {
    let raw = path.to_string_lossy();
    raw.rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(&raw)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_loader_conf_content() {
        let expected = "default       default\n\
                        timeout       0\n\
                        editor        no\n\
                        auto-entries  0\n\
                        auto-firmware 0\n\
                        console-mode  auto\n";
        assert_eq!(LOADER_CONF, expected);
        assert_eq!(LOADER_CONF.lines().count(), 6);
    }

    #[test]
    fn test_entry_conf_full() {
        let conf = entry_conf("vmlinuz", Some("initrd.img"), Some("console=ttyS0"));
        assert_eq!(
            conf,
            "title Default\nlinux /boot/vmlinuz\ninitrd /boot/initrd.img\noptions console=ttyS0\n"
        );
    }

    #[test]
    fn test_entry_conf_omits_absent_initrd() {
        let conf = entry_conf("vmlinuz", None, Some("quiet"));
        assert_eq!(conf, "title Default\nlinux /boot/vmlinuz\noptions quiet\n");
    }

    #[test]
    fn test_entry_conf_omits_empty_cmdline() {
        let conf = entry_conf("vmlinuz", None, Some(""));
        assert_eq!(conf, "title Default\nlinux /boot/vmlinuz\n");
        assert_eq!(conf, entry_conf("vmlinuz", None, None));
    }

    #[test]
    fn test_entry_conf_deterministic() {
        let a = entry_conf("bzImage", Some("initramfs.img"), Some("ro quiet"));
        let b = entry_conf("bzImage", Some("initramfs.img"), Some("ro quiet"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/tmp/vmlinuz")), "vmlinuz");
        assert_eq!(base_name(Path::new("vmlinuz")), "vmlinuz");
        assert_eq!(base_name(Path::new("/a/b/c/initrd.img")), "initrd.img");
    }

    #[test]
    fn test_alignment_and_reserve_per_convention() {
        assert_eq!(BootLayout::LoaderEntries.alignment_unit(), 4 * MIB);
        assert_eq!(BootLayout::LoaderEntries.esp_reserve(), 0);
        assert_eq!(BootLayout::EfiFallback.alignment_unit(), MIB);
        assert_eq!(BootLayout::EfiFallback.esp_reserve(), 4 * MIB);
    }

    fn artifact(role: ArtifactRole, source: &str) -> Artifact {
        Artifact {
            role,
            source: PathBuf::from(source),
            size: 0,
        }
    }

    #[test]
    fn test_destinations_loader_entries() {
        let layout = BootLayout::LoaderEntries;
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::Kernel, "/tmp/vmlinuz")),
            Some("/boot/vmlinuz".to_string())
        );
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::Rootfs, "/tmp/rootfs.img")),
            Some("/boot/rootfs.img".to_string())
        );
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::MetaData, "/tmp/md")),
            Some("/meta-data".to_string())
        );
    }

    #[test]
    fn test_destinations_efi_fallback() {
        let layout = BootLayout::EfiFallback;
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::Kernel, "/tmp/payload.efi")),
            Some("/EFI/BOOT/BOOTX64.EFI".to_string())
        );
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::Initrd, "/tmp/initrd.img")),
            None
        );
        assert_eq!(
            layout.destination(&artifact(ArtifactRole::UserData, "/tmp/ud")),
            Some("/user-data".to_string())
        );
    }

    #[test]
    fn test_config_files_efi_fallback_is_empty() {
        let temp = TempDir::new().unwrap();
        let kernel = temp.path().join("payload.efi");
        fs::write(&kernel, b"efi").unwrap();
        let set =
            ArtifactSet::resolve(&[(ArtifactRole::Kernel, Some(kernel.as_path()))]).unwrap();

        assert!(BootLayout::EfiFallback
            .config_files(&set, Some("ignored"))
            .is_empty());
    }

    #[test]
    fn test_config_files_loader_entries() {
        let temp = TempDir::new().unwrap();
        let kernel = temp.path().join("vmlinuz");
        let initrd = temp.path().join("initrd.img");
        fs::write(&kernel, b"k").unwrap();
        fs::write(&initrd, b"i").unwrap();
        let set = ArtifactSet::resolve(&[
            (ArtifactRole::Kernel, Some(kernel.as_path())),
            (ArtifactRole::Initrd, Some(initrd.as_path())),
        ])
        .unwrap();

        let files = BootLayout::LoaderEntries.config_files(&set, Some("console=ttyS0"));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "/loader/loader.conf");
        assert_eq!(files[0].1, LOADER_CONF);
        assert_eq!(files[1].0, "/loader/entries/default.conf");
        assert_eq!(
            files[1].1,
            "title Default\nlinux /boot/vmlinuz\ninitrd /boot/initrd.img\noptions console=ttyS0\n"
        );
    }
}
