//! Boot artifact inventory and size accounting.
//!
//! An [`ArtifactSet`] is resolved once per run from the caller-supplied
//! source paths. Each present artifact is stat-ed for its byte length so
//! the ESP size can be computed before any disk I/O happens.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Logical role of a boot artifact inside the image.
///
/// The enum order is the copy order used when populating the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Kernel,
    Initrd,
    Rootfs,
    MetaData,
    UserData,
    NetworkConfig,
}

impl ArtifactRole {
    /// All roles in their fixed copy order.
    pub const ALL: [ArtifactRole; 6] = [
        ArtifactRole::Kernel,
        ArtifactRole::Initrd,
        ArtifactRole::Rootfs,
        ArtifactRole::MetaData,
        ArtifactRole::UserData,
        ArtifactRole::NetworkConfig,
    ];

    /// Human-readable name, matching the CLI flag spelling.
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactRole::Kernel => "kernel",
            ArtifactRole::Initrd => "initrd",
            ArtifactRole::Rootfs => "rootfs",
            ArtifactRole::MetaData => "meta-data",
            ArtifactRole::UserData => "user-data",
            ArtifactRole::NetworkConfig => "network-config",
        }
    }
}

/// A single resolved boot artifact: where it comes from and how big it is.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub role: ArtifactRole,
    pub source: PathBuf,
    pub size: u64,
}

/// Role-ordered collection of the artifacts present in this run.
///
/// Immutable after construction; the kernel is held separately so its
/// presence is guaranteed by construction rather than checked at use.
#[derive(Debug)]
pub struct ArtifactSet {
    kernel: Artifact,
    optional: Vec<Artifact>,
}

impl ArtifactSet {
    /// Stat every supplied source and build the set.
    ///
    /// The kernel is mandatory; all other roles are skipped when `None`.
    /// A missing kernel path or a path that names a directory is an input
    /// error, stat failures propagate as I/O errors.
    pub fn resolve(sources: &[(ArtifactRole, Option<&Path>)]) -> Result<Self, BuildError> {
        let lookup = |role: ArtifactRole| {
            sources
                .iter()
                .find(|(r, _)| *r == role)
                .and_then(|(_, path)| *path)
        };

        let kernel = match lookup(ArtifactRole::Kernel) {
            Some(path) => Self::stat_artifact(ArtifactRole::Kernel, path)?,
            None => {
                return Err(BuildError::Input(
                    "a kernel image file path is required".to_string(),
                ));
            }
        };

        let mut optional = Vec::new();
        for role in ArtifactRole::ALL.into_iter().skip(1) {
            if let Some(path) = lookup(role) {
                optional.push(Self::stat_artifact(role, path)?);
            }
        }

        Ok(ArtifactSet { kernel, optional })
    }

    fn stat_artifact(role: ArtifactRole, path: &Path) -> Result<Artifact, BuildError> {
        let meta = fs::metadata(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound && role == ArtifactRole::Kernel {
                BuildError::Input(format!(
                    "kernel image '{}' does not exist",
                    path.display()
                ))
            } else {
                BuildError::Io(err)
            }
        })?;

        if meta.is_dir() {
            return Err(BuildError::not_a_file(path));
        }

        Ok(Artifact {
            role,
            source: path.to_path_buf(),
            size: meta.len(),
        })
    }

    /// Sum of all present artifact sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.iter().map(|a| a.size).sum()
    }

    /// The artifact filling `role`, if present.
    pub fn get(&self, role: ArtifactRole) -> Option<&Artifact> {
        self.iter().find(|a| a.role == role)
    }

    /// The mandatory kernel artifact.
    pub fn kernel(&self) -> &Artifact {
        &self.kernel
    }

    /// All present artifacts in copy order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.kernel).chain(self.optional.iter())
    }
}
