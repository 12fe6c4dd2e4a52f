//! Bootable GPT disk image assembly.
//!
//! Builds a raw disk image containing a protective MBR, a GPT with a
//! single EFI System Partition, and a FAT32 filesystem populated with
//! boot artifacts and boot-loader configuration. Two boot discovery
//! conventions are supported: a systemd-boot style loader-entries menu
//! and the UEFI removable-media fallback path.
//!
//! # Architecture
//!
//! ```text
//! assemble (orchestrator)
//!     │
//!     ├── artifact   - resolves sources, sums sizes
//!     ├── geometry   - alignment + ESP sector placement
//!     ├── image      - raw file, protective MBR + GPT (gpt crate)
//!     ├── image::fat - FAT32 format + file ops (fatfs crate)
//!     ├── layout     - loader.conf / entry text, destination paths
//!     └── populate   - directories, config text, artifact copies
//! ```
//!
//! The pipeline is strictly sequential and fail-fast: the first error
//! terminates the run and nothing is retried or rolled back.

pub mod artifact;
pub mod assemble;
pub mod error;
pub mod geometry;
pub mod image;
pub mod layout;
pub mod populate;

pub use assemble::{assemble, BuildRequest};
pub use error::BuildError;
pub use layout::BootLayout;
