use std::path::PathBuf;

use anyhow::{bail, Result};
use bootimg_builder::{assemble, BootLayout, BuildRequest};

fn usage() -> &'static str {
    "Usage:\n  bootimg-builder <loader-entries|efi-fallback> [flags]\n\nFlags:\n  -disk <path>            disk image file path (default /tmp/disk.img)\n  -kernel <path>          kernel image file path (required)\n  -initrd <path>          initrd image file path\n  -rootfs <path>          rootfs image file path\n  -cmdline <string>       kernel boot arguments\n  -metaData <path>        cloud-init nocloud meta-data file path\n  -userData <path>        cloud-init nocloud user-data file path\n  -networkConfig <path>   cloud-init nocloud network-config file path"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let (layout, flags) = match args.split_first() {
        Some((cmd, rest)) if cmd == "loader-entries" => (BootLayout::LoaderEntries, rest),
        Some((cmd, rest)) if cmd == "efi-fallback" => (BootLayout::EfiFallback, rest),
        Some((other, _)) => bail!("unknown command '{}'\n{}", other, usage()),
        // No arguments at all is the help path, not an error.
        None => {
            println!("{}", usage());
            return Ok(());
        }
    };

    let mut disk = PathBuf::from("/tmp/disk.img");
    let mut kernel: Option<PathBuf> = None;
    let mut initrd: Option<PathBuf> = None;
    let mut rootfs: Option<PathBuf> = None;
    let mut cmdline: Option<String> = None;
    let mut meta_data: Option<PathBuf> = None;
    let mut user_data: Option<PathBuf> = None;
    let mut network_config: Option<PathBuf> = None;

    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("flag '{}' requires a value\n{}", flag, usage()))
        };
        match flag.as_str() {
            "-disk" => disk = PathBuf::from(value()?),
            "-kernel" => kernel = Some(PathBuf::from(value()?)),
            "-initrd" => initrd = Some(PathBuf::from(value()?)),
            "-rootfs" => rootfs = Some(PathBuf::from(value()?)),
            "-cmdline" => cmdline = Some(value()?),
            "-metaData" => meta_data = Some(PathBuf::from(value()?)),
            "-userData" => user_data = Some(PathBuf::from(value()?)),
            "-networkConfig" => network_config = Some(PathBuf::from(value()?)),
            other => bail!("unknown flag '{}'\n{}", other, usage()),
        }
    }

    // Missing required inputs print the flag help and exit cleanly
    // without creating any file.
    let kernel = match kernel {
        Some(path) if !path.as_os_str().is_empty() && !disk.as_os_str().is_empty() => path,
        _ => {
            println!("{}", usage());
            return Ok(());
        }
    };

    let request = BuildRequest {
        disk,
        layout,
        kernel,
        initrd,
        rootfs,
        cmdline,
        meta_data,
        user_data,
        network_config,
    };

    assemble(&request)?;
    Ok(())
}
