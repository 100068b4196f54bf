use clap::Parser;
use floppygen_core::{BuildError, MissingInputPolicy};
use floppygen_fat12::{Geometry, ImageBuilder};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "floppygen")]
#[command(about = "Build a bootable FAT12 floppy disk image", long_about = None)]
struct Cli {
    /// Boot sector binary, placed at sector 0
    #[arg(long, default_value = "build/boot.bin")]
    boot: PathBuf,

    /// Kernel binary, placed in the reserved area after the boot sector
    #[arg(long, default_value = "build/kernel.bin")]
    kernel: PathBuf,

    /// Directory of files to add to the root directory
    #[arg(long, default_value = "rootfs")]
    root_dir: PathBuf,

    /// Output image path
    #[arg(short, long, default_value = "build/floppy.img")]
    output: PathBuf,

    /// Warn and leave the region zeroed when the boot sector or kernel
    /// binary is missing, instead of failing. The image will not boot.
    #[arg(long)]
    allow_missing: bool,
}

fn load_payload(
    path: &Path,
    what: &str,
    policy: MissingInputPolicy,
) -> Result<Option<Vec<u8>>, BuildError> {
    if path.is_file() {
        let bytes = fs::read(path)?;
        info!("read {} from {} ({} bytes)", what, path.display(), bytes.len());
        return Ok(Some(bytes));
    }

    match policy {
        MissingInputPolicy::Fail => Err(BuildError::MissingInput(format!(
            "{} not found: {} (pass --allow-missing to build without it)",
            what,
            path.display()
        ))),
        MissingInputPolicy::WarnAndZero => {
            warn!("{} not found: {}, leaving the region zeroed", what, path.display());
            Ok(None)
        }
    }
}

fn collect_root_files(dir: &Path) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    // Sort by name so the same tree always produces the same image
    entries.sort_by_key(|e| e.file_name());

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            warn!("skipping {}: not a regular file", path.display());
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let content = fs::read(&path)?;
        files.push((name, content));
    }
    Ok(files)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let cli = Cli::parse();

    let policy = if cli.allow_missing {
        MissingInputPolicy::WarnAndZero
    } else {
        MissingInputPolicy::Fail
    };

    let geometry = Geometry::floppy_1440();
    let mut builder = ImageBuilder::new(geometry)?;

    if let Some(boot) = load_payload(&cli.boot, "boot sector", policy)? {
        builder.write_boot_sector(&boot);
    }
    if let Some(kernel) = load_payload(&cli.kernel, "kernel", policy)? {
        builder.write_kernel(&kernel)?;
    }

    if cli.root_dir.is_dir() {
        for (name, content) in collect_root_files(&cli.root_dir)? {
            info!("adding {} ({} bytes)", name, content.len());
            builder.add_file(&name, &content)?;
        }
    } else {
        warn!(
            "root directory {} not found, image will contain no files",
            cli.root_dir.display()
        );
    }

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    builder.save(&cli.output)?;

    Ok(())
}
