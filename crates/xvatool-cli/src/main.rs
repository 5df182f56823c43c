//! xvatool CLI - convert Xen XVA exports to raw disk images.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xvatool_core::{convert_archive, ConvertOptions, RandomCid};

/// Convert Xen XVA export archives to raw disk images with VMDK descriptors.
#[derive(Parser)]
#[command(name = "xvatool")]
#[command(version, about, long_about = None)]
struct Cli {
    /// XVA archives to convert, processed in order.
    #[arg(required = true)]
    archives: Vec<PathBuf>,

    /// Output directory. Defaults to each archive's own directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Abort on the first checksum mismatch instead of warning.
    #[arg(long)]
    strict_checksums: bool,

    /// Suppress the per-disk summary.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = ConvertOptions {
        strict_checksums: cli.strict_checksums,
    };
    let mut cids = RandomCid::new();

    for archive in &cli.archives {
        let out_dir = resolve_output_dir(archive, cli.output.as_deref());
        let report = convert_archive(archive, &out_dir, &options, &mut cids)
            .with_context(|| format!("converting {}", archive.display()))?;

        if cli.quiet {
            continue;
        }
        if report.disks.is_empty() {
            println!("{}: no disks referenced", archive.display());
            continue;
        }
        println!("{}:", archive.display());
        for disk in &report.disks {
            println!(
                "  disk {}: {} ({})",
                disk.index,
                disk.raw_path.display(),
                format_bytes(disk.size_bytes)
            );
        }
    }

    Ok(())
}

/// Resolve the output directory for one archive: the explicit `-o` value,
/// else the archive's own directory.
fn resolve_output_dir(archive: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(dir) = output {
        return dir.to_path_buf();
    }
    match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Format bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_output_dir_explicit() {
        let dir = resolve_output_dir(Path::new("/exports/vm.xva"), Some(Path::new("/out")));
        assert_eq!(dir, PathBuf::from("/out"));
    }

    #[test]
    fn test_resolve_output_dir_defaults_to_archive_dir() {
        let dir = resolve_output_dir(Path::new("/exports/vm.xva"), None);
        assert_eq!(dir, PathBuf::from("/exports"));
    }

    #[test]
    fn test_resolve_output_dir_bare_name() {
        let dir = resolve_output_dir(Path::new("vm.xva"), None);
        assert_eq!(dir, PathBuf::from("."));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(100), "100 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(8 * 1024 * 1024), "8.00 MB");
    }
}
