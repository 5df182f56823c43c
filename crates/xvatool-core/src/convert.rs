//! Archive conversion orchestrator.
//!
//! Drives the single streaming pass over an XVA archive:
//! 1. Open the tar stream and visit entries strictly in arrival order
//! 2. Route block payloads to the disk registry and checksum records to
//!    the verifier
//! 3. Once the pass completes, emit a VMDK descriptor for every disk the
//!    archive referenced
//!
//! Ordering is load-bearing: the checksum fast path relies on each
//! checksum record following its block, so entries are never reordered or
//! batched.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use xvatool_core::{convert_archive, ConvertOptions, RandomCid};
//!
//! let archive = Path::new("/exports/vm.xva");
//! let out_dir = Path::new("/exports");
//! let mut cids = RandomCid::new();
//!
//! let report = convert_archive(archive, out_dir, &ConvertOptions::default(), &mut cids).unwrap();
//! for disk in &report.disks {
//!     println!("disk {}: {}", disk.index, disk.raw_path.display());
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tar::Archive;
use tracing::{info, warn};

use crate::checksum::verify_block;
use crate::disk::DiskRegistry;
use crate::error::{Error, Result};
use crate::vmdk::{write_descriptor, CidGenerator};
use crate::xva::{classify_entry, EntryClass, MAX_CHECKSUM_TEXT};

/// Options for a conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Abort the run on the first checksum mismatch instead of warning.
    pub strict_checksums: bool,
}

/// Outcome for one reconstructed disk.
#[derive(Debug, Clone)]
pub struct DiskReport {
    /// Disk index from the archive's `Ref:` entries.
    pub index: u32,
    /// Path of the sparse raw image.
    pub raw_path: PathBuf,
    /// Path of the descriptor, when writing it succeeded.
    pub descriptor_path: Option<PathBuf>,
    /// Final length of the raw image in bytes.
    pub size_bytes: u64,
}

/// Summary of a completed conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertReport {
    /// One entry per disk the archive referenced, in ascending index order.
    pub disks: Vec<DiskReport>,
}

/// Derive the output base name from an archive path: the file name with a
/// trailing `.xva` removed.
pub fn archive_base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".xva") {
        Some(base) => base.to_string(),
        None => name,
    }
}

/// Convert one XVA archive into raw image / descriptor pairs in `out_dir`.
///
/// The archive is consumed entry-by-entry in a single pass; descriptors
/// are emitted afterwards for every disk the pass touched. Non-fatal
/// conditions (skipped entries, checksum warnings, descriptor write
/// failures) are reported through the logging side channel and do not
/// affect the return value.
///
/// # Errors
///
/// Returns an error on malformed entry names, underlying I/O failures,
/// short block reads, or a checksum mismatch while
/// [`ConvertOptions::strict_checksums`] is set. A fatal error unwinds the
/// pass before any descriptor is written; raw images already created are
/// left behind as-is.
pub fn convert_archive(
    archive_path: &Path,
    out_dir: &Path,
    options: &ConvertOptions,
    cids: &mut dyn CidGenerator,
) -> Result<ConvertReport> {
    let base_name = archive_base_name(archive_path);
    info!("processing {base_name}");

    let file = File::open(archive_path).map_err(|e| Error::io(e, archive_path))?;
    let mut archive = Archive::new(file);

    let mut registry = DiskRegistry::new(out_dir, &base_name);
    scan_archive(&mut archive, &mut registry, options)?;
    Ok(finalize(registry, cids))
}

/// Visit every archive entry in arrival order, routing each to the disk
/// registry or the checksum verifier.
fn scan_archive<R: Read>(
    archive: &mut Archive<R>,
    registry: &mut DiskRegistry,
    options: &ConvertOptions,
) -> Result<()> {
    for entry in archive.entries().map_err(Error::io_simple)? {
        let mut entry = entry.map_err(Error::io_simple)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        let class = match classify_entry(&name)? {
            Some(class) => class,
            None => {
                info!("skip {name}");
                continue;
            }
        };

        match class {
            EntryClass::Block { disk, block } => {
                let size = entry.size();
                registry.stream(disk)?.write_block(block, size, &mut entry)?;
            }
            EntryClass::Checksum { disk, block } => {
                let mut text = Vec::new();
                entry
                    .by_ref()
                    .take(MAX_CHECKSUM_TEXT)
                    .read_to_end(&mut text)
                    .map_err(Error::io_simple)?;
                let stream = registry.stream(disk)?;
                verify_block(stream, block, &text, options.strict_checksums)?;
            }
        }
    }
    Ok(())
}

/// Emit a descriptor for every disk the pass touched. Descriptor write
/// failures are downgraded to warnings so one bad disk does not affect
/// the others.
fn finalize(registry: DiskRegistry, cids: &mut dyn CidGenerator) -> ConvertReport {
    let mut report = ConvertReport::default();
    for stream in registry.into_streams() {
        let size_bytes = match stream.file_len() {
            Ok(len) => len,
            Err(err) => {
                warn!(disk = stream.index(), error = %err, "cannot stat raw image");
                continue;
            }
        };
        let descriptor_path = match write_descriptor(stream.path(), size_bytes, cids) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(disk = stream.index(), error = %err, "failed to write descriptor");
                None
            }
        };
        report.disks.push(DiskReport {
            index: stream.index(),
            raw_path: stream.path().to_path_buf(),
            descriptor_path,
            size_bytes,
        });
    }
    report
}
