//! VMDK descriptor synthesis.
//!
//! Each reconstructed raw image gets a small text descriptor next to it,
//! declaring a single monolithic-flat read-write extent. The descriptor
//! format is consumed by virtualization tooling and must match the
//! expected layout byte-for-byte.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Bytes per descriptor sector.
pub const SECTOR_SIZE: u64 = 512;

/// Source of descriptor content identifiers.
///
/// Nothing downstream relies on global uniqueness, only on each descriptor
/// referencing its own extent consistently, so collisions across runs are
/// acceptable. Injecting the generator keeps descriptor output
/// deterministic under test.
pub trait CidGenerator {
    /// Produce the next 32-bit content identifier.
    fn next_cid(&mut self) -> u32;
}

/// Pseudo-random content identifiers backed by [`StdRng`].
pub struct RandomCid(StdRng);

impl RandomCid {
    /// Generator seeded from the operating system.
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Generator with a fixed seed, for reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomCid {
    fn default() -> Self {
        Self::new()
    }
}

impl CidGenerator for RandomCid {
    fn next_cid(&mut self) -> u32 {
        self.0.gen_range(0..u32::MAX)
    }
}

/// Render the descriptor text for a raw extent.
///
/// The sector count truncates: a trailing partial sector of the extent is
/// not represented.
pub fn render_descriptor(cid: u32, extent_len: u64, extent_name: &str) -> String {
    format!(
        "# Disk DescriptorFile\n\
         version=1\n\
         CID={cid:08x}\n\
         parentCID=ffffffff\n\
         createType=\"monolithicFlat\"\n\
         \n\
         # Extent description\n\
         RW {} FLAT \"{extent_name}\" 0\n",
        extent_len / SECTOR_SIZE,
    )
}

/// Write the descriptor that pairs with a raw extent file.
///
/// The descriptor lands next to the extent with the extension replaced by
/// `.vmdk`, and references the extent by base name so the pair stays valid
/// when the directory moves. Returns the descriptor's path.
pub fn write_descriptor(
    extent_path: &Path,
    extent_len: u64,
    cids: &mut dyn CidGenerator,
) -> Result<PathBuf> {
    let extent_name = extent_path
        .file_name()
        .ok_or_else(|| {
            Error::descriptor(format!(
                "extent path has no file name: {}",
                extent_path.display()
            ))
        })?
        .to_string_lossy()
        .into_owned();

    let descriptor_path = extent_path.with_extension("vmdk");
    let content = render_descriptor(cids.next_cid(), extent_len, &extent_name);

    let mut file = File::create(&descriptor_path).map_err(|e| Error::io(e, &descriptor_path))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::io(e, &descriptor_path))?;
    Ok(descriptor_path)
}
