//! XVA archive entry classification.
//!
//! An XVA export is a tar archive. Disk content lives in entries named
//! `Ref:<disk>/<block>` (raw block payload) and `Ref:<disk>/<block>.checksum`
//! (hex-encoded SHA-1 of the preceding block), where `<block>` is an
//! 8-decimal-digit block index. Everything else in the archive (`ova.xml`
//! and friends) is metadata with no bearing on disk reconstruction.

use crate::error::{Error, Result};

/// Prefix marking tar entries that carry disk content.
pub const BLOCK_REF_PREFIX: &str = "Ref:";

/// Suffix marking entries that carry a block digest instead of block data.
pub const CHECKSUM_SUFFIX: &str = ".checksum";

/// Width of the decimal block-index field in entry names.
pub const BLOCK_INDEX_DIGITS: usize = 8;

/// Maximum number of bytes read from a checksum entry.
pub const MAX_CHECKSUM_TEXT: u64 = 1024;

/// Classification of a single archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Block payload for `disk`, to be written at `block * size`.
    Block { disk: u32, block: u64 },
    /// Hex-encoded SHA-1 digest covering the named block.
    Checksum { disk: u32, block: u64 },
}

/// Classify an archive entry by name.
///
/// Returns `Ok(None)` for entries that carry no disk content and should be
/// skipped: names without the `Ref:` prefix, and `Ref:` names missing the
/// `/` separator.
///
/// # Errors
///
/// Returns an error for names that match the block-reference layout but are
/// malformed (unparsable disk index, block-index field that is not exactly
/// 8 digits). The archive is assumed well-formed apart from content-level
/// corruption, so these abort the run.
pub fn classify_entry(name: &str) -> Result<Option<EntryClass>> {
    let Some(referenced) = name.strip_prefix(BLOCK_REF_PREFIX) else {
        return Ok(None);
    };
    let Some((disk_field, rest)) = referenced.split_once('/') else {
        return Ok(None);
    };

    let disk = disk_field
        .parse::<u32>()
        .map_err(|_| Error::archive(format!("invalid disk index in entry name: {name:?}")))?;

    let block_field = match rest.find('.') {
        Some(dot) => &rest[..dot],
        None => rest,
    };
    if block_field.len() != BLOCK_INDEX_DIGITS {
        return Err(Error::archive(format!("malformed block name: {rest:?}")));
    }
    let block = block_field
        .parse::<u64>()
        .map_err(|_| Error::archive(format!("malformed block name: {rest:?}")))?;

    if rest.ends_with(CHECKSUM_SUFFIX) {
        Ok(Some(EntryClass::Checksum { disk, block }))
    } else {
        Ok(Some(EntryClass::Block { disk, block }))
    }
}
