//! SHA-1 verification of written blocks.
//!
//! A checksum record names the block it covers and normally arrives right
//! after that block's payload, so the block's bytes are still sitting in
//! the disk stream's one-slot cache. When they are not (the record was
//! reordered, or a previous checksum already consumed the slot) the bytes
//! are re-read from the backing file. The slot is cleared after every
//! record, whatever the outcome, so a stale hit is impossible.

use sha1::{Digest, Sha1};
use tracing::warn;

use crate::disk::DiskStream;
use crate::error::{Error, Result};

/// Length in bytes of a decoded block digest.
pub const DIGEST_LEN: usize = 20;

/// Verify a checksum record against the block it covers.
///
/// Non-fatal conditions (unparsable hex text, a failed re-read, a mismatch
/// without `strict`) are logged and verification moves on. A mismatch with
/// `strict` set returns an error naming disk, block, byte offset, and both
/// digests.
pub fn verify_block(
    stream: &mut DiskStream,
    block: u64,
    hex_text: &[u8],
    strict: bool,
) -> Result<()> {
    // Consuming the slot doubles as the unconditional invalidation: no
    // path below leaves cached bytes behind.
    let cached = stream.take_cache();

    let Some(expected) = decode_digest(hex_text) else {
        warn!(
            disk = stream.index(),
            block, "unresolved checksum text, skipping verification"
        );
        return Ok(());
    };

    let data = match cached {
        Some((cached_block, data)) if cached_block == block => data,
        _ => match stream.reread_block(block) {
            Ok(data) => data,
            Err(err) => {
                warn!(
                    disk = stream.index(),
                    block,
                    error = %err,
                    "cannot re-read block for verification, skipping"
                );
                return Ok(());
            }
        },
    };

    let actual = Sha1::digest(&data);
    if actual.as_slice() != expected {
        let offset = block * stream.block_size();
        let message = format!(
            "checksum mismatch for disk {} block {block} (offset 0x{offset:x}): expected {}, got {}",
            stream.index(),
            hex::encode(expected),
            hex::encode(actual),
        );
        if strict {
            return Err(Error::checksum(message));
        }
        warn!("{message}");
    }
    Ok(())
}

/// Decode a 20-byte digest from hex text, tolerating surrounding ASCII
/// whitespace. Returns `None` for anything that is not exactly 40 hex
/// digits.
fn decode_digest(text: &[u8]) -> Option<[u8; DIGEST_LEN]> {
    let text = std::str::from_utf8(text).ok()?;
    let bytes = hex::decode(text.trim()).ok()?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskRegistry;
    use tempfile::TempDir;

    fn digest_hex(data: &[u8]) -> String {
        hex::encode(Sha1::digest(data))
    }

    #[test]
    fn test_decode_digest() {
        let hex40 = "aa".repeat(20);
        assert_eq!(decode_digest(hex40.as_bytes()), Some([0xaa; 20]));
        assert_eq!(
            decode_digest(format!("{hex40}\n").as_bytes()),
            Some([0xaa; 20])
        );
        assert_eq!(decode_digest(b"zz"), None);
        assert_eq!(decode_digest(b"aabb"), None);
        assert_eq!(decode_digest(&[0xff, 0xfe]), None);
    }

    #[test]
    fn test_matching_digest_from_cache() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        let payload = vec![0x42u8; 64];
        stream.write_block(0, 64, &mut payload.as_slice()).unwrap();
        verify_block(stream, 0, digest_hex(&payload).as_bytes(), true).unwrap();
        // The slot is consumed by verification.
        assert!(stream.take_cache().is_none());
    }

    #[test]
    fn test_matching_digest_from_file() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        let payload = vec![0x42u8; 64];
        stream.write_block(0, 64, &mut payload.as_slice()).unwrap();
        stream.take_cache();
        verify_block(stream, 0, digest_hex(&payload).as_bytes(), true).unwrap();
    }

    #[test]
    fn test_mismatch_without_strict_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        stream
            .write_block(0, 64, &mut vec![1u8; 64].as_slice())
            .unwrap();
        let wrong = "00".repeat(20);
        verify_block(stream, 0, wrong.as_bytes(), false).unwrap();
    }

    #[test]
    fn test_mismatch_with_strict_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        stream
            .write_block(2, 64, &mut vec![1u8; 64].as_slice())
            .unwrap();
        let wrong = "00".repeat(20);
        let err = verify_block(stream, 2, wrong.as_bytes(), true).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("disk 0"));
        assert!(msg.contains("block 2"));
        assert!(msg.contains("0x80"));
        assert!(msg.contains(&wrong));
    }

    #[test]
    fn test_bad_hex_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        stream
            .write_block(0, 64, &mut vec![1u8; 64].as_slice())
            .unwrap();
        verify_block(stream, 0, b"not hex at all", true).unwrap();
        // Decode failure still invalidates the slot.
        assert!(stream.take_cache().is_none());
    }

    #[test]
    fn test_stale_cache_not_reused() {
        let dir = TempDir::new().unwrap();
        let mut registry = DiskRegistry::new(dir.path(), "vm");
        let stream = registry.stream(0).unwrap();

        let payload = vec![0x55u8; 64];
        stream.write_block(1, 64, &mut payload.as_slice()).unwrap();
        // Cache holds block 1; a record for block 0 must hit the file.
        verify_block(stream, 0, digest_hex(&[0u8; 64]).as_bytes(), true).unwrap();
        // And a second record for block 1 must also hit the file.
        verify_block(stream, 1, digest_hex(&payload).as_bytes(), true).unwrap();
    }
}
