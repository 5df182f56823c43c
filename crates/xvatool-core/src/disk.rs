//! Sparse raw disk image reconstruction.
//!
//! Each disk referenced by the archive is rebuilt into a growable sparse
//! file. Blocks arrive in archive order and are written at their computed
//! byte offset; regions no block ever covers are left as file holes and
//! read back as zero.

use std::collections::{btree_map, BTreeMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

/// One disk being reconstructed from the archive stream.
pub struct DiskStream {
    index: u32,
    path: PathBuf,
    file: File,
    len: u64,
    /// Size of the most recently written block. Checksum records carry no
    /// size of their own, so verification offset math reuses this value.
    /// An archive mixing block sizes within one disk would make re-read
    /// offsets for earlier blocks wrong; observed exports use a single
    /// size per disk.
    block_size: u64,
    /// Most recently written block, so the checksum record that follows it
    /// can verify without re-reading the file. Valid only until the next
    /// write or checksum record for this disk.
    cache: Option<(u64, Vec<u8>)>,
}

impl DiskStream {
    fn create(out_dir: &Path, base_name: &str, index: u32) -> Result<Self> {
        let path = out_dir.join(format!("{base_name}-disk-{index}.raw"));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::io(e, &path))?;
        Ok(Self {
            index,
            path,
            file,
            len: 0,
            block_size: 0,
            cache: None,
        })
    }

    /// The disk index this stream reconstructs.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Path of the backing raw image.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block size last observed for this disk.
    #[inline]
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Current length of the backing file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        let metadata = self.file.metadata().map_err(|e| Error::io(e, &self.path))?;
        Ok(metadata.len())
    }

    /// Write one block payload at `block * size`.
    ///
    /// Reads exactly `size` bytes from `reader`; a short read means the
    /// archive is truncated and is fatal. The backing file is grown with
    /// [`File::set_len`] when the block lands past the current end, so the
    /// gap stays sparse.
    pub fn write_block(&mut self, block: u64, size: u64, reader: &mut dyn Read) -> Result<()> {
        self.block_size = size;
        let offset = block * size;

        let end = offset + size;
        if end > self.len {
            self.file.set_len(end).map_err(|e| Error::io(e, &self.path))?;
            self.len = end;
        }

        let mut data = vec![0u8; size as usize];
        reader.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::archive(format!(
                    "short read for disk {} block {block}: archive truncated",
                    self.index
                ))
            } else {
                Error::io_simple(e)
            }
        })?;

        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(&data))
            .map_err(|e| Error::io(e, &self.path))?;

        self.cache = Some((block, data));
        Ok(())
    }

    /// Take the cache slot, leaving it empty.
    pub fn take_cache(&mut self) -> Option<(u64, Vec<u8>)> {
        self.cache.take()
    }

    /// Re-read a block's bytes from the backing file, using the last
    /// observed block size for both offset and length.
    pub fn reread_block(&mut self, block: u64) -> Result<Vec<u8>> {
        let offset = block * self.block_size;
        let mut data = vec![0u8; self.block_size as usize];
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut data))
            .map_err(|e| Error::io(e, &self.path))?;
        Ok(data)
    }
}

/// Registry of every disk seen during one archive pass, keyed by disk
/// index. Streams are created lazily on first reference and live until
/// descriptor finalization.
pub struct DiskRegistry {
    out_dir: PathBuf,
    base_name: String,
    disks: BTreeMap<u32, DiskStream>,
}

impl DiskRegistry {
    /// Create an empty registry writing images into `out_dir`, named after
    /// `base_name`.
    pub fn new(out_dir: &Path, base_name: &str) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            base_name: base_name.to_string(),
            disks: BTreeMap::new(),
        }
    }

    /// Look up the stream for `index`, creating its backing file on first
    /// reference.
    pub fn stream(&mut self, index: u32) -> Result<&mut DiskStream> {
        match self.disks.entry(index) {
            btree_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            btree_map::Entry::Vacant(entry) => {
                info!("writing disk Ref:{index}");
                let stream = DiskStream::create(&self.out_dir, &self.base_name, index)?;
                Ok(entry.insert(stream))
            }
        }
    }

    /// Number of disks referenced so far.
    pub fn len(&self) -> usize {
        self.disks.len()
    }

    /// True if no disk has been referenced.
    pub fn is_empty(&self) -> bool {
        self.disks.is_empty()
    }

    /// Consume the registry, yielding streams in ascending disk order.
    pub fn into_streams(self) -> impl Iterator<Item = DiskStream> {
        self.disks.into_values()
    }
}
