//! Core trait defining the interface for raw image sources.
//!
//! Follows the Ports & Adapters pattern: the domain logic in this crate
//! never touches a file descriptor directly, only this trait. Concrete
//! adapters (`DiskReader`, `MmapReader`) live in `ntfs_io`.

use crate::Result;

/// A source of raw block data: a disk, a disk image file, or any other
/// random-access byte source.
///
/// This trait abstracts away the underlying storage medium, allowing the
/// same scanning/reconstruction logic to work on physical disks, disk
/// images, or any other block-based data source.
pub trait BlockSource {
    /// Reads a chunk of data from the source at the specified byte offset.
    ///
    /// Returns the number of bytes actually read, which may be less than
    /// `buffer.len()` if the end of the source is reached. A short read is
    /// never an error by itself; callers zero-pad via [`read_sectors`].
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize>;

    /// Returns the total size of the source in bytes.
    fn size(&self) -> u64;
}

impl BlockSource for Box<dyn BlockSource> {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        (**self).read_chunk(offset, buffer)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

/// Reads `count` sectors of `sector_size` bytes starting at sector `offset`,
/// zero-padding any short or failed read.
///
/// Grounded on `utils.py::sectors`. Unlike the Python original this never
/// returns `None`: a failed seek/read degrades to a warning plus a
/// zero-filled buffer, matching spec.md §7's "I/O short read" policy
/// ("zero-padded; a warning is logged with offset and size").
pub fn read_sectors(
    image: &mut dyn BlockSource,
    sector_offset: u64,
    count: u64,
    sector_size: u64,
) -> Vec<u8> {
    let want = (count * sector_size) as usize;
    let mut buf = vec![0u8; want];
    let byte_offset = sector_offset * sector_size;
    match image.read_chunk(byte_offset, &mut buf) {
        Ok(n) if n < want => {
            tracing::warn!(
                offset = byte_offset,
                size = want,
                read = n,
                "short read, padding with zeros"
            );
        }
        Err(e) => {
            tracing::warn!(
                offset = byte_offset,
                size = want,
                error = %e,
                "failed to read sector(s), filling with zeros"
            );
            buf.fill(0);
        }
        _ => {}
    }
    buf
}
