//! Chunked mapped region
//!
//! Chunks are only ever appended, never remapped, so memory behind an
//! existing chunk stays valid for the lifetime of the region. The chunk list
//! itself sits behind a `RwLock`: accessors hold the read side for the length
//! of one copy, growth and clear hold the write side.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::ptr;

use memmap2::{MmapOptions, MmapRaw};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{LinkvError, Result};

const PAGE_SIZE: u64 = 4096;

/// Resolve an absolute position to (chunk index, offset inside chunk)
#[inline]
pub(crate) fn locate(pos: u64, chunk_size: u64) -> (usize, usize) {
    ((pos / chunk_size) as usize, (pos % chunk_size) as usize)
}

/// Requested length rounded to a page, then to a power of two, never below one chunk
fn initial_length(requested: u64, chunk_size: u64) -> u64 {
    let paged = (requested + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
    paged.next_power_of_two().max(chunk_size)
}

/// A growable byte region over a file, mapped in `chunk_size` pieces.
///
/// Overlapping concurrent writes are excluded by the callers' locks (stripe
/// locks for chains, the allocation cursor for fresh records); the region
/// only guarantees that every chunk it hands out stays mapped.
pub(crate) struct MappedRegion {
    path: PathBuf,
    file: File,
    chunk_size: u64,
    chunks: RwLock<Vec<MmapRaw>>,
}

impl MappedRegion {
    /// Open or create the file at `path` and map it.
    ///
    /// An existing file keeps its length (rounded up to whole chunks) unless
    /// `requested` asks for more.
    pub fn open(path: &Path, requested: u64, chunk_size: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let existing = file.metadata()?.len().div_ceil(chunk_size) * chunk_size;
        let size = initial_length(requested, chunk_size).max(existing);
        if file.metadata()?.len() < size {
            file.set_len(size)?;
        }

        let count = size / chunk_size;
        let mut chunks = Vec::with_capacity(count as usize);
        for index in 0..count {
            chunks.push(map_chunk(&file, index, chunk_size)?);
        }

        debug!(path = %path.display(), size, chunks = count, "mapped region");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            chunk_size,
            chunks: RwLock::new(chunks),
        })
    }

    /// Total mapped length in bytes
    pub fn size(&self) -> u64 {
        self.chunks.read().len() as u64 * self.chunk_size
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn get_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.get_bytes(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn put_u64(&self, pos: u64, value: u64) -> Result<()> {
        self.put_bytes(pos, &value.to_le_bytes())
    }

    pub fn get_i32(&self, pos: u64) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.get_bytes(pos, &mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn put_i32(&self, pos: u64, value: i32) -> Result<()> {
        self.put_bytes(pos, &value.to_le_bytes())
    }

    /// Fill `buf` from `[pos, pos + buf.len())`, crossing chunks as needed
    pub fn get_bytes(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let chunks = self.chunks.read();
        self.check_bounds(chunks.len(), pos, buf.len() as u64)?;

        let mut done = 0usize;
        while done < buf.len() {
            let (index, offset) = locate(pos + done as u64, self.chunk_size);
            let n = (buf.len() - done).min(self.chunk_size as usize - offset);
            // SAFETY: the range was bounds-checked against the mapped length and
            // `offset + n <= chunk_size`; the chunk cannot be unmapped while the
            // read guard is held.
            unsafe {
                ptr::copy_nonoverlapping(
                    chunks[index].as_ptr().add(offset),
                    buf[done..].as_mut_ptr(),
                    n,
                );
            }
            done += n;
        }
        Ok(())
    }

    /// Write `data` at `[pos, pos + data.len())`, crossing chunks as needed
    pub fn put_bytes(&self, pos: u64, data: &[u8]) -> Result<()> {
        let chunks = self.chunks.read();
        self.check_bounds(chunks.len(), pos, data.len() as u64)?;

        let mut done = 0usize;
        while done < data.len() {
            let (index, offset) = locate(pos + done as u64, self.chunk_size);
            let n = (data.len() - done).min(self.chunk_size as usize - offset);
            // SAFETY: same bounds argument as `get_bytes`; MmapRaw is mapped
            // read-write and callers serialize writers of overlapping ranges.
            unsafe {
                ptr::copy_nonoverlapping(
                    data[done..].as_ptr(),
                    chunks[index].as_mut_ptr().add(offset),
                    n,
                );
            }
            done += n;
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Double the region by extending the file and mapping new chunks.
    /// Returns the new size.
    pub fn double_grow(&self) -> Result<u64> {
        let mut chunks = self.chunks.write();
        let old_size = chunks.len() as u64 * self.chunk_size;
        let new_size = old_size * 2;

        self.file.set_len(new_size)?;
        for index in chunks.len() as u64..new_size / self.chunk_size {
            chunks.push(map_chunk(&self.file, index, self.chunk_size)?);
        }

        debug!(path = %self.path.display(), old_size, new_size, "region doubled");
        Ok(new_size)
    }

    /// Double until the region holds at least `min_size` bytes
    pub fn ensure_capacity(&self, min_size: u64) -> Result<u64> {
        let mut size = self.size();
        while size < min_size {
            size = self.double_grow()?;
        }
        Ok(size)
    }

    /// Zero every chunk. The file keeps its length.
    pub fn clear(&self) {
        let chunks = self.chunks.write();
        for chunk in chunks.iter() {
            // SAFETY: the write guard excludes every accessor of this region and
            // the pointer covers exactly `chunk.len()` mapped bytes.
            unsafe { ptr::write_bytes(chunk.as_mut_ptr(), 0, chunk.len()) };
        }
    }

    /// Flush every chunk to the backing file
    pub fn flush(&self) -> Result<()> {
        for chunk in self.chunks.read().iter() {
            chunk.flush()?;
        }
        Ok(())
    }

    fn check_bounds(&self, chunk_count: usize, pos: u64, len: u64) -> Result<()> {
        let size = chunk_count as u64 * self.chunk_size;
        match pos.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(LinkvError::OutOfBounds { pos, len, size }),
        }
    }
}

fn map_chunk(file: &File, index: u64, chunk_size: u64) -> Result<MmapRaw> {
    let chunk = MmapOptions::new()
        .offset(index * chunk_size)
        .len(chunk_size as usize)
        .map_raw(file)?;
    Ok(chunk)
}
