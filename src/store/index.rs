//! Index store: one 8-byte bucket head per bucket

use std::path::Path;

use crate::error::Result;
use crate::mmap::MappedRegion;

/// File name of the index store inside a table directory
pub const INDEX_FILE: &str = "index.linkv";

/// Bytes per bucket slot
pub(crate) const SLOT_SIZE: u64 = 8;

/// Array of bucket-head addresses. Chunk sizes are multiples of 8, so a slot
/// never straddles two chunks.
pub(crate) struct IndexStore {
    region: MappedRegion,
}

impl IndexStore {
    pub fn open(dir: &Path, len: u64, chunk_size: u64) -> Result<Self> {
        let region = MappedRegion::open(&dir.join(INDEX_FILE), len, chunk_size)?;
        Ok(Self { region })
    }

    /// Address of the first record in `bucket`, 0 if empty
    #[inline]
    pub fn get_address(&self, bucket: u64) -> Result<u64> {
        self.region.get_u64(bucket * SLOT_SIZE)
    }

    #[inline]
    pub fn put_address(&self, bucket: u64, address: u64) -> Result<()> {
        self.region.put_u64(bucket * SLOT_SIZE, address)
    }

    /// Number of bucket slots currently mapped
    pub fn slot_count(&self) -> u64 {
        self.region.size() / SLOT_SIZE
    }

    pub fn size(&self) -> u64 {
        self.region.size()
    }

    /// Grow (by doubling) until `buckets` slots are addressable
    pub fn reserve_buckets(&self, buckets: u64) -> Result<()> {
        self.region.ensure_capacity(buckets * SLOT_SIZE)?;
        Ok(())
    }

    pub fn clear(&self) {
        self.region.clear();
    }

    pub fn flush(&self) -> Result<()> {
        self.region.flush()
    }
}
