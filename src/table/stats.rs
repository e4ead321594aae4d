//! Table statistics snapshot

/// Point-in-time view of a table's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Live records
    pub size: u64,
    /// Buckets before the current pass doubles them
    pub table_length: u64,
    /// Stripes already split in the current pass
    pub rehash_index: u32,
    /// Completed rehash passes since open
    pub rehash_passes: u64,
    /// Stripes split since open
    pub stripes_rehashed: u64,
    /// Next free offset in the data store
    pub data_write_pos: u64,
    /// Mapped index store length
    pub index_bytes: u64,
    /// Mapped data store length
    pub data_bytes: u64,
}

impl TableStats {
    /// `size / effective capacity`, the figure compared against the rehash threshold
    pub fn load(&self) -> f64 {
        let per_stripe = self.table_length / crate::sync::STRIPES as u64;
        self.size as f64 / (self.table_length + per_stripe * self.rehash_index as u64) as f64
    }
}
