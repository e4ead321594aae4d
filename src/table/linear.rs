//! Linear hash table over one index/data store pair

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::StoreGeometry;
use crate::error::{LinkvError, Result};
use crate::hash::hash_bytes;
use crate::store::{DataStore, Header, IndexStore, HEADER_SIZE};
use crate::sync::{StripedLock, STRIPES};

use super::chain::Walk;
use super::{Iter, TableStats};

/// Load above which a put first rehashes
pub const LOAD_FACTOR: f64 = 0.75;

/// Fields that change only during structural transitions
#[derive(Debug, Clone, Copy)]
pub(super) struct TableState {
    pub table_length: u64,
    pub rehash_index: u32,
}

impl TableState {
    /// Bucket index for `hash`, honoring stripes already split this pass
    #[inline]
    pub fn bucket_for(&self, hash: u64) -> u64 {
        if (StripedLock::stripe_for(hash) as u32) < self.rehash_index {
            hash & (2 * self.table_length - 1)
        } else {
            hash & (self.table_length - 1)
        }
    }

    /// Number of bucket slots that may hold chains right now
    #[inline]
    pub fn logical_length(&self) -> u64 {
        if self.rehash_index == 0 {
            self.table_length
        } else {
            2 * self.table_length
        }
    }

    /// Buckets effectively available: every split stripe adds its share
    #[inline]
    fn capacity(&self) -> f64 {
        self.table_length as f64
            + (self.table_length / STRIPES as u64) as f64 * self.rehash_index as f64
    }
}

/// A file-backed linear hash table.
///
/// ## Concurrency
/// - Key operations lock the stripe `hash & 255` (read for `get`, write for mutations)
/// - `state` (table length, rehash progress) is read briefly for routing and
///   written for growth, stripe cutover and clear
/// - `data_write_pos` advances by CAS under the state read lock
/// - One rehasher at a time; other writers skip rehashing while it runs
pub struct LinearHashTable {
    pub(super) dir: PathBuf,
    pub(super) index: IndexStore,
    pub(super) data: DataStore,
    pub(super) state: RwLock<TableState>,
    pub(super) stripes: StripedLock,
    pub(super) size: AtomicU64,
    data_write_pos: AtomicU64,
    rehash_lock: Mutex<()>,
    rehash_passes: AtomicU64,
    stripes_rehashed: AtomicU64,
    closed: bool,
}

impl LinearHashTable {
    /// Open or create a table in `dir`.
    ///
    /// A checkpointed header restores size, table length, write cursor and
    /// rehash progress exactly; a zero header derives them from the index size.
    pub fn open(dir: impl AsRef<Path>, geometry: StoreGeometry) -> Result<Self> {
        geometry.validate()?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let index = IndexStore::open(&dir, geometry.index_file_length, geometry.chunk_size)?;
        let data = DataStore::open(&dir, geometry.data_file_length, geometry.chunk_size)?;

        let header = data.read_header()?;
        let table_length = if header.table_length == 0 {
            index.slot_count()
        } else {
            header.table_length
        };
        let data_write_pos = if header.data_write_pos == 0 {
            HEADER_SIZE
        } else {
            header.data_write_pos
        };

        if !table_length.is_power_of_two() || table_length < STRIPES as u64 {
            return Err(LinkvError::CorruptHeader(format!(
                "table length {} is not a power of two >= {}",
                table_length, STRIPES
            )));
        }
        if header.rehash_index as usize >= STRIPES {
            return Err(LinkvError::CorruptHeader(format!(
                "rehash index {} out of range",
                header.rehash_index
            )));
        }
        if data_write_pos < HEADER_SIZE || data_write_pos > data.size() {
            return Err(LinkvError::CorruptHeader(format!(
                "data write position {} outside [{}, {}]",
                data_write_pos,
                HEADER_SIZE,
                data.size()
            )));
        }

        let state = TableState {
            table_length,
            rehash_index: header.rehash_index,
        };
        index.reserve_buckets(state.logical_length())?;

        info!(
            dir = %dir.display(),
            size = header.size,
            table_length,
            rehash_index = header.rehash_index,
            "table opened"
        );

        Ok(Self {
            dir,
            index,
            data,
            state: RwLock::new(state),
            stripes: StripedLock::new(),
            size: AtomicU64::new(header.size),
            data_write_pos: AtomicU64::new(data_write_pos),
            rehash_lock: Mutex::new(()),
            rehash_passes: AtomicU64::new(0),
            stripes_rehashed: AtomicU64::new(0),
            closed: false,
        })
    }

    // =========================================================================
    // Key Operations
    // =========================================================================

    /// Get the value stored under `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with_hash(key, hash_bytes(key))
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Insert or overwrite; returns the previous value
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.put_with_hash(key, value, hash_bytes(key))
    }

    /// Insert only if `key` is missing; otherwise return the current value untouched
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.put_if_absent_with_hash(key, value, hash_bytes(key))
    }

    /// Unlink `key`; returns the removed value
    pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.remove_with_hash(key, hash_bytes(key))
    }

    /// Unlink `key` only if it currently maps to exactly `value`
    pub fn remove_value(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        self.remove_value_with_hash(key, value, hash_bytes(key))
    }

    /// Overwrite an existing key; returns the previous value, `None` if absent
    pub fn replace(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.replace_with_hash(key, value, hash_bytes(key))
    }

    /// Overwrite `key` only if it currently maps to exactly `old`
    pub fn replace_value(&self, key: &[u8], old: &[u8], new: &[u8]) -> Result<bool> {
        self.replace_value_with_hash(key, old, new, hash_bytes(key))
    }

    pub(crate) fn get_with_hash(&self, key: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _stripe = self.stripes.read(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { record, .. } => Ok(record.value),
            Walk::Missing(_) => Ok(None),
        }
    }

    pub(crate) fn put_with_hash(&self, key: &[u8], value: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        self.rehash_if_needed()?;

        // allocation stays under the stripe lock; clear rewinds the cursor
        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { link, record } => {
                let pos = self.allocate_record(key, value)?;
                self.supersede(link, &record, pos, value)?;
                Ok(record.value)
            }
            Walk::Missing(link) => {
                let pos = self.allocate_record(key, value)?;
                self.insert_at(link, pos, key, value)?;
                Ok(None)
            }
        }
    }

    pub(crate) fn put_if_absent_with_hash(
        &self,
        key: &[u8],
        value: &[u8],
        hash: u64,
    ) -> Result<Option<Vec<u8>>> {
        self.rehash_if_needed()?;

        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { record, .. } => Ok(record.value),
            Walk::Missing(link) => {
                let pos = self.allocate_record(key, value)?;
                self.insert_at(link, pos, key, value)?;
                Ok(None)
            }
        }
    }

    pub(crate) fn remove_with_hash(&self, key: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { link, record } => {
                self.relink(link, record.next)?;
                self.size.fetch_sub(1, Ordering::AcqRel);
                Ok(record.value)
            }
            Walk::Missing(_) => Ok(None),
        }
    }

    pub(crate) fn remove_value_with_hash(&self, key: &[u8], value: &[u8], hash: u64) -> Result<bool> {
        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { link, record } if record.key_value_equals(key, value) => {
                self.relink(link, record.next)?;
                self.size.fetch_sub(1, Ordering::AcqRel);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn replace_with_hash(&self, key: &[u8], value: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { link, record } => {
                let pos = self.allocate_record(key, value)?;
                self.supersede(link, &record, pos, value)?;
                Ok(record.value)
            }
            Walk::Missing(_) => Ok(None),
        }
    }

    pub(crate) fn replace_value_with_hash(
        &self,
        key: &[u8],
        old: &[u8],
        new: &[u8],
        hash: u64,
    ) -> Result<bool> {
        let _stripe = self.stripes.write(StripedLock::stripe_for(hash));
        let bucket = self.bucket_for(hash);
        match self.walk(bucket, |r| r.key_equals(key))? {
            Walk::Found { link, record } if record.key_value_equals(key, old) => {
                let pos = self.allocate_record(key, new)?;
                self.supersede(link, &record, pos, new)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // =========================================================================
    // Sizing
    // =========================================================================

    /// Number of live records
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `size / effective capacity`
    pub fn load(&self) -> f64 {
        let state = self.state.read();
        self.size() as f64 / state.capacity()
    }

    pub fn stats(&self) -> TableStats {
        let state = *self.state.read();
        TableStats {
            size: self.size(),
            table_length: state.table_length,
            rehash_index: state.rehash_index,
            rehash_passes: self.rehash_passes.load(Ordering::Relaxed),
            stripes_rehashed: self.stripes_rehashed.load(Ordering::Relaxed),
            data_write_pos: self.data_write_pos.load(Ordering::Acquire),
            index_bytes: self.index.size(),
            data_bytes: self.data.size(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weakly consistent iterator over every live entry
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    #[inline]
    pub(super) fn bucket_for(&self, hash: u64) -> u64 {
        self.state.read().bucket_for(hash)
    }

    // =========================================================================
    // Rehashing
    // =========================================================================

    fn rehash_if_needed(&self) -> Result<()> {
        if self.load() > LOAD_FACTOR {
            self.rehash()?;
        }
        Ok(())
    }

    /// Split stripes until the load is back under the threshold.
    ///
    /// Each stripe is split while holding its write lock, and `rehash_index`
    /// advances before that lock is released, so no reader ever routes into
    /// a half-split bucket.
    fn rehash(&self) -> Result<()> {
        let Some(_pass) = self.rehash_lock.try_lock() else {
            return Ok(());
        };
        let started = Instant::now();

        while self.load() > LOAD_FACTOR {
            let claimed = *self.state.read();
            if claimed.rehash_index == 0 {
                let _state = self.state.write();
                self.index.reserve_buckets(2 * claimed.table_length)?;
            }

            let stripe = claimed.rehash_index as usize;
            let _stripe = self.stripes.write(stripe);

            let current = *self.state.read();
            if current.rehash_index != claimed.rehash_index
                || current.table_length != claimed.table_length
            {
                // cleared underneath us
                continue;
            }

            let table_length = current.table_length;
            for bucket in (stripe as u64..table_length).step_by(STRIPES) {
                self.split_bucket(bucket, table_length)?;
            }
            self.stripes_rehashed.fetch_add(1, Ordering::Relaxed);

            let mut state = self.state.write();
            state.rehash_index += 1;
            if state.rehash_index as usize == STRIPES {
                state.rehash_index = 0;
                state.table_length *= 2;
                let passes = self.rehash_passes.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    dir = %self.dir.display(),
                    table_length = state.table_length,
                    passes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rehash pass complete"
                );
            }
        }
        Ok(())
    }

    /// Split `bucket` into itself and `bucket + table_length`
    fn split_bucket(&self, bucket: u64, table_length: u64) -> Result<()> {
        let mirror = bucket + table_length;
        let mask = 2 * table_length - 1;

        let mut keep = Vec::new();
        let mut moved = Vec::new();
        let mut pos = self.index.get_address(bucket)?;
        let mut steps = 0u64;

        while pos != 0 {
            steps += 1;
            self.check_chain_len(steps, pos)?;

            let record = self.data.read_record(pos)?;
            let hash = hash_bytes(&record.key);
            let new_idx = hash & mask;
            if new_idx == bucket {
                keep.push(record.pos);
            } else if new_idx == mirror {
                moved.push(record.pos);
            } else {
                return Err(LinkvError::RehashInvariant {
                    hash,
                    idx: bucket,
                    new_idx,
                    table_length,
                });
            }
            pos = record.next;
        }

        let keep_head = self.rebuild_chain(&keep)?;
        let moved_head = self.rebuild_chain(&moved)?;
        self.index.put_address(bucket, keep_head)?;
        self.index.put_address(mirror, moved_head)
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    fn allocate_record(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.allocate(DataStore::record_len(key, Some(value))?)
    }

    /// Reserve `len` bytes of the data store and return their offset.
    ///
    /// The fast path is a CAS on the write cursor under the state read lock;
    /// only when the cursor would run past the mapped size does the caller
    /// take the write lock and double the store.
    fn allocate(&self, len: u64) -> Result<u64> {
        loop {
            {
                let _state = self.state.read();
                let capacity = self.data.size();
                let mut current = self.data_write_pos.load(Ordering::Acquire);
                while current + len < capacity {
                    match self.data_write_pos.compare_exchange_weak(
                        current,
                        current + len,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return Ok(current),
                        Err(actual) => current = actual,
                    }
                }
            }

            let _state = self.state.write();
            if self.data_write_pos.load(Ordering::Acquire) + len >= self.data.size() {
                self.data.double_grow()?;
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Remove every entry: zero the index, rewind the write cursor.
    /// Record bytes stay in the data file and are overwritten later.
    pub fn clear(&self) -> Result<()> {
        let _stripes = self.stripes.write_all();
        let mut state = self.state.write();

        self.index.clear();
        self.data_write_pos.store(HEADER_SIZE, Ordering::Release);
        self.size.store(0, Ordering::Release);
        state.rehash_index = 0;

        info!(dir = %self.dir.display(), "table cleared");
        Ok(())
    }

    /// Write the header checkpoint and flush both stores
    pub fn flush(&self) -> Result<()> {
        {
            let state = self.state.write();
            self.data.write_header(&Header {
                size: self.size(),
                table_length: state.table_length,
                data_write_pos: self.data_write_pos.load(Ordering::Acquire),
                rehash_index: state.rehash_index,
            })?;
        }
        self.index.flush()?;
        self.data.flush()
    }

    /// Checkpoint, flush and unmap
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        info!(dir = %self.dir.display(), size = self.size(), "table closed");
        Ok(())
    }

    /// Close, then remove the table directory
    pub fn delete(self) -> Result<()> {
        let dir = self.dir.clone();
        self.close()?;
        fs::remove_dir_all(&dir)?;
        info!(dir = %dir.display(), "table deleted");
        Ok(())
    }
}

impl Drop for LinearHashTable {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.flush() {
                warn!(dir = %self.dir.display(), error = %e, "failed to checkpoint table on drop");
            }
        }
    }
}
