//! Shard Module
//!
//! One linear hash table behind one coarse read/write lock.
//!
//! Reads share the lock; every mutation takes it exclusively. The table
//! underneath supports striped concurrency on its own, but a shard keeps
//! mutation serialized at this boundary.

use std::path::Path;

use parking_lot::RwLock;

use crate::config::StoreGeometry;
use crate::error::Result;
use crate::table::{LinearHashTable, TableStats};

/// A single partition of an [`Engine`](crate::Engine)
pub struct Shard {
    id: usize,
    table: LinearHashTable,
    lock: RwLock<()>,
}

impl Shard {
    /// Open the table stored in `dir`
    pub fn open(id: usize, dir: impl AsRef<Path>, geometry: StoreGeometry) -> Result<Self> {
        Ok(Self {
            id,
            table: LinearHashTable::open(dir, geometry)?,
            lock: RwLock::new(()),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn dir(&self) -> &Path {
        self.table.dir()
    }

    // =========================================================================
    // Reads (shared)
    // =========================================================================

    pub fn get(&self, key: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.read();
        self.table.get_with_hash(key, hash)
    }

    pub fn contains_key(&self, key: &[u8], hash: u64) -> Result<bool> {
        Ok(self.get(key, hash)?.is_some())
    }

    pub fn size(&self) -> u64 {
        let _guard = self.lock.read();
        self.table.size()
    }

    pub fn stats(&self) -> TableStats {
        let _guard = self.lock.read();
        self.table.stats()
    }

    /// Iterate this shard; the read lock is held while each bucket is collected
    pub fn iter(&self) -> ShardIter<'_> {
        ShardIter {
            shard: self,
            inner: self.table.iter(),
        }
    }

    // =========================================================================
    // Mutations (exclusive)
    // =========================================================================

    pub fn put(&self, key: &[u8], value: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.write();
        self.table.put_with_hash(key, value, hash)
    }

    pub fn put_if_absent(&self, key: &[u8], value: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.write();
        self.table.put_if_absent_with_hash(key, value, hash)
    }

    pub fn remove(&self, key: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.write();
        self.table.remove_with_hash(key, hash)
    }

    pub fn remove_value(&self, key: &[u8], value: &[u8], hash: u64) -> Result<bool> {
        let _guard = self.lock.write();
        self.table.remove_value_with_hash(key, value, hash)
    }

    pub fn replace(&self, key: &[u8], value: &[u8], hash: u64) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.write();
        self.table.replace_with_hash(key, value, hash)
    }

    pub fn replace_value(&self, key: &[u8], old: &[u8], new: &[u8], hash: u64) -> Result<bool> {
        let _guard = self.lock.write();
        self.table.replace_value_with_hash(key, old, new, hash)
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.write();
        self.table.clear()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Checkpoint the header and flush
    pub fn flush(&self) -> Result<()> {
        let _guard = self.lock.write();
        self.table.flush()
    }

    pub fn close(self) -> Result<()> {
        self.table.close()
    }

    /// Close and remove the shard directory
    pub fn delete(self) -> Result<()> {
        self.table.delete()
    }
}

/// Iterator over one shard's entries
pub struct ShardIter<'a> {
    shard: &'a Shard,
    inner: crate::table::Iter<'a>,
}

impl Iterator for ShardIter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let _guard = self.shard.lock.read();
        self.inner.next()
    }
}
