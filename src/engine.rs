//! Engine Module
//!
//! The sharded store: a fixed array of shards, each an independent linear
//! hash table in its own subdirectory.
//!
//! ## Responsibilities
//! - Route every key to exactly one shard by `hash(key) % shards`
//! - Fan out size, iteration, clear, flush, close and delete
//! - Refuse to reopen a directory with a different shard count

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::{LinkvError, Result};
use crate::hash::hash_bytes;
use crate::shard::Shard;
use crate::table::TableStats;

/// The main storage engine
///
/// ## Concurrency Model
///
/// - Shards are fully independent; operations on different shards never
///   contend
/// - Inside a shard, reads share a coarse lock and mutations hold it
///   exclusively
/// - Routing is immutable for the life of the directory
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Shards in routing order; `shards[i]` lives in `data_dir/shard_{i}`
    shards: Vec<Shard>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const SHARD_PREFIX: &'static str = "shard_";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config and create the data directory
    /// 2. Check the on-disk shard count matches
    /// 3. Open every shard's table
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let existing = Self::count_shard_dirs(&config.data_dir)?;
        if existing != 0 && existing != config.shards {
            return Err(LinkvError::Config(format!(
                "{} holds {} shards, configured for {}",
                config.data_dir.display(),
                existing,
                config.shards
            )));
        }

        let geometry = config.geometry();
        let shards = (0..config.shards)
            .map(|id| Shard::open(id, Self::shard_dir(&config.data_dir, id), geometry))
            .collect::<Result<Vec<_>>>()?;

        info!(
            data_dir = %config.data_dir.display(),
            shards = shards.len(),
            entries = shards.iter().map(Shard::size).sum::<u64>(),
            "engine opened"
        );

        Ok(Self { config, shards })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory. An existing
    /// directory keeps the shard count it was created with.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder().data_dir(path);
        let existing = Self::existing_shard_count(path)?;
        if existing != 0 {
            builder = builder.shards(existing);
        }
        Self::open(builder.build())
    }

    /// Number of shard directories already under `data_dir` (0 if it does not exist)
    pub fn existing_shard_count(data_dir: impl AsRef<Path>) -> Result<usize> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Ok(0);
        }
        Self::count_shard_dirs(data_dir)
    }

    fn shard_dir(data_dir: &Path, id: usize) -> PathBuf {
        data_dir.join(format!("{}{}", Self::SHARD_PREFIX, id))
    }

    fn count_shard_dirs(data_dir: &Path) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(data_dir)? {
            let entry = entry?;
            let is_shard = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix(Self::SHARD_PREFIX))
                .is_some_and(|id| id.parse::<usize>().is_ok());
            if is_shard && entry.file_type()?.is_dir() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Shard owning `hash`
    #[inline]
    fn route(&self, hash: u64) -> &Shard {
        &self.shards[(hash % self.shards.len() as u64) as usize]
    }

    // =========================================================================
    // Key Operations
    // =========================================================================

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash_bytes(key);
        self.route(hash).get(key, hash)
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        let hash = hash_bytes(key);
        self.route(hash).contains_key(key, hash)
    }

    /// Put a key-value pair; returns the previous value
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash_bytes(key);
        self.route(hash).put(key, value, hash)
    }

    /// Insert only if absent; returns the existing value otherwise
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash_bytes(key);
        self.route(hash).put_if_absent(key, value, hash)
    }

    /// Remove a key; returns the removed value
    pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash_bytes(key);
        self.route(hash).remove(key, hash)
    }

    /// Remove a key only if it maps to exactly `value`
    pub fn remove_value(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let hash = hash_bytes(key);
        self.route(hash).remove_value(key, value, hash)
    }

    /// Overwrite an existing key; returns the previous value
    pub fn replace(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        let hash = hash_bytes(key);
        self.route(hash).replace(key, value, hash)
    }

    /// Overwrite a key only if it maps to exactly `old`
    pub fn replace_value(&self, key: &[u8], old: &[u8], new: &[u8]) -> Result<bool> {
        let hash = hash_bytes(key);
        self.route(hash).replace_value(key, old, new, hash)
    }

    // =========================================================================
    // Fan-out
    // =========================================================================

    /// Total live entries across shards
    pub fn size(&self) -> u64 {
        self.shards.iter().map(Shard::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Iterate every shard in order. Weakly consistent, like each shard.
    pub fn iter(&self) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_ {
        self.shards.iter().flat_map(Shard::iter)
    }

    pub fn clear(&self) -> Result<()> {
        for shard in &self.shards {
            shard.clear()?;
        }
        info!(data_dir = %self.config.data_dir.display(), "engine cleared");
        Ok(())
    }

    /// Checkpoint every shard
    pub fn flush(&self) -> Result<()> {
        for shard in &self.shards {
            shard.flush()?;
        }
        Ok(())
    }

    /// Per-shard statistics, in shard order
    pub fn stats(&self) -> Vec<TableStats> {
        self.shards.iter().map(Shard::stats).collect()
    }

    /// Checkpoint and close every shard. Every shard is attempted; the first
    /// error is returned.
    pub fn close(self) -> Result<()> {
        let data_dir = self.config.data_dir;
        let mut first_err = None;
        for shard in self.shards {
            if let Err(e) = shard.close() {
                first_err.get_or_insert(e);
            }
        }
        info!(data_dir = %data_dir.display(), "engine closed");
        first_err.map_or(Ok(()), Err)
    }

    /// Delete every shard, then the data directory itself
    pub fn delete(self) -> Result<()> {
        let data_dir = self.config.data_dir;
        for shard in self.shards {
            shard.delete()?;
        }
        fs::remove_dir_all(&data_dir)?;
        info!(data_dir = %data_dir.display(), "engine deleted");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}
