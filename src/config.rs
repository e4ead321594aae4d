//! Configuration for linkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LinkvError, Result};

/// 32 MiB, the default for both file lengths and the mapped chunk size
pub const MB_32: u64 = 1 << 25;

/// Smallest chunk size accepted (one OS page)
pub const MIN_CHUNK_SIZE: u64 = 4096;

/// Largest chunk size accepted
pub const MAX_CHUNK_SIZE: u64 = 1 << 30;

/// Main configuration for a linkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all shards
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── shard_0/
    ///     │     ├── index.linkv
    ///     │     └── data.linkv
    ///     └── shard_1/ ...
    pub data_dir: PathBuf,

    /// Number of shards; fixed for the lifetime of the directory
    pub shards: usize,

    // -------------------------------------------------------------------------
    // File Geometry
    // -------------------------------------------------------------------------
    /// Initial index file length in bytes (one bucket = 8 bytes)
    pub index_file_length: u64,

    /// Initial data file length in bytes
    pub data_file_length: u64,

    /// Size of each memory-mapped chunk
    pub chunk_size: u64,
}

/// Per-table file geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreGeometry {
    pub index_file_length: u64,
    pub data_file_length: u64,
    pub chunk_size: u64,
}

impl Default for StoreGeometry {
    fn default() -> Self {
        Self {
            index_file_length: MB_32,
            data_file_length: MB_32,
            chunk_size: MB_32,
        }
    }
}

impl StoreGeometry {
    /// Check chunk size and lengths
    pub fn validate(&self) -> Result<()> {
        if !self.chunk_size.is_power_of_two()
            || self.chunk_size < MIN_CHUNK_SIZE
            || self.chunk_size > MAX_CHUNK_SIZE
        {
            return Err(LinkvError::Config(format!(
                "chunk_size must be a power of two in [{}, {}], got {}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, self.chunk_size
            )));
        }
        if self.index_file_length == 0 || self.data_file_length == 0 {
            return Err(LinkvError::Config(
                "index and data file lengths must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let geometry = StoreGeometry::default();
        Self {
            data_dir: PathBuf::from("./linkv_data"),
            shards: default_shards(),
            index_file_length: geometry.index_file_length,
            data_file_length: geometry.data_file_length,
            chunk_size: geometry.chunk_size,
        }
    }
}

/// Two shards at minimum, otherwise one per available core
fn default_shards() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Geometry applied to each shard's table
    pub fn geometry(&self) -> StoreGeometry {
        StoreGeometry {
            index_file_length: self.index_file_length,
            data_file_length: self.data_file_length,
            chunk_size: self.chunk_size,
        }
    }

    /// Reject configurations the engine cannot open
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(LinkvError::Config("shards must be at least 1".to_string()));
        }
        self.geometry().validate()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all shards)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of shards
    pub fn shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Set the initial index file length (in bytes)
    pub fn index_file_length(mut self, len: u64) -> Self {
        self.config.index_file_length = len;
        self
    }

    /// Set the initial data file length (in bytes)
    pub fn data_file_length(mut self, len: u64) -> Self {
        self.config.data_file_length = len;
        self
    }

    /// Set the mapped chunk size (in bytes)
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Apply a whole geometry at once
    pub fn geometry(mut self, geometry: StoreGeometry) -> Self {
        self.config.index_file_length = geometry.index_file_length;
        self.config.data_file_length = geometry.data_file_length;
        self.config.chunk_size = geometry.chunk_size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
