//! # linkv
//!
//! An embedded, file-backed, concurrent key-value store built on
//! memory-mapped files and linear hashing:
//! - Chunked, growable memory-mapped index and data files
//! - Incremental rehashing, one lock stripe at a time
//! - Append-only records with single-pointer relinking updates
//! - Hash-routed shards for horizontal scale-out
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │                 (shard = hash(key) % N)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Shard 0   │   ...    │  Shard N-1  │   coarse RwLock
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────────────────────────────┐
//!   │         LinearHashTable             │   256 stripe locks
//!   │   (routing, chains, rehash, alloc)  │   + table state lock
//!   └──────┬──────────────────────┬───────┘
//!          ▼                      ▼
//!   ┌─────────────┐        ┌─────────────┐
//!   │ IndexStore  │        │  DataStore  │
//!   │ bucket heads│        │ header + log│
//!   └──────┬──────┘        └──────┬──────┘
//!          ▼                      ▼
//!   ┌─────────────────────────────────────┐
//!   │     MappedRegion (mmap chunks)      │
//!   └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod hash;

mod mmap;
mod store;
pub mod sync;
pub mod table;
pub mod shard;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LinkvError, Result};
pub use config::{Config, StoreGeometry};
pub use engine::Engine;
pub use shard::Shard;
pub use store::{DATA_FILE, INDEX_FILE};
pub use table::{LinearHashTable, TableStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
