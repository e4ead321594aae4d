//! Error types for linkv
//!
//! Provides a unified error type for all operations. A missing key is never
//! an error: lookups return `Ok(None)` and conditional updates `Ok(false)`.

use thiserror::Error;

/// Result type alias using LinkvError
pub type Result<T> = std::result::Result<T, LinkvError>;

/// Unified error type for linkv operations
#[derive(Debug, Error)]
pub enum LinkvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Precondition Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// Access outside the currently mapped region (missed growth or bad metadata)
    #[error("Access [{pos}, {pos}+{len}) is out of mapped range {size}")]
    OutOfBounds { pos: u64, len: u64, size: u64 },

    #[error("Corrupt record at {pos}: {reason}")]
    CorruptRecord { pos: u64, reason: String },

    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    // -------------------------------------------------------------------------
    // Table Errors
    // -------------------------------------------------------------------------
    /// A record routed to neither half of a bucket split
    #[error(
        "Rehash invariant violated: hash={hash}, idx={idx}, new_idx={new_idx}, table_length={table_length}"
    )]
    RehashInvariant {
        hash: u64,
        idx: u64,
        new_idx: u64,
        table_length: u64,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
