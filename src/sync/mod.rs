//! Synchronization Module
//!
//! Fixed-size lock striping keyed by the low bits of the key hash.
//!
//! ## Responsibilities
//! - Bound the number of locks regardless of table size
//! - Up to `STRIPES`-way concurrent mutation inside one table
//! - Serialize a stripe's rehash against key operations on that stripe

mod striped;

pub use striped::{StripedLock, STRIPES};
