//! Linear Hash Table Module
//!
//! The storage engine proper: chained buckets over the index/data stores,
//! incremental rehashing, and lock-free append allocation.
//!
//! ## Responsibilities
//! - get/put/put_if_absent/remove/replace over singly linked bucket chains
//! - Split one stripe of buckets at a time when load exceeds 0.75
//! - Allocate record space with a CAS cursor, doubling the data store on demand
//! - Checkpoint bookkeeping into the data-store header
//!
//! ## Bucket Routing
//! ```text
//!   stripe = hash & 255
//!   stripe <  rehash_index  →  bucket = hash & (2 * table_length - 1)   (already split)
//!   stripe >= rehash_index  →  bucket = hash & (table_length - 1)
//! ```
//!
//! ## Updates
//! An update never rewrites a record in place. It appends the new record
//! (pointing at the old record's successor) and then flips exactly one
//! pointer: the bucket slot or the predecessor's `next`. A crash between the
//! two steps leaves an unreachable record, never a broken chain.
//!
//! ## Lock Order
//! stripe lock → table state lock. A rehash is never started while a stripe
//! lock is held.

mod chain;
mod iter;
mod linear;
mod stats;

pub use iter::Iter;
pub use linear::{LinearHashTable, LOAD_FACTOR};
pub use stats::TableStats;
