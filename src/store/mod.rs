//! Store Module
//!
//! Typed views over two mapped regions per table: the index file (bucket
//! heads) and the data file (header + append-only record log).
//!
//! ## Index File
//! ```text
//! ┌──────────┬──────────┬──────────┬─────┐
//! │ bucket 0 │ bucket 1 │ bucket 2 │ ... │   u64 record address, 0 = empty
//! └──────────┴──────────┴──────────┴─────┘
//! ```
//!
//! ## Data File
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Header (28 bytes)                                      │
//! │ ┌─────────┬──────────────┬───────────────┬───────────┐ │
//! │ │Size (8) │TableLen (8)  │WritePos (8)   │Rehash (4) │ │
//! │ └─────────┴──────────────┴───────────────┴───────────┘ │
//! ├────────────────────────────────────────────────────────┤
//! │ Record                                                 │
//! │ ┌─────────┬─────────┬──────────┬─────┬───────────────┐ │
//! │ │Next (8) │KeyLen(4)│ValLen(4) │ Key │ Value         │ │
//! │ └─────────┴─────────┴──────────┴─────┴───────────────┘ │
//! │ ... (appended, superseded records stay as garbage)     │
//! └────────────────────────────────────────────────────────┘
//! ```
//! `ValLen == -1` marks a null value. All integers are little-endian.

mod data;
mod index;
mod record;

pub use data::DATA_FILE;
pub use index::INDEX_FILE;
pub(crate) use data::{DataStore, Header, HEADER_SIZE, RECORD_HEADER_SIZE};
pub(crate) use index::IndexStore;
pub(crate) use record::Record;
