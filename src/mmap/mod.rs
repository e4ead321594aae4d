//! Memory-Mapped Region Module
//!
//! One logically contiguous, growable byte region backed by a single file and
//! realized as an array of fixed-size mapped chunks.
//!
//! ## Responsibilities
//! - Map the backing file chunk by chunk (no full remap on growth)
//! - Bounds-checked integer/byte accessors spanning chunk boundaries
//! - Doubling growth, zero-fill clear, flush
//!
//! ## Layout
//! ```text
//!  absolute pos ─────────────────────────────────────────────▶
//! ┌──────────────┬──────────────┬──────────────┬──────────────┐
//! │   chunk 0    │   chunk 1    │   chunk 2    │   chunk 3    │
//! └──────────────┴──────────────┴──────────────┴──────────────┘
//!                      ▲
//!        locate(pos) = (pos / chunk_size, pos % chunk_size)
//! ```

mod region;

pub(crate) use region::MappedRegion;
