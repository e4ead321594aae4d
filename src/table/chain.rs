//! Chain walking and relinking
//!
//! Callers hold the stripe lock covering the bucket for the whole walk.

use crate::error::{LinkvError, Result};
use crate::store::{Record, RECORD_HEADER_SIZE};

use super::linear::LinearHashTable;

/// Location of a pointer that references a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Link {
    /// The bucket slot in the index store
    Bucket(u64),
    /// The `next` field of the record at this position
    Record(u64),
}

/// Outcome of walking a chain
#[derive(Debug)]
pub(super) enum Walk {
    /// A matching record and the pointer that references it
    Found { link: Link, record: Record },
    /// No match; a new record would be hooked onto this pointer
    Missing(Link),
}

impl LinearHashTable {
    /// Walk `bucket` until `matches` accepts a record
    pub(super) fn walk<F>(&self, bucket: u64, mut matches: F) -> Result<Walk>
    where
        F: FnMut(&Record) -> bool,
    {
        let mut link = Link::Bucket(bucket);
        let mut pos = self.index.get_address(bucket)?;
        let mut steps = 0u64;

        while pos != 0 {
            steps += 1;
            self.check_chain_len(steps, pos)?;

            let record = self.data.read_record(pos)?;
            if matches(&record) {
                return Ok(Walk::Found { link, record });
            }
            link = Link::Record(pos);
            pos = record.next;
        }
        Ok(Walk::Missing(link))
    }

    /// Point `link` at `target`, persisting the pointer in its store
    pub(super) fn relink(&self, link: Link, target: u64) -> Result<()> {
        match link {
            Link::Bucket(bucket) => self.index.put_address(bucket, target),
            Link::Record(pos) => self.data.write_next_record_pos(pos, target),
        }
    }

    /// Write a terminal record at the freshly allocated `pos` and hook it onto `link`
    pub(super) fn insert_at(&self, link: Link, pos: u64, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write_record(pos, 0, key, Some(value))?;
        self.relink(link, pos)?;
        self.size.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
        Ok(())
    }

    /// Append a replacement for `old` and swing `link` to it
    pub(super) fn supersede(&self, link: Link, old: &Record, pos: u64, value: &[u8]) -> Result<()> {
        self.data.write_record(pos, old.next, &old.key, Some(value))?;
        self.relink(link, pos)
    }

    /// Chain the records at `positions` in order; returns the new head (0 if empty)
    pub(super) fn rebuild_chain(&self, positions: &[u64]) -> Result<u64> {
        for pair in positions.windows(2) {
            self.data.write_next_record_pos(pair[0], pair[1])?;
        }
        if let Some(&last) = positions.last() {
            self.data.write_next_record_pos(last, 0)?;
        }
        Ok(positions.first().copied().unwrap_or(0))
    }

    /// Distinct records occupy at least a header each, so a longer walk is a cycle
    pub(super) fn check_chain_len(&self, steps: u64, pos: u64) -> Result<()> {
        if steps > self.data.size() / RECORD_HEADER_SIZE {
            return Err(LinkvError::CorruptRecord {
                pos,
                reason: "cycle in bucket chain".to_string(),
            });
        }
        Ok(())
    }
}
