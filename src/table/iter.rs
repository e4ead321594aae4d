//! Bucket-at-a-time iteration

use std::collections::VecDeque;

use crate::error::Result;
use crate::sync::StripedLock;

use super::linear::LinearHashTable;

/// Iterator over a table's live entries.
///
/// Each bucket is copied out under its stripe's read lock, so an entry is
/// never observed half-written. Across buckets the view is weakly consistent:
/// concurrent writes may or may not show up, and an entry moved by a
/// concurrent split may be seen twice or not at all.
pub struct Iter<'a> {
    table: &'a LinearHashTable,
    bucket: u64,
    buffer: VecDeque<(Vec<u8>, Vec<u8>)>,
    failed: bool,
}

impl<'a> Iter<'a> {
    pub(super) fn new(table: &'a LinearHashTable) -> Self {
        Self {
            table,
            bucket: 0,
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// Copy every entry of the current bucket into the buffer
    fn collect_bucket(&mut self) -> Result<()> {
        let bucket = self.bucket;
        self.bucket += 1;

        let _stripe = self.table.stripes.read(StripedLock::stripe_for(bucket));
        let mut pos = self.table.index.get_address(bucket)?;
        let mut steps = 0u64;
        while pos != 0 {
            steps += 1;
            self.table.check_chain_len(steps, pos)?;

            let record = self.table.data.read_record(pos)?;
            if let Some(value) = record.value {
                self.buffer.push_back((record.key, value));
            }
            pos = record.next;
        }
        Ok(())
    }
}

impl Iterator for Iter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.failed || self.bucket >= self.table.state.read().logical_length() {
                return None;
            }
            if let Err(e) = self.collect_bucket() {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}
