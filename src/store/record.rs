//! One record of the data log

/// A record decoded from the data store.
///
/// `pos` identifies the record; it is only meaningful until the chain is
/// relinked, so callers re-read by offset instead of caching records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub pos: u64,
    pub next: u64,
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

impl Record {
    #[inline]
    pub fn key_equals(&self, key: &[u8]) -> bool {
        self.key == key
    }

    /// Key and value both match byte-for-byte
    #[inline]
    pub fn key_value_equals(&self, key: &[u8], value: &[u8]) -> bool {
        self.key_equals(key) && self.value.as_deref() == Some(value)
    }
}
