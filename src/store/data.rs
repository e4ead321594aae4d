//! Data store: table header followed by the append-only record log

use std::path::Path;

use crate::error::{LinkvError, Result};
use crate::mmap::MappedRegion;

use super::Record;

/// File name of the data store inside a table directory
pub const DATA_FILE: &str = "data.linkv";

/// Bytes reserved for the table header; the first record starts here
pub(crate) const HEADER_SIZE: u64 = 28;

/// next (8) + key_len (4) + val_len (4)
pub(crate) const RECORD_HEADER_SIZE: u64 = 16;

const NULL_VALUE_LEN: i32 = -1;

// Header offsets
const OFF_SIZE: u64 = 0;
const OFF_TABLE_LENGTH: u64 = 8;
const OFF_WRITE_POS: u64 = 16;
const OFF_REHASH_INDEX: u64 = 24;

/// Table bookkeeping persisted at offset 0 of the data file.
/// All-zero means "never checkpointed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Header {
    pub size: u64,
    pub table_length: u64,
    pub data_write_pos: u64,
    pub rehash_index: u32,
}

/// Append-log accessor over the data file
pub(crate) struct DataStore {
    region: MappedRegion,
}

impl DataStore {
    pub fn open(dir: &Path, len: u64, chunk_size: u64) -> Result<Self> {
        let region = MappedRegion::open(&dir.join(DATA_FILE), len, chunk_size)?;
        Ok(Self { region })
    }

    pub fn size(&self) -> u64 {
        self.region.size()
    }

    /// Bytes a record with these lengths occupies
    pub fn record_len(key: &[u8], value: Option<&[u8]>) -> Result<u64> {
        check_len("key", key.len())?;
        let value_len = match value {
            Some(v) => check_len("value", v.len())?,
            None => 0,
        };
        Ok(RECORD_HEADER_SIZE + key.len() as u64 + value_len)
    }

    // =========================================================================
    // Header
    // =========================================================================

    pub fn read_header(&self) -> Result<Header> {
        let rehash_index = self.region.get_i32(OFF_REHASH_INDEX)?;
        if rehash_index < 0 {
            return Err(LinkvError::CorruptHeader(format!(
                "negative rehash index {}",
                rehash_index
            )));
        }
        Ok(Header {
            size: self.region.get_u64(OFF_SIZE)?,
            table_length: self.region.get_u64(OFF_TABLE_LENGTH)?,
            data_write_pos: self.region.get_u64(OFF_WRITE_POS)?,
            rehash_index: rehash_index as u32,
        })
    }

    pub fn write_header(&self, header: &Header) -> Result<()> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&header.size.to_le_bytes());
        buf[8..16].copy_from_slice(&header.table_length.to_le_bytes());
        buf[16..24].copy_from_slice(&header.data_write_pos.to_le_bytes());
        buf[24..28].copy_from_slice(&(header.rehash_index as i32).to_le_bytes());
        self.region.put_bytes(0, &buf)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Decode the record at `pos`: fixed header first, then key and value in
    /// one bounded read.
    pub fn read_record(&self, pos: u64) -> Result<Record> {
        let size = self.region.size();
        if pos >= size {
            return Err(LinkvError::OutOfBounds {
                pos,
                len: RECORD_HEADER_SIZE,
                size,
            });
        }

        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        self.region.get_bytes(pos, &mut header)?;
        let mut next = [0u8; 8];
        let mut key_len = [0u8; 4];
        let mut value_len = [0u8; 4];
        next.copy_from_slice(&header[0..8]);
        key_len.copy_from_slice(&header[8..12]);
        value_len.copy_from_slice(&header[12..16]);
        let next = u64::from_le_bytes(next);
        let key_len = i32::from_le_bytes(key_len);
        let value_len = i32::from_le_bytes(value_len);

        if key_len < 0 {
            return Err(LinkvError::CorruptRecord {
                pos,
                reason: format!("negative key length {}", key_len),
            });
        }
        if value_len < NULL_VALUE_LEN {
            return Err(LinkvError::CorruptRecord {
                pos,
                reason: format!("invalid value length {}", value_len),
            });
        }

        let key_len = key_len as usize;
        let mut payload = vec![0u8; key_len + value_len.max(0) as usize];
        self.region.get_bytes(pos + RECORD_HEADER_SIZE, &mut payload)?;

        let value = (value_len != NULL_VALUE_LEN).then(|| payload.split_off(key_len));
        payload.truncate(key_len);

        Ok(Record {
            pos,
            next,
            key: payload,
            value,
        })
    }

    /// Write a whole record at a freshly allocated `pos`
    pub fn write_record(&self, pos: u64, next: u64, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let len = Self::record_len(key, value)? as usize;
        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(&next.to_le_bytes());
        buf.extend_from_slice(&(key.len() as i32).to_le_bytes());
        let value_len = value.map_or(NULL_VALUE_LEN, |v| v.len() as i32);
        buf.extend_from_slice(&value_len.to_le_bytes());
        buf.extend_from_slice(key);
        if let Some(v) = value {
            buf.extend_from_slice(v);
        }
        self.region.put_bytes(pos, &buf)
    }

    /// Patch only the chain pointer of the record at `pos`
    #[inline]
    pub fn write_next_record_pos(&self, pos: u64, next: u64) -> Result<()> {
        self.region.put_u64(pos, next)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn double_grow(&self) -> Result<u64> {
        self.region.double_grow()
    }

    pub fn flush(&self) -> Result<()> {
        self.region.flush()
    }
}

fn check_len(what: &str, len: usize) -> Result<u64> {
    if len > i32::MAX as usize {
        return Err(LinkvError::InvalidArgument(format!(
            "{} length {} exceeds {}",
            what,
            len,
            i32::MAX
        )));
    }
    Ok(len as u64)
}
