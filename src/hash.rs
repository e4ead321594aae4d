//! Key hashing
//!
//! A fixed-seed xxHash64 over the key bytes, masked to 63 bits. The same
//! value drives shard selection, stripe selection and bucket routing, so it
//! must never change for an existing store.

use xxhash_rust::xxh64::xxh64;

/// Seed baked into every store on disk
pub const HASH_SEED: u64 = 0xe17a_1465;

/// Hash a key
#[inline]
pub fn hash_bytes(key: &[u8]) -> u64 {
    xxh64(key, HASH_SEED) & (i64::MAX as u64)
}

/// Hash the 8-byte little-endian encoding of `k`
#[inline]
pub fn hash_u64(k: u64) -> u64 {
    hash_bytes(&k.to_le_bytes())
}

/// Return the first number greater than `start` whose encoding collides with
/// `start` on the low `n_bits` bits of the hash.
pub fn find_collision(start: u64, n_bits: u32) -> Option<u64> {
    let mask = if n_bits >= 64 { u64::MAX } else { (1u64 << n_bits) - 1 };
    let target = hash_u64(start) & mask;
    (start.checked_add(1)?..u64::MAX).find(|&i| hash_u64(i) & mask == target)
}
