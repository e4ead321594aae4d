//! Tests for Shard
//!
//! These tests verify:
//! - Operations pass through to the table with a caller-supplied hash
//! - Shard iteration sees every entry
//! - Mixed readers and writers on one shard
//! - Flush, close and delete

use std::sync::Arc;
use std::thread;

use linkv::hash::hash_bytes;
use linkv::{Shard, StoreGeometry};
use tempfile::TempDir;

fn small_geometry() -> StoreGeometry {
    StoreGeometry {
        index_file_length: 4096,
        data_file_length: 4096,
        chunk_size: 4096,
    }
}

fn put(shard: &Shard, key: &[u8], value: &[u8]) -> Option<Vec<u8>> {
    shard.put(key, value, hash_bytes(key)).unwrap()
}

fn get(shard: &Shard, key: &[u8]) -> Option<Vec<u8>> {
    shard.get(key, hash_bytes(key)).unwrap()
}

#[test]
fn test_shard_basic_operations() {
    let temp_dir = TempDir::new().unwrap();
    let shard = Shard::open(5, temp_dir.path(), small_geometry()).unwrap();
    assert_eq!(shard.id(), 5);
    assert_eq!(shard.dir(), temp_dir.path());

    assert_eq!(put(&shard, b"a", b"1"), None);
    assert_eq!(put(&shard, b"a", b"2"), Some(b"1".to_vec()));
    assert_eq!(get(&shard, b"a"), Some(b"2".to_vec()));
    assert!(shard.contains_key(b"a", hash_bytes(b"a")).unwrap());

    let h = hash_bytes(b"b");
    assert_eq!(shard.put_if_absent(b"b", b"x", h).unwrap(), None);
    assert_eq!(shard.put_if_absent(b"b", b"y", h).unwrap(), Some(b"x".to_vec()));
    assert_eq!(shard.replace(b"b", b"z", h).unwrap(), Some(b"x".to_vec()));
    assert!(shard.replace_value(b"b", b"z", b"w", h).unwrap());
    assert!(!shard.remove_value(b"b", b"z", h).unwrap());
    assert!(shard.remove_value(b"b", b"w", h).unwrap());

    assert_eq!(shard.remove(b"a", hash_bytes(b"a")).unwrap(), Some(b"2".to_vec()));
    assert_eq!(shard.size(), 0);
}

#[test]
fn test_shard_iteration() {
    let temp_dir = TempDir::new().unwrap();
    let shard = Shard::open(0, temp_dir.path(), small_geometry()).unwrap();
    for i in 0..700u64 {
        put(&shard, &i.to_le_bytes(), b"v");
    }

    let mut keys: Vec<u64> = shard
        .iter()
        .map(|entry| {
            let (k, _) = entry.unwrap();
            u64::from_le_bytes(k.try_into().unwrap())
        })
        .collect();
    keys.sort_unstable();

    assert_eq!(keys, (0..700u64).collect::<Vec<_>>());
    assert_eq!(shard.stats().size, 700);
}

#[test]
fn test_shard_mutation_while_iterating() {
    let temp_dir = TempDir::new().unwrap();
    let shard = Shard::open(0, temp_dir.path(), small_geometry()).unwrap();
    for i in 0..100u64 {
        put(&shard, &i.to_le_bytes(), b"v");
    }

    // the shard lock is only held inside each `next`
    let mut seen = 0;
    for entry in shard.iter() {
        let (k, _) = entry.unwrap();
        shard.put(&k, b"updated", hash_bytes(&k)).unwrap();
        seen += 1;
    }

    assert!(seen >= 100);
    assert_eq!(shard.size(), 100);
    assert_eq!(get(&shard, &7u64.to_le_bytes()), Some(b"updated".to_vec()));
}

#[test]
fn test_shard_concurrent_readers_and_writers() {
    let temp_dir = TempDir::new().unwrap();
    let shard = Arc::new(Shard::open(0, temp_dir.path(), small_geometry()).unwrap());
    for i in 0..100u64 {
        put(&shard, &i.to_le_bytes(), b"stable");
    }

    let writers: Vec<_> = (0..4u64)
        .map(|t| {
            let shard = Arc::clone(&shard);
            thread::spawn(move || {
                for i in 0..500u64 {
                    put(&shard, &(1000 + t * 500 + i).to_le_bytes(), b"fresh");
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shard = Arc::clone(&shard);
            thread::spawn(move || {
                for i in 0..100u64 {
                    assert_eq!(get(&shard, &i.to_le_bytes()), Some(b"stable".to_vec()));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(shard.size(), 2100);
}

#[test]
fn test_shard_flush_close_reopen_delete() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("shard_0");
    {
        let shard = Shard::open(0, &dir, small_geometry()).unwrap();
        put(&shard, b"k", b"v");
        shard.flush().unwrap();
        shard.close().unwrap();
    }

    let shard = Shard::open(0, &dir, small_geometry()).unwrap();
    assert_eq!(get(&shard, b"k"), Some(b"v".to_vec()));
    shard.clear().unwrap();
    assert_eq!(shard.size(), 0);

    shard.delete().unwrap();
    assert!(!dir.exists());
}
