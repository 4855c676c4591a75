// Concurrent Access Tests for CompactMap
// These tests verify thread-safety of the map and the record store

use compactmap::{ChunkedMap, Condition, FindCondition, Op, Options, RecordStore};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
pub struct Event {
    pub id: i64,
    pub source: String,
    pub seq: u32,
}

compactmap::record!(Event { id, source, seq });

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test concurrent writes from multiple threads
#[test]
fn test_concurrent_writes() {
    init_logging();
    let map = Arc::new(ChunkedMap::with_options(Options::default().chunk_capacity(64)));

    let num_threads = 8;
    let writes_per_thread = 500;

    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let map_clone = Arc::clone(&map);
        let handle = thread::spawn(move || {
            for i in 0..writes_per_thread {
                let key = thread_id * writes_per_thread + i;
                map_clone.set(key, format!("thread_{}_value_{}", thread_id, i));
            }
        });
        handles.push(handle);
    }

    // Wait for all threads to complete
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.count(), num_threads * writes_per_thread);
    for thread_id in 0..num_threads {
        for i in 0..writes_per_thread {
            let key = thread_id * writes_per_thread + i;
            assert_eq!(map.get(&key), Some(format!("thread_{}_value_{}", thread_id, i)));
        }
    }
}

/// Test concurrent readers never observe partial entries
#[test]
fn test_concurrent_reads() {
    init_logging();
    let map = Arc::new(ChunkedMap::with_options(Options::default().chunk_capacity(100)));

    // Prepare data; each value is derived from its key.
    for i in 0..2000u64 {
        map.set(i, vec![i as u8; (i % 50) as usize]);
    }

    let num_threads = 10;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let map_clone = Arc::clone(&map);
        let barrier_clone = Arc::clone(&barrier);
        let handle = thread::spawn(move || {
            barrier_clone.wait();
            if thread_id % 2 == 0 {
                for i in 0..2000u64 {
                    let value = map_clone.get(&i).unwrap();
                    assert_eq!(value, vec![i as u8; (i % 50) as usize]);
                }
            } else {
                let mut seen = 0;
                map_clone.iterate(|k, v| {
                    assert_eq!(v.len(), (*k % 50) as usize);
                    assert!(v.iter().all(|b| *b == *k as u8));
                    seen += 1;
                    true
                });
                assert_eq!(seen, 2000);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Test readers and writers interleaving on the same keys
#[test]
fn test_concurrent_read_write() {
    init_logging();
    let map = Arc::new(ChunkedMap::new());
    for i in 0..100i64 {
        map.set(i, (i, i));
    }

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = vec![];

    for thread_id in 0..4i64 {
        let map_clone = Arc::clone(&map);
        let barrier_clone = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier_clone.wait();
            for round in 0..200i64 {
                let key = round % 100;
                if thread_id < 2 {
                    map_clone.set(key, (key, round));
                } else if let Some((k, _)) = map_clone.get(&key) {
                    // Both halves of the pair are written together.
                    assert_eq!(k, key);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(map.count(), 100);
}

/// Test that concurrent adds never hand out the same id twice
#[test]
fn test_concurrent_store_adds() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::<Event>::new(dir.path().join("events.db"), false).unwrap());

    let num_threads = 8;
    let adds_per_thread = 250;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let store_clone = Arc::clone(&store);
        let barrier_clone = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier_clone.wait();
            (0..adds_per_thread)
                .map(|seq| {
                    store_clone.add(Event {
                        source: format!("worker{}", thread_id),
                        seq,
                        ..Default::default()
                    })
                })
                .collect::<Vec<i64>>()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "id {} allocated twice", id);
        }
    }

    let total = num_threads * adds_per_thread as usize;
    assert_eq!(store.count(), total);
    assert_eq!(store.max_id(), total as i64 + 1);

    let late = store.find(Condition::And, &[FindCondition::new("seq", Op::Greater, 199)]);
    assert_eq!(late.len(), num_threads * 50);

    store.save().unwrap();
    let reopened = RecordStore::<Event>::new(dir.path().join("events.db"), true).unwrap();
    assert_eq!(reopened.count(), total);
}
