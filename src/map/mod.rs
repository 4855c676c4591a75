//! # ChunkedMap - Compact ordered map
//!
//! Entries live in a list of chunks. Each chunk is a sorted `Vec` of at most
//! [`Options::chunk_capacity`] entries, so there is no per-entry node or bucket
//! overhead and the shift cost of any insert or delete is bounded by the chunk
//! size rather than the size of the map.
//!
//! ## Ordering
//!
//! Every chunk is sorted, but the chunk list as a whole is not. New keys only
//! ever go into the last chunk; once it is full a new chunk is started, and a
//! key that sorts before an earlier chunk's range still lands in the newest
//! one. Lookups search every chunk and are unaffected. Iteration visits chunks
//! in creation order, so it is globally sorted only when all entries fit in one
//! chunk or keys were inserted in non-decreasing order.
//!
//! ## Thread Safety
//!
//! One `parking_lot::RwLock` guards the whole map. Writers (`set`, `delete`,
//! `clear`, `load`, ...) take it exclusively; readers (`get`, `exists`,
//! `count`, `iterate`, `save`) share it. The lock is not reentrant: a callback
//! passed to [`ChunkedMap::iterate`] or [`ChunkedMap::update`] must not call
//! back into the same map. Doing so deadlocks.

mod chunk;

pub use chunk::Entry;

use crate::codec::Codec;
use crate::config::Options;
use crate::error::Result;
use crate::persist::{self, EntryReader};
use chunk::Chunk;
use log::{debug, info};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Chunk layout statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    /// Number of chunks.
    pub chunks: usize,
    /// Total number of entries.
    pub entries: usize,
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} buffers, total len: {}", self.chunks, self.entries)
    }
}

struct Inner<K, V> {
    chunks: Vec<Chunk<K, V>>,

    /// Upper bound of every key outside the last chunk; `None` when there is
    /// only one chunk. Deletes never lower it.
    sealed_max: Option<K>,

    /// Changed since the last save or load.
    dirty: bool,

    /// File of the last successful save or load.
    file: Option<PathBuf>,
}

impl<K: Ord + Clone, V> Inner<K, V> {
    fn new() -> Self {
        Self { chunks: Vec::new(), sealed_max: None, dirty: false, file: None }
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.chunks.iter().find_map(|c| c.get(key))
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.chunks.iter_mut().find_map(|c| c.get_mut(key))
    }

    fn count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    fn set(&mut self, key: K, value: V, capacity: usize) -> bool {
        self.dirty = true;

        let slot = match self.chunks.last_mut() {
            Some(last) => match last.search(&key) {
                Ok(index) => {
                    *last.value_at_mut(index) = value;
                    return true;
                }
                Err(index) => Some(index),
            },
            None => None,
        };

        // The key may still live in a sealed chunk.
        if self.sealed_max.as_ref().is_some_and(|max| key <= *max) {
            let sealed = self.chunks.len() - 1;
            if let Some(existing) = self.chunks[..sealed].iter_mut().find_map(|c| c.get_mut(&key)) {
                *existing = value;
                return true;
            }
        }

        match (slot, self.chunks.last_mut()) {
            (Some(index), Some(last)) if last.len() < capacity => last.insert_at(index, key, value),
            (_, last) => {
                if let Some(last_key) = last.and_then(|c| c.last_key()) {
                    if self.sealed_max.as_ref().map_or(true, |max| last_key > max) {
                        self.sealed_max = Some(last_key.clone());
                    }
                }
                self.chunks.push(Chunk::single(key, value));
            }
        }
        false
    }

    fn delete(&mut self, key: &K) -> Option<V> {
        let (i, index) = self
            .chunks
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.search(key).ok().map(|index| (i, index)))?;

        let chunk = &mut self.chunks[i];
        let entry = chunk.remove_at(index);
        if chunk.len() == 0 {
            self.chunks.remove(i);
        }
        if self.chunks.len() <= 1 {
            self.sealed_max = None;
        }
        self.dirty = true;
        Some(entry.value)
    }
}

/// A memory-compact ordered map built from capacity-bounded sorted chunks.
///
/// # Example
///
/// ```rust
/// use compactmap::ChunkedMap;
///
/// let map = ChunkedMap::new();
/// map.set(3, 300);
/// map.set(1, 100);
/// map.set(2, 200);
///
/// let mut seen = Vec::new();
/// map.iterate(|k, v| {
///     seen.push((*k, *v));
///     true
/// });
/// assert_eq!(seen, vec![(1, 100), (2, 200), (3, 300)]);
/// ```
pub struct ChunkedMap<K, V> {
    inner: RwLock<Inner<K, V>>,
    options: Options,
}

impl<K: Ord + Clone, V> Default for ChunkedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> ChunkedMap<K, V> {
    /// Creates an empty map with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates an empty map. A zero chunk capacity is treated as one.
    pub fn with_options(mut options: Options) -> Self {
        options.chunk_capacity = options.chunk_capacity.max(1);
        Self { inner: RwLock::new(Inner::new()), options }
    }

    /// Inserts or overwrites `key`. Returns true if an existing entry was
    /// overwritten in place.
    ///
    /// New keys go into the last chunk while it has room, otherwise into a new
    /// chunk. Older chunks are only searched when the key can fall inside
    /// their range.
    pub fn set(&self, key: K, value: V) -> bool {
        self.inner.write().set(key, value, self.options.chunk_capacity)
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().find(key).cloned()
    }

    /// Calls `f` with the value stored under `key` without cloning it.
    pub fn get_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.read().find(key).map(f)
    }

    /// Mutates the value stored under `key` in place.
    ///
    /// `f` reports whether it changed the value; only then is the map marked
    /// dirty. Returns `None` if the key is absent, otherwise what `f` returned.
    /// `f` runs under the write lock and must not touch this map.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut V) -> bool) -> Option<bool> {
        let mut inner = self.inner.write();
        let changed = inner.find_mut(key).map(f)?;
        if changed {
            inner.dirty = true;
        }
        Some(changed)
    }

    /// Removes `key`. Returns true if it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.inner.write().delete(key).is_some()
    }

    /// Returns true if `key` is present.
    pub fn exists(&self, key: &K) -> bool {
        self.inner.read().find(key).is_some()
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.inner.read().count()
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().chunks.is_empty()
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }

    /// Chunk and entry counts.
    pub fn stats(&self) -> MapStats {
        let inner = self.inner.read();
        MapStats { chunks: inner.chunks.len(), entries: inner.count() }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.chunks.clear();
        inner.sealed_max = None;
        inner.dirty = true;
    }

    /// Returns the existing value for `key`, or stores `value` and returns it.
    /// The flag is true when the key already existed.
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.find(&key) {
            return (existing.clone(), true);
        }
        inner.set(key, value.clone(), self.options.chunk_capacity);
        (value, false)
    }

    /// Removes `key` and returns its value, if it was present.
    pub fn load_and_delete(&self, key: &K) -> Option<V> {
        self.inner.write().delete(key)
    }

    /// Visits entries chunk by chunk, each chunk in key order, until `visit`
    /// returns false.
    ///
    /// The read lock is held for the whole traversal. `visit` must not call
    /// any method of this map.
    pub fn iterate<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let inner = self.inner.read();
        for chunk in &inner.chunks {
            for entry in chunk.iter() {
                if !visit(&entry.key, &entry.value) {
                    return;
                }
            }
        }
    }

    /// Copies every entry out, in iteration order.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        let inner = self.inner.read();
        inner
            .chunks
            .iter()
            .flat_map(Chunk::iter)
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Returns true if the map changed since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty
    }
}

impl<K: Ord + Clone + Codec, V: Codec> ChunkedMap<K, V> {
    /// Creates a map and loads `path` into it.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let map = Self::with_options(options);
        map.load(path)?;
        Ok(map)
    }

    /// Writes the whole map to `path` in chunk order.
    ///
    /// Does nothing if the map is unchanged since it was last saved to or
    /// loaded from the same path. The file is written in place; a failed save
    /// leaves it incomplete.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let inner = self.inner.upgradable_read();

        if !inner.dirty && inner.file.as_deref() == Some(path) {
            debug!("Skipping save of unchanged map to {:?}", path);
            return Ok(());
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(self.options.io_buffer_size, file);
        let count = inner.count();
        let entries = inner.chunks.iter().flat_map(Chunk::iter).map(|e| (&e.key, &e.value));
        persist::write_entries(&mut writer, count, entries)?;
        writer.flush()?;

        let mut inner = RwLockUpgradableReadGuard::upgrade(inner);
        inner.dirty = false;
        inner.file = Some(path.to_path_buf());

        info!("Saved {} entries in {} chunks to {:?}", count, inner.chunks.len(), path);
        Ok(())
    }

    /// Reads every entry of `path` and inserts it with [`set`](Self::set)
    /// semantics, so chunks are sorted whatever the file order.
    ///
    /// Entries already in the map are kept. On error the load stops; entries
    /// read before the failure stay in the map.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(self.options.io_buffer_size, file);
        let entries = EntryReader::<_, K, V>::new(reader)?;
        let expected = entries.remaining();

        let mut inner = self.inner.write();
        for entry in entries {
            let (key, value) = entry?;
            inner.set(key, value, self.options.chunk_capacity);
        }
        inner.dirty = false;
        inner.file = Some(path.to_path_buf());

        info!("Loaded {} entries from {:?}", expected, path);
        Ok(())
    }
}
