//! A single sorted run of entries.

/// A key/value pair stored in a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

/// A contiguous run of entries kept sorted by key.
///
/// Inserting or removing shifts the tail, so the cost of either is bounded by
/// the chunk length.
#[derive(Debug, Clone)]
pub(crate) struct Chunk<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K: Ord, V> Chunk<K, V> {
    pub(crate) fn single(key: K, value: V) -> Self {
        Self { entries: vec![Entry { key, value }] }
    }

    /// `Ok(index)` of the key, or `Err(index)` where it would be inserted.
    #[inline]
    pub(crate) fn search(&self, key: &K) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key.cmp(key))
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.search(key).ok().map(|i| &self.entries[i].value)
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.search(key).ok().map(|i| &mut self.entries[i].value)
    }

    pub(crate) fn insert_at(&mut self, index: usize, key: K, value: V) {
        self.entries.insert(index, Entry { key, value });
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Entry<K, V> {
        self.entries.remove(index)
    }

    pub(crate) fn value_at_mut(&mut self, index: usize) -> &mut V {
        &mut self.entries[index].value
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn last_key(&self) -> Option<&K> {
        self.entries.last().map(|e| &e.key)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Entry<K, V>> {
        self.entries.iter()
    }
}
