//! # RecordStore - Records keyed by a 64-bit id
//!
//! A [`RecordStore`] keeps records in a [`ChunkedMap<i64, V>`] and hands out
//! ids from an owned counter. The counter is persisted next to the data file,
//! in a second map file holding the single entry `1 -> max_id`.
//!
//! Queries ([`RecordStore::find`], [`RecordStore::update_count`], ...) scan the
//! map and evaluate predicates per record; see [`crate::query`].

use crate::codec::{Codec, Value};
use crate::config::Options;
use crate::error::Result;
use crate::map::ChunkedMap;
use crate::query::{self, Condition, FieldMap, FindCondition, Fields};
use log::{debug, warn};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

/// Key of the id counter in the counter map.
const COUNTER_KEY: i64 = 1;

/// A structured value stored in a [`RecordStore`].
///
/// The store assigns the id on first [`add`](RecordStore::add) when it reads
/// zero and never changes it afterwards. Usually implemented with
/// [`record!`](crate::record).
pub trait Record: Fields + Codec + Clone + Send + Sync + 'static {
    /// The record identifier.
    fn id(&self) -> i64;

    /// Sets the record identifier.
    fn set_id(&mut self, id: i64);
}

/// Appends `suffix` to the file name of `path`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// A map of records by id, with persistence and predicate queries.
///
/// # Example
///
/// ```rust,no_run
/// use compactmap::{Condition, FindCondition, Op, RecordStore};
///
/// #[derive(Debug, Clone, Default)]
/// struct User {
///     id: i64,
///     name: String,
///     age: i32,
/// }
///
/// compactmap::record!(User { id, name, age });
///
/// # fn main() -> compactmap::Result<()> {
/// let store = RecordStore::<User>::new("users.db", false)?;
/// let id = store.add(User { name: "ann".into(), age: 42, ..Default::default() });
///
/// let older = store.find(Condition::And, &[FindCondition::new("age", Op::Greater, 40)]);
/// assert_eq!(older[0].id, id);
///
/// store.save()?;
/// # Ok(())
/// # }
/// ```
pub struct RecordStore<V: Record> {
    map: ChunkedMap<i64, V>,

    /// Holds the persisted id counter under [`COUNTER_KEY`].
    info: ChunkedMap<i64, i64>,

    storage_file: PathBuf,
    counter_suffix: String,

    /// Last allocated id.
    max_id: AtomicI64,

    /// Serializes saves.
    save_lock: Mutex<()>,
}

impl<V: Record> RecordStore<V> {
    /// Opens a store backed by `storage_file` with default options.
    ///
    /// Missing or unreadable files are an error only if `fail_if_missing` is set.
    pub fn new<P: AsRef<Path>>(storage_file: P, fail_if_missing: bool) -> Result<Self> {
        Self::open(storage_file, Options::default().fail_if_missing(fail_if_missing))
    }

    /// Opens a store backed by `storage_file`.
    pub fn open<P: AsRef<Path>>(storage_file: P, options: Options) -> Result<Self> {
        options.validate()?;
        let storage_file = storage_file.as_ref().to_path_buf();
        let counter_file = with_suffix(&storage_file, &options.counter_suffix);

        let map = ChunkedMap::with_options(options.clone());
        if let Err(e) = map.load(&storage_file) {
            if options.fail_if_missing {
                return Err(e);
            }
            warn!("Starting without records from {:?}: {}", storage_file, e);
        }

        let info = ChunkedMap::with_options(options.clone());
        if let Err(e) = info.load(&counter_file) {
            if options.fail_if_missing {
                return Err(e);
            }
            warn!("Starting without id counter from {:?}: {}", counter_file, e);
        }

        let max_id = match info.get(&COUNTER_KEY) {
            Some(id) => id,
            None => {
                info.set(COUNTER_KEY, 1);
                1
            }
        };

        Ok(Self {
            map,
            info,
            storage_file,
            counter_suffix: options.counter_suffix,
            max_id: AtomicI64::new(max_id),
            save_lock: Mutex::new(()),
        })
    }

    /// The last allocated id.
    pub fn max_id(&self) -> i64 {
        self.max_id.load(Ordering::SeqCst)
    }

    /// The file the store saves to by default.
    pub fn storage_file(&self) -> &Path {
        &self.storage_file
    }

    /// The underlying map.
    pub fn map(&self) -> &ChunkedMap<i64, V> {
        &self.map
    }

    /// Stores `record` and returns its id.
    ///
    /// A zero id is replaced with the next id from the counter; any other id
    /// is kept and overwrites an existing record with that id.
    pub fn add(&self, mut record: V) -> i64 {
        let mut id = record.id();
        if id == 0 {
            id = self.max_id.fetch_add(1, Ordering::SeqCst) + 1;
            record.set_id(id);
        }
        self.map.set(id, record);
        id
    }

    /// Returns a copy of the record with this id.
    pub fn get(&self, id: i64) -> Option<V> {
        self.map.get(&id)
    }

    /// Removes the record with this id, if present.
    pub fn delete(&self, id: i64) {
        self.map.delete(&id);
    }

    /// Returns true if a record with this id exists.
    pub fn exists(&self, id: i64) -> bool {
        self.map.exists(&id)
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.map.count()
    }

    /// Removes every record and restarts ids at 1.
    pub fn clear(&self) {
        self.max_id.store(1, Ordering::SeqCst);
        self.map.clear();
    }

    /// Copies of all records, in map iteration order.
    pub fn get_all(&self) -> Vec<V> {
        let mut all = Vec::with_capacity(self.map.count());
        self.map.iterate(|_, v| {
            all.push(v.clone());
            true
        });
        all
    }

    /// Visits records until `visit` returns false.
    ///
    /// `visit` runs under the map's read lock and must not call back into
    /// this store.
    pub fn iterate<F>(&self, mut visit: F)
    where
        F: FnMut(&V) -> bool,
    {
        self.map.iterate(|_, v| visit(v));
    }

    /// Sets one field of a record. See [`set_fields`](Self::set_fields).
    pub fn set_field(&self, id: i64, field: &str, value: impl Into<Value>) -> Result<bool> {
        let mut fields = FieldMap::new();
        fields.insert(field.to_string(), value.into());
        self.set_fields(id, &fields)
    }

    /// Sets several fields of a record, looked up by name as in queries.
    ///
    /// Either every field is assigned or the record is left unchanged.
    /// Returns `Ok(false)` if the record does not exist or a name does not
    /// resolve to a scalar field. Returns [`Error::TypeMismatch`] if a value
    /// cannot be converted to its field's type.
    ///
    /// [`Error::TypeMismatch`]: crate::Error::TypeMismatch
    pub fn set_fields(&self, id: i64, fields: &FieldMap) -> Result<bool> {
        let mut outcome = Ok(false);
        self.map.update(&id, |record| {
            let mut draft = record.clone();
            outcome = query::assign_fields(&mut draft, fields);
            let changed = matches!(outcome, Ok(true));
            if changed {
                *record = draft;
            }
            changed
        });
        outcome
    }

    /// Records matching the query, in map iteration order.
    pub fn find(&self, condition: Condition, predicates: &[FindCondition]) -> Vec<V> {
        let mut found = Vec::new();
        self.find_fn(condition, predicates, |_, v| {
            found.push(v.clone());
            true
        });
        found
    }

    /// Calls `visit` for each matching record until it returns false.
    ///
    /// `visit` runs under the map's read lock and must not call back into
    /// this store.
    pub fn find_fn<F>(&self, condition: Condition, predicates: &[FindCondition], mut visit: F)
    where
        F: FnMut(i64, &V) -> bool,
    {
        self.map.iterate(|id, record| {
            if query::matches(record, condition, predicates) {
                return visit(*id, record);
            }
            true
        });
    }

    /// Applies `fields` to every matching record; returns how many were updated.
    pub fn update(
        &self,
        condition: Condition,
        predicates: &[FindCondition],
        fields: &FieldMap,
    ) -> Result<usize> {
        let mut ids = Vec::new();
        self.find_fn(condition, predicates, |id, _| {
            ids.push(id);
            true
        });
        self.apply(&ids, fields)
    }

    /// Applies `fields` to up to `limit` matching records (0 means all) and
    /// returns their ids.
    ///
    /// Without `random` the first `limit` matches in scan order are taken.
    /// With `random` all matches are gathered and `limit` of them are chosen
    /// uniformly without replacement. Records deleted between selection and
    /// update are still reported.
    pub fn update_count(
        &self,
        condition: Condition,
        predicates: &[FindCondition],
        fields: &FieldMap,
        limit: usize,
        random: bool,
    ) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        self.find_fn(condition, predicates, |id, _| {
            ids.push(id);
            random || limit == 0 || ids.len() < limit
        });

        if random {
            let matched = ids.len();
            ids.shuffle(&mut rand::rng());
            if limit > 0 {
                ids.truncate(limit);
            }
            debug!("Selected {} of {} matching records at random", ids.len(), matched);
        }

        self.apply(&ids, fields)?;
        Ok(ids)
    }

    fn apply(&self, ids: &[i64], fields: &FieldMap) -> Result<usize> {
        let mut updated = 0;
        for &id in ids {
            if self.set_fields(id, fields)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Saves to the default storage file.
    pub fn save(&self) -> Result<()> {
        let path = self.storage_file.clone();
        self.save_as(path)
    }

    /// Saves records to `path` and the id counter to `path` plus the counter suffix.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let _guard = self.save_lock.lock();

        self.info.set(COUNTER_KEY, self.max_id());
        self.map.save(path)?;
        self.info.save(with_suffix(path, &self.counter_suffix))?;
        Ok(())
    }

    /// Saves to `<storage_file>.backup<slot>`.
    pub fn save_backup(&self, slot: usize) -> Result<PathBuf> {
        let path = with_suffix(&self.storage_file, &format!(".backup{slot}"));
        self.save_as(&path)?;
        Ok(path)
    }
}
