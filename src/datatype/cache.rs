//! Process-wide canonical [`DataType`] cache.
//!
//! Entries are held weakly: a data type stays canonical for as long as
//! anybody holds it, after which its slot is reclaimed by the next sweep.
//! Lookups go through the map's entry API so that, for a given key, building
//! and publishing the canonical instance happens under the shard lock and two
//! callers never walk away with different live instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::{DataType, DataTypeInner, DataTypeKey};

const MIN_HIGH_WATER: usize = 256;

pub(crate) static DATA_TYPE_CACHE: Lazy<DataTypeCache> = Lazy::new(DataTypeCache::new);

/// Weak-valued memoizing cache keyed by builder state.
#[derive(Debug)]
pub struct DataTypeCache {
    entries: DashMap<DataTypeKey, Weak<DataTypeInner>>,
    high_water: AtomicUsize,
}

impl DataTypeCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            high_water: AtomicUsize::new(MIN_HIGH_WATER),
        }
    }

    /// Return the live canonical instance for `key`, building it if there is
    /// none.
    pub fn get_or_build(&self, key: DataTypeKey) -> DataType {
        let inner = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
                Some(inner) => return DataType(inner),
                None => {
                    let inner = Arc::new(DataTypeInner::new(occupied.key().clone()));
                    occupied.insert(Arc::downgrade(&inner));
                    inner
                }
            },
            Entry::Vacant(vacant) => {
                tracing::trace!("data type cache miss for {:?}", vacant.key());
                let inner = Arc::new(DataTypeInner::new(vacant.key().clone()));
                vacant.insert(Arc::downgrade(&inner));
                inner
            }
        };

        // The entry guard is released at this point, sweeping may lock every shard
        self.sweep_if_needed();
        DataType(inner)
    }

    /// Number of slots, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots whose data type is still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Drop every slot whose data type is gone.
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before.saturating_sub(self.entries.len())
    }

    fn sweep_if_needed(&self) {
        let len = self.entries.len();
        if len <= self.high_water.load(Ordering::Relaxed) {
            return;
        }

        let removed = self.purge();
        let remaining = self.entries.len();
        self.high_water
            .store((remaining * 2).max(MIN_HIGH_WATER), Ordering::Relaxed);
        tracing::debug!(
            removed,
            remaining,
            "swept dead entries from the data type cache"
        );
    }
}

impl Default for DataTypeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::mime;
    use crate::types::{TypeRef, STRING};

    fn key(type_ref: &TypeRef) -> DataTypeKey {
        DataTypeKey {
            type_ref: type_ref.clone(),
            item_type: None,
            mime_type: mime::ANY.to_string(),
            encoding: None,
        }
    }

    #[test]
    fn test_same_key_yields_same_instance() {
        let cache = DataTypeCache::new();
        let a = cache.get_or_build(key(&STRING));
        let b = cache.get_or_build(key(&STRING));

        assert!(a.ptr_eq(&b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dead_entries_are_rebuilt_and_purged() {
        let cache = DataTypeCache::new();
        let transient = TypeRef::builder("Transient").build();

        drop(cache.get_or_build(key(&transient)));
        assert_eq!(cache.live_count(), 0);

        let rebuilt = cache.get_or_build(key(&transient));
        assert_eq!(cache.live_count(), 1);
        drop(rebuilt);

        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_bounds_growth() {
        let cache = DataTypeCache::new();
        for i in 0..(MIN_HIGH_WATER * 3) {
            let type_ref = TypeRef::builder(format!("Type{}", i)).build();
            drop(cache.get_or_build(key(&type_ref)));
        }
        assert!(cache.len() <= MIN_HIGH_WATER + 1);
    }
}
