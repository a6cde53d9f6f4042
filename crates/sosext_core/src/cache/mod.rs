//! Lazily loaded, write-through snapshot cache.
//!
//! # Responsibility
//! - Load a value from the store on first read and serve it from memory.
//! - Apply store mutations and cache updates under one exclusive lock.
//!
//! # Invariants
//! - Readers only ever see complete snapshots (`Arc<T>`); updates are
//!   copy-on-write.
//! - A failed loader or store mutation leaves the cache exactly as it was.
//! - Each cache owns its own lock; caches never block each other.

use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// One independently locked cached category.
pub struct LazyCache<T> {
    name: &'static str,
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> LazyCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Drops the snapshot; the next read reloads from the store.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
        debug!("event=cache_invalidate module=cache cache={}", self.name);
    }

    /// Returns the cached snapshot, loading it on first access.
    ///
    /// Concurrent readers that miss at the same time run the loader once:
    /// the slot is re-checked after the write lock is taken.
    pub fn get_or_load<E>(&self, loader: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        if let Some(snapshot) = self.slot.read().as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut slot = self.slot.write();
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(loader()?);
        *slot = Some(Arc::clone(&snapshot));
        debug!("event=cache_load module=cache status=ok cache={}", self.name);
        Ok(snapshot)
    }

    /// Runs a store mutation and drops the snapshot when it succeeds.
    pub fn write_and_invalidate<R, E>(
        &self,
        store_op: impl FnOnce() -> Result<R, E>,
    ) -> Result<R, E> {
        let mut slot = self.slot.write();
        let result = store_op()?;
        *slot = None;
        Ok(result)
    }
}

impl<T: Clone> LazyCache<T> {
    /// Runs a store mutation and, on success, applies the same change to the
    /// loaded snapshot. `apply` also receives the store result.
    ///
    /// The write lock is held across both steps, so no reader can observe the
    /// store and the cache disagreeing. An unloaded cache stays unloaded.
    pub fn write_through<R, E>(
        &self,
        store_op: impl FnOnce() -> Result<R, E>,
        apply: impl FnOnce(&mut T, &R),
    ) -> Result<R, E> {
        let mut slot = self.slot.write();
        let result = store_op()?;
        if let Some(snapshot) = slot.as_mut() {
            apply(Arc::make_mut(snapshot), &result);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::LazyCache;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn loads_once_and_serves_snapshot() {
        let cache = LazyCache::new("test");
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_load(|| -> Result<_, ()> {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loader_error_leaves_cache_unloaded() {
        let cache: LazyCache<u32> = LazyCache::new("test");
        let err = cache.get_or_load(|| Err("store down")).unwrap_err();
        assert_eq!(err, "store down");
        assert!(!cache.is_loaded());
    }

    #[test]
    fn write_through_updates_loaded_snapshot_only_on_success() {
        let cache = LazyCache::new("test");
        cache
            .get_or_load(|| -> Result<_, ()> { Ok(BTreeMap::from([("a", 1)])) })
            .unwrap();

        let failed: Result<(), &str> = cache.write_through(
            || Err("rollback"),
            |map: &mut BTreeMap<&str, i32>, _| {
                map.insert("b", 2);
            },
        );
        assert!(failed.is_err());
        let snapshot = cache.get_or_load(|| -> Result<_, ()> { unreachable!() }).unwrap();
        assert!(!snapshot.contains_key("b"));

        cache
            .write_through(
                || -> Result<i32, ()> { Ok(2) },
                |map, value| {
                    map.insert("b", *value);
                },
            )
            .unwrap();
        let updated = cache.get_or_load(|| -> Result<_, ()> { unreachable!() }).unwrap();
        assert_eq!(updated.get("b"), Some(&2));
        assert!(!snapshot.contains_key("b"), "old snapshot must stay intact");
    }

    #[test]
    fn write_through_on_unloaded_cache_keeps_it_unloaded() {
        let cache: LazyCache<Vec<u8>> = LazyCache::new("test");
        cache
            .write_through(|| -> Result<(), ()> { Ok(()) }, |v, _| v.push(1))
            .unwrap();
        assert!(!cache.is_loaded());
    }

    #[test]
    fn write_and_invalidate_forces_reload() {
        let cache = LazyCache::new("test");
        cache.get_or_load(|| -> Result<_, ()> { Ok(1) }).unwrap();

        cache
            .write_and_invalidate(|| -> Result<(), ()> { Ok(()) })
            .unwrap();
        assert!(!cache.is_loaded());
        assert_eq!(*cache.get_or_load(|| -> Result<_, ()> { Ok(2) }).unwrap(), 2);
    }

    #[test]
    fn concurrent_first_reads_run_loader_once() {
        let cache = Arc::new(LazyCache::new("test"));
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                thread::spawn(move || {
                    *cache
                        .get_or_load(|| -> Result<_, ()> {
                            loads.fetch_add(1, Ordering::SeqCst);
                            Ok(5u32)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 5);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
