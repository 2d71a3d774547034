//! Generation-stamped memo cells for derived geometry.
//!
//! Owners keep a monotonically increasing generation counter and advance it
//! whenever their inputs change. A memo entry is served only while its stamp
//! equals the generation the caller presents, so stale entries never need to
//! be cleared eagerly.

use std::cell::{Cell, RefCell};
use std::ops::AddAssign;
use std::sync::Arc;

/// Cache statistics for diagnostics and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups served from a valid entry.
    pub hits: usize,
    /// Lookups that found no entry or a stale one.
    pub misses: usize,
    /// Entries written after a successful rebuild.
    pub rebuilds: usize,
}

impl CacheStats {
    /// Returns the cache hit rate as a value between 0.0 and 1.0.
    /// Returns 0.0 if no cache accesses have been made.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl AddAssign for CacheStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.rebuilds += rhs.rebuilds;
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: Cell<usize>,
    misses: Cell<usize>,
    rebuilds: Cell<usize>,
}

impl Counters {
    fn hit(&self) {
        self.hits.set(self.hits.get() + 1);
    }

    fn miss(&self) {
        self.misses.set(self.misses.get() + 1);
    }

    fn rebuilt(&self) {
        self.rebuilds.set(self.rebuilds.get() + 1);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            rebuilds: self.rebuilds.get(),
        }
    }
}

/// Single cached value stamped with the generation it was built for.
#[derive(Debug)]
pub struct Memo<T> {
    slot: RefCell<Option<(u64, Arc<T>)>>,
    counters: Counters,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            counters: Counters::default(),
        }
    }
}

impl<T> Memo<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry if it was built for `generation`. Does not count as
    /// a lookup.
    #[must_use]
    pub fn peek(&self, generation: u64) -> Option<Arc<T>> {
        match &*self.slot.borrow() {
            Some((stamp, value)) if *stamp == generation => Some(Arc::clone(value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self, generation: u64) -> bool {
        self.peek(generation).is_some()
    }

    /// Returns the entry for `generation`, building and stamping it on a miss.
    /// A failed build leaves the previous entry untouched.
    pub fn get_or_try_build<E>(
        &self,
        generation: u64,
        build: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.peek(generation) {
            self.counters.hit();
            return Ok(value);
        }
        self.counters.miss();
        let value = build()?;
        self.store(generation, Arc::clone(&value));
        Ok(value)
    }

    /// Stamps `value` with `generation`.
    pub fn store(&self, generation: u64, value: Arc<T>) {
        *self.slot.borrow_mut() = Some((generation, value));
        self.counters.rebuilt();
    }

    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

/// Like [`Memo`] but the entry is also keyed by the request that produced it.
#[derive(Debug)]
pub struct KeyedMemo<K, T> {
    slot: RefCell<Option<(u64, K, Arc<T>)>>,
    counters: Counters,
}

impl<K, T> Default for KeyedMemo<K, T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            counters: Counters::default(),
        }
    }
}

impl<K: PartialEq + Clone, T> KeyedMemo<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn peek(&self, generation: u64, key: &K) -> Option<Arc<T>> {
        match &*self.slot.borrow() {
            Some((stamp, stored, value)) if *stamp == generation && stored == key => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn get_or_try_build<E>(
        &self,
        generation: u64,
        key: &K,
        build: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.peek(generation, key) {
            self.counters.hit();
            return Ok(value);
        }
        self.counters.miss();
        let value = build()?;
        *self.slot.borrow_mut() = Some((generation, key.clone(), Arc::clone(&value)));
        self.counters.rebuilt();
        Ok(value)
    }

    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_rebuilds_only_when_generation_changes() {
        let memo: Memo<u32> = Memo::new();
        let mut builds = 0;
        let a = memo
            .get_or_try_build(1, || -> Result<_, ()> {
                builds += 1;
                Ok(Arc::new(7))
            })
            .unwrap();
        let b = memo.get_or_try_build(1, || -> Result<_, ()> { unreachable!() }).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds, 1);

        assert!(memo.peek(2).is_none());
        let c = memo.get_or_try_build(2, || -> Result<_, ()> { Ok(Arc::new(8)) }).unwrap();
        assert_eq!(*c, 8);
        assert_eq!(
            memo.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                rebuilds: 2
            }
        );
    }

    #[test]
    fn failed_build_keeps_previous_entry() {
        let memo: Memo<u32> = Memo::new();
        memo.store(1, Arc::new(3));
        let err = memo.get_or_try_build(2, || Err::<Arc<u32>, _>("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert_eq!(memo.peek(1).map(|v| *v), Some(3));
    }

    #[test]
    fn keyed_memo_misses_on_new_key() {
        let memo: KeyedMemo<String, u32> = KeyedMemo::new();
        memo.get_or_try_build(1, &"a".to_string(), || -> Result<_, ()> { Ok(Arc::new(1)) })
            .unwrap();
        assert!(memo.peek(1, &"a".to_string()).is_some());
        assert!(memo.peek(1, &"b".to_string()).is_none());
        assert!(memo.peek(2, &"a".to_string()).is_none());
    }
}
