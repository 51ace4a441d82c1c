//! Generation-checked slot pools.
//!
//! A [`SlotPool`] is an arena of reusable slots plus a free list. Acquiring
//! pops a free slot (or grows the arena) and returns a [`SlotToken`] holding
//! the slot index and its generation. Releasing wipes the slot, bumps its
//! generation and pushes it back, so every token issued before the release
//! is rejected with [`StaleTokenError`] from then on.
//!
//! ```text
//!   acquire ──► [ in use, gen n ] ──release──► [ free, gen n+1 ] ──acquire──► ...
//!                   ▲                                     │
//!        token(n) valid                        token(n) stale
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::error::StaleTokenError;

/// A value that can live in a [`SlotPool`].
pub trait Poolable: Default + Send + 'static {
    /// Wipe the value before it returns to the free list.
    fn reset(&mut self);
}

/// Generation-stamped reference to a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotToken {
    index: usize,
    generation: u64,
}

impl SlotToken {
    /// Slot index in the arena.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generation the token was issued at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Entry<S> {
    generation: u64,
    in_use: bool,
    value: S,
}

struct PoolInner<S> {
    entries: Vec<Entry<S>>,
    free: Vec<usize>,
}

/// Free-list pool of slots of one concrete type.
pub struct SlotPool<S> {
    inner: Mutex<PoolInner<S>>,
}

impl<S: Poolable> Default for SlotPool<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Poolable> SlotPool<S> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                entries: Vec::new(),
                free: Vec::new(),
            }),
        }
    }

    /// Pop a free slot (or allocate one) and initialize it.
    pub fn acquire(&self, init: impl FnOnce(&mut S)) -> SlotToken {
        let mut inner = self.inner.lock();
        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                inner.entries.push(Entry {
                    generation: 0,
                    in_use: false,
                    value: S::default(),
                });
                inner.entries.len() - 1
            }
        };

        let entry = &mut inner.entries[index];
        entry.in_use = true;
        init(&mut entry.value);

        trace!(index, generation = entry.generation, "Slot acquired");
        SlotToken {
            index,
            generation: entry.generation,
        }
    }

    /// Run `f` against the slot if `token` is still current.
    ///
    /// `f` runs under the pool lock and must not call back into this pool.
    pub fn with<R>(&self, token: SlotToken, f: impl FnOnce(&mut S) -> R) -> Result<R, StaleTokenError> {
        let mut inner = self.inner.lock();
        let entry = Self::current_entry(&mut inner, token)?;
        Ok(f(&mut entry.value))
    }

    /// Wipe the slot and return it to the free list.
    pub fn release(&self, token: SlotToken) -> Result<(), StaleTokenError> {
        let mut inner = self.inner.lock();
        let entry = Self::current_entry(&mut inner, token)?;
        entry.value.reset();
        entry.in_use = false;
        entry.generation += 1;
        inner.free.push(token.index);

        trace!(index = token.index, "Slot recycled");
        Ok(())
    }

    /// Returns true while `token` refers to the slot's current occupant.
    pub fn is_current(&self, token: SlotToken) -> bool {
        let mut inner = self.inner.lock();
        Self::current_entry(&mut inner, token).is_ok()
    }

    /// Number of slots waiting on the free list.
    pub fn free_len(&self) -> usize {
        self.inner.lock().free.len()
    }

    /// Number of slots currently handed out.
    pub fn in_use(&self) -> usize {
        let inner = self.inner.lock();
        inner.entries.len() - inner.free.len()
    }

    /// Total slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn current_entry(
        inner: &mut PoolInner<S>,
        token: SlotToken,
    ) -> Result<&mut Entry<S>, StaleTokenError> {
        match inner.entries.get_mut(token.index) {
            Some(entry) if entry.in_use && entry.generation == token.generation => Ok(entry),
            Some(entry) => Err(StaleTokenError {
                index: token.index,
                token_generation: token.generation,
                current_generation: entry.generation,
            }),
            None => Err(StaleTokenError {
                index: token.index,
                token_generation: token.generation,
                current_generation: 0,
            }),
        }
    }
}

impl<S> fmt::Debug for SlotPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SlotPool")
            .field("type", &type_name::<S>())
            .field("capacity", &inner.entries.len())
            .field("free", &inner.free.len())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

type SizeProbe = Arc<dyn Fn() -> usize + Send + Sync>;

struct RegisteredPool {
    name: &'static str,
    pool: Arc<dyn Any + Send + Sync>,
    free_len: SizeProbe,
}

/// Owns one [`SlotPool`] per concrete slot type.
///
/// Created at system start by whatever owns the operation lifecycle and
/// shared by every bridge of that system.
#[derive(Default)]
pub struct PoolRegistry {
    pools: Mutex<HashMap<TypeId, RegisteredPool>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool for slot type `S`, created on first use.
    pub fn pool<S: Poolable>(&self) -> Arc<SlotPool<S>> {
        let mut pools = self.pools.lock();
        if let Some(existing) = pools.get(&TypeId::of::<S>()) {
            if let Ok(pool) = Arc::clone(&existing.pool).downcast::<SlotPool<S>>() {
                return pool;
            }
        }

        let pool = Arc::new(SlotPool::<S>::new());
        let probe = Arc::clone(&pool);
        pools.insert(
            TypeId::of::<S>(),
            RegisteredPool {
                name: type_name::<S>(),
                pool: Arc::clone(&pool) as Arc<dyn Any + Send + Sync>,
                free_len: Arc::new(move || probe.free_len()),
            },
        );
        pool
    }

    /// `(type name, free slots)` for every registered pool, sorted by name.
    pub fn sizes(&self) -> Vec<(&'static str, usize)> {
        let probes: Vec<(&'static str, SizeProbe)> = self
            .pools
            .lock()
            .values()
            .map(|registered| (registered.name, Arc::clone(&registered.free_len)))
            .collect();

        let mut sizes: Vec<_> = probes.into_iter().map(|(name, probe)| (name, probe())).collect();
        sizes.sort_by(|a, b| a.0.cmp(b.0));
        sizes
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }

    /// Returns true if no pool was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.sizes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
    }

    impl Poolable for Counter {
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    #[derive(Debug, Default)]
    struct Other;

    impl Poolable for Other {
        fn reset(&mut self) {}
    }

    #[test]
    fn test_acquire_and_access() {
        let pool = SlotPool::<Counter>::new();
        let token = pool.acquire(|c| c.value = 7);

        assert_eq!(pool.with(token, |c| c.value), Ok(7));
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn test_release_makes_token_stale() {
        let pool = SlotPool::<Counter>::new();
        let token = pool.acquire(|c| c.value = 1);

        pool.release(token).unwrap();
        assert!(!pool.is_current(token));
        let err = pool.with(token, |c| c.value).unwrap_err();
        assert_eq!(err.token_generation, 0);
        assert_eq!(err.current_generation, 1);
        assert_eq!(pool.release(token), Err(err));
    }

    #[test]
    fn test_slot_reused_with_new_generation() {
        let pool = SlotPool::<Counter>::new();
        let first = pool.acquire(|c| c.value = 1);
        pool.release(first).unwrap();

        let second = pool.acquire(|_| {});
        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert_eq!(pool.with(second, |c| c.value), Ok(0));
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_unknown_index_is_stale() {
        let pool = SlotPool::<Counter>::new();
        let token = SlotToken {
            index: 3,
            generation: 0,
        };
        assert!(pool.with(token, |_| ()).is_err());
    }

    #[test]
    fn test_registry_returns_same_pool() {
        let registry = PoolRegistry::new();
        let a = registry.pool::<Counter>();
        let b = registry.pool::<Counter>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_sizes() {
        let registry = PoolRegistry::new();
        assert!(registry.is_empty());

        let counters = registry.pool::<Counter>();
        registry.pool::<Other>();

        let token = counters.acquire(|_| {});
        counters.release(token).unwrap();

        let sizes = registry.sizes();
        assert_eq!(sizes.len(), 2);
        let counter_size = sizes
            .iter()
            .find(|(name, _)| name.ends_with("Counter"))
            .map(|(_, size)| *size);
        assert_eq!(counter_size, Some(1));
    }
}
