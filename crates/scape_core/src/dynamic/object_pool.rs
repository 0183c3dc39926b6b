//! A typeless collection used for pooling objects and reusing them.
//!
//! Scenes keep one pool per concrete behaviour type. The pool is consumed
//! from the scene's worker thread while `return_to_pool` runs on arbitrary
//! caller threads, so the internal collection is locked — callers never
//! synchronize around the pool themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::dynamic::DeeplyMutable;
use crate::foundation::sync::lock;

/// Failure to construct a fresh instance for the pool.
#[derive(Debug, Clone, Error)]
#[error("failed to construct `{type_name}`: {reason}")]
pub struct SpawnError {
    /// The type whose construction failed
    pub type_name: &'static str,
    /// Human-readable failure reason
    pub reason: String,
}

/// Generator invoked when [`ObjectPool::get`] misses the pool.
pub type PoolGenerator = Arc<dyn Fn() -> Result<DeeplyMutable, SpawnError> + Send + Sync>;

/// A thread-safe bag of pre-built boxed values with a replaceable generator.
pub struct ObjectPool {
    pooled: Mutex<Vec<DeeplyMutable>>,
    generator: Mutex<Option<PoolGenerator>>,
    disposed: AtomicBool,
}

impl ObjectPool {
    /// Create a pool backed by `generator`.
    pub fn new(generator: PoolGenerator) -> Self {
        Self {
            pooled: Mutex::new(Vec::new()),
            generator: Mutex::new(Some(generator)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Create a pool from a plain closure.
    pub fn with_generator<F>(generator: F) -> Self
    where
        F: Fn() -> Result<DeeplyMutable, SpawnError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(generator))
    }

    /// Pop any pooled instance, or build one with the current generator.
    ///
    /// Never blocks on other pool operations beyond the internal lock. With
    /// no generator configured the miss degrades to a logged warning and an
    /// empty wrapper; a failing generator propagates its [`SpawnError`].
    pub fn get(&self) -> Result<DeeplyMutable, SpawnError> {
        if let Some(item) = lock(&self.pooled).pop() {
            return Ok(item);
        }
        let generator = lock(&self.generator).clone();
        match generator {
            Some(generator) => generator(),
            None => {
                log::warn!("object pool item generator is not set; returning an empty value");
                Ok(DeeplyMutable::empty())
            }
        }
    }

    /// Push `item` back into the pool. Always succeeds; the caller is
    /// responsible for having reset the instance.
    pub fn return_to_pool(&self, item: DeeplyMutable) {
        lock(&self.pooled).push(item);
    }

    /// Whether `item` (by wrapper identity) is currently pooled.
    pub fn contains(&self, item: &DeeplyMutable) -> bool {
        lock(&self.pooled).iter().any(|pooled| pooled.id() == item.id())
    }

    /// Number of instances currently available in the pool.
    pub fn len(&self) -> usize {
        lock(&self.pooled).len()
    }

    /// Whether the pool currently holds no instances.
    pub fn is_empty(&self) -> bool {
        lock(&self.pooled).is_empty()
    }

    /// Swap the generator used by subsequent misses. Already-pooled
    /// instances are unaffected.
    pub fn change_generator<F>(&self, generator: F)
    where
        F: Fn() -> Result<DeeplyMutable, SpawnError> + Send + Sync + 'static,
    {
        *lock(&self.generator) = Some(Arc::new(generator));
    }

    /// Release every pooled instance and drop the generator. Dropping the
    /// wrapped values runs their `Drop` implementations, which is where
    /// pooled resources release their handles. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut pooled = lock(&self.pooled);
        for mut item in pooled.drain(..) {
            item.clear();
        }
        drop(pooled);
        *lock(&self.generator) = None;
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for ObjectPool {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU32;
    use std::thread;

    fn counting_pool() -> (ObjectPool, Arc<AtomicU32>) {
        let counter = Arc::new(AtomicU32::new(0));
        let generator_counter = Arc::clone(&counter);
        let pool = ObjectPool::with_generator(move || {
            Ok(DeeplyMutable::new(
                generator_counter.fetch_add(1, Ordering::SeqCst),
            ))
        });
        (pool, counter)
    }

    #[test]
    fn get_prefers_pooled_instances() {
        let (pool, counter) = counting_pool();

        let first = pool.get().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let first_id = first.id();

        pool.return_to_pool(first);
        let recycled = pool.get().unwrap();
        assert_eq!(recycled.id(), first_id);
        // No fresh construction happened for the recycled instance.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_generator_degrades_to_empty_wrapper() {
        let pool = ObjectPool {
            pooled: Mutex::new(Vec::new()),
            generator: Mutex::new(None),
            disposed: AtomicBool::new(false),
        };
        let item = pool.get().unwrap();
        assert!(item.is_empty());
    }

    #[test]
    fn contains_tracks_wrapper_identity() {
        let (pool, _) = counting_pool();
        let item = pool.get().unwrap();
        assert!(!pool.contains(&item));

        let id = item.id();
        pool.return_to_pool(item);
        let probe = pool.get().unwrap();
        assert_eq!(probe.id(), id);
        assert!(!pool.contains(&probe));
        pool.return_to_pool(probe);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn change_generator_applies_to_subsequent_misses() {
        let (pool, _) = counting_pool();
        pool.change_generator(|| Ok(DeeplyMutable::new("fresh".to_string())));

        let item = pool.get().unwrap();
        assert_eq!(
            item.downcast_ref::<String>().map(String::as_str),
            Some("fresh")
        );
    }

    #[test]
    fn failing_generator_propagates_spawn_error() {
        let pool = ObjectPool::with_generator(|| {
            Err(SpawnError {
                type_name: "Unconstructible",
                reason: "always fails".into(),
            })
        });
        let err = pool.get().unwrap_err();
        assert_eq!(err.type_name, "Unconstructible");
    }

    #[test]
    fn dispose_is_idempotent_and_clears_the_pool() {
        let (pool, _) = counting_pool();
        let item = pool.get().unwrap();
        pool.return_to_pool(item);
        assert_eq!(pool.len(), 1);

        pool.dispose();
        assert!(pool.is_disposed());
        assert_eq!(pool.len(), 0);
        pool.dispose();
        assert_eq!(pool.len(), 0);

        // After disposal the generator is gone, so a miss degrades.
        let item = pool.get().unwrap();
        assert!(item.is_empty());
    }

    #[test]
    fn concurrent_gets_never_share_an_instance() {
        let (pool, _) = counting_pool();
        let pool = Arc::new(pool);

        // Seed the pool with some returnable instances.
        let mut seeded = Vec::new();
        for _ in 0..8 {
            seeded.push(pool.get().unwrap());
        }
        for item in seeded {
            pool.return_to_pool(item);
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let mut taken = Vec::new();
                for _ in 0..16 {
                    taken.push(pool.get().unwrap());
                }
                taken
                    .iter()
                    .map(|item| *item.downcast_ref::<u32>().unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                // Every handed-out payload is distinct across all threads.
                assert!(seen.insert(value));
            }
        }
        assert_eq!(seen.len(), 64);
    }
}
