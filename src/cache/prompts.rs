//! Conditioning cache with LRU eviction.
//!
//! Maps a prompt pair to the conditioning handle the pipeline prepared
//! for it. Preparation is single-flight per key: concurrent requests for
//! the same uncached prompt produce one pipeline call, and every caller
//! gets the same handle (or the same failure).

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use crate::error::{DaemonError, Result};
use crate::pipeline::{Conditioning, DiffusionPipeline};
use crate::state::PromptPair;

/// Default number of prompts to keep prepared.
const DEFAULT_MAX_ENTRIES: usize = 10;

/// Conditioning cache with LRU eviction policy.
pub struct PromptCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

struct CacheInner {
    /// Ready conditioning, keyed by prompt pair.
    entries: HashMap<String, CacheEntry>,
    /// Preparations currently in flight, keyed by prompt pair.
    pending: HashMap<String, Arc<PrepSlot>>,
}

/// A cached handle with its last access time.
struct CacheEntry {
    conditioning: Conditioning,
    last_used: Instant,
}

/// Shared slot that an in-flight preparation resolves.
struct PrepSlot {
    result: Mutex<Option<std::result::Result<Conditioning, String>>>,
    ready: Condvar,
}

impl PrepSlot {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn fulfill(&self, result: std::result::Result<Conditioning, String>) {
        let mut slot = self.result.lock().unwrap();
        *slot = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Conditioning> {
        let mut slot = self.result.lock().unwrap();
        while slot.is_none() {
            slot = self.ready.wait(slot).unwrap();
        }
        match slot.as_ref().unwrap() {
            Ok(conditioning) => Ok(conditioning.clone()),
            // The leader's message already carries the full context.
            Err(message) => Err(DaemonError::new(
                crate::error::ErrorCode::ConditioningFailed,
                message.clone(),
            )),
        }
    }
}

impl PromptCache {
    /// Creates a cache with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Creates a cache holding at most `max_entries` prepared prompts.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                pending: HashMap::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the conditioning for a prompt pair, preparing it on a miss.
    ///
    /// A hit marks the entry most-recently-used. On a miss the first
    /// caller prepares while later callers for the same key block on the
    /// shared slot; nobody holds the cache lock across the pipeline call,
    /// so unrelated prompts prepare in parallel. A failed preparation
    /// inserts nothing and is handed to every waiter as the same error.
    pub fn lookup_or_prepare<P>(&self, prompt: &PromptPair, pipeline: &P) -> Result<Conditioning>
    where
        P: DiffusionPipeline + ?Sized,
    {
        let key = prompt.cache_key();

        let slot = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.last_used = Instant::now();
                return Ok(entry.conditioning.clone());
            }

            if let Some(slot) = inner.pending.get(&key) {
                PendingRole::Waiter(Arc::clone(slot))
            } else {
                let slot = Arc::new(PrepSlot::new());
                inner.pending.insert(key.clone(), Arc::clone(&slot));
                PendingRole::Leader(slot)
            }
        };

        match slot {
            PendingRole::Waiter(slot) => slot.wait(),
            PendingRole::Leader(slot) => {
                let prepared = pipeline.prepare_conditioning(&prompt.text, &prompt.negative);

                let mut inner = self.inner.lock().unwrap();
                inner.pending.remove(&key);

                match prepared {
                    Ok(conditioning) => {
                        if inner.entries.len() >= self.max_entries {
                            evict_lru(&mut inner.entries);
                        }
                        inner.entries.insert(
                            key,
                            CacheEntry {
                                conditioning: conditioning.clone(),
                                last_used: Instant::now(),
                            },
                        );
                        drop(inner);
                        slot.fulfill(Ok(conditioning.clone()));
                        Ok(conditioning)
                    }
                    Err(error) => {
                        drop(inner);
                        slot.fulfill(Err(error.message.clone()));
                        Err(error)
                    }
                }
            }
        }
    }

    /// Checks if a prompt pair has prepared conditioning.
    pub fn contains(&self, prompt: &PromptPair) -> bool {
        self.inner
            .lock()
            .unwrap()
            .entries
            .contains_key(&prompt.cache_key())
    }

    /// Returns the number of prepared prompts.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    /// Maximum number of prepared prompts kept.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Drops all prepared conditioning.
    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the least recently used entry.
fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
    let oldest_key = entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest_key {
        entries.remove(&key);
    }
}

/// Role a caller takes for an uncached key.
enum PendingRole {
    Leader(Arc<PrepSlot>),
    Waiter(Arc<PrepSlot>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::pipeline::passthrough::PassthroughPipeline;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn pair(text: &str) -> PromptPair {
        PromptPair::new(text, "")
    }

    #[test]
    fn miss_prepares_then_hit_reuses() {
        let cache = PromptCache::new();
        let pipeline = PassthroughPipeline::new();

        let first = cache.lookup_or_prepare(&pair("a"), &pipeline).unwrap();
        let second = cache.lookup_or_prepare(&pair("a"), &pipeline).unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(pipeline.prepare_calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_prompts_prepare_separately() {
        let cache = PromptCache::new();
        let pipeline = PassthroughPipeline::new();

        let a = cache.lookup_or_prepare(&pair("a"), &pipeline).unwrap();
        let b = cache.lookup_or_prepare(&pair("b"), &pipeline).unwrap();

        assert!(!a.ptr_eq(&b));
        assert_eq!(pipeline.prepare_calls(), 2);
    }

    #[test]
    fn negative_prompt_is_part_of_the_key() {
        let cache = PromptCache::new();
        let pipeline = PassthroughPipeline::new();

        cache
            .lookup_or_prepare(&PromptPair::new("a", "x"), &pipeline)
            .unwrap();
        cache
            .lookup_or_prepare(&PromptPair::new("a", "y"), &pipeline)
            .unwrap();

        assert_eq!(pipeline.prepare_calls(), 2);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PromptCache::with_capacity(2);
        let pipeline = PassthroughPipeline::new();

        cache.lookup_or_prepare(&pair("first"), &pipeline).unwrap();
        thread::sleep(Duration::from_millis(10));
        cache.lookup_or_prepare(&pair("second"), &pipeline).unwrap();
        thread::sleep(Duration::from_millis(10));

        // Touch "first" so "second" becomes the eviction candidate.
        cache.lookup_or_prepare(&pair("first"), &pipeline).unwrap();
        thread::sleep(Duration::from_millis(10));

        cache.lookup_or_prepare(&pair("third"), &pipeline).unwrap();

        assert!(cache.contains(&pair("first")));
        assert!(!cache.contains(&pair("second")));
        assert!(cache.contains(&pair("third")));
        assert_eq!(cache.len(), 2);
    }

    /// Pipeline whose preparation takes long enough for waiters to pile up.
    struct SlowPipeline {
        prepare_calls: AtomicUsize,
    }

    impl DiffusionPipeline for SlowPipeline {
        fn prepare_conditioning(&self, prompt: &str, _negative: &str) -> Result<Conditioning> {
            self.prepare_calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            Ok(Conditioning::new(prompt.to_string()))
        }

        fn generate(
            &self,
            input: &crate::pipeline::Frame,
            _conditioning: &Conditioning,
        ) -> Result<crate::pipeline::Frame> {
            Ok(input.clone())
        }
    }

    #[test]
    fn concurrent_misses_prepare_once_and_share_the_handle() {
        let cache = Arc::new(PromptCache::new());
        let pipeline = Arc::new(SlowPipeline {
            prepare_calls: AtomicUsize::new(0),
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || cache.lookup_or_prepare(&pair("shared"), &*pipeline))
            })
            .collect();

        let results: Vec<Conditioning> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();

        assert_eq!(pipeline.prepare_calls.load(Ordering::SeqCst), 1);
        for conditioning in &results[1..] {
            assert!(results[0].ptr_eq(conditioning));
        }
    }

    /// Pipeline whose preparation always fails, slowly.
    struct FailingPipeline {
        prepare_calls: AtomicUsize,
    }

    impl DiffusionPipeline for FailingPipeline {
        fn prepare_conditioning(&self, _prompt: &str, _negative: &str) -> Result<Conditioning> {
            self.prepare_calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            Err(DaemonError::conditioning_failed("encoder out of memory"))
        }

        fn generate(
            &self,
            input: &crate::pipeline::Frame,
            _conditioning: &Conditioning,
        ) -> Result<crate::pipeline::Frame> {
            Ok(input.clone())
        }
    }

    #[test]
    fn failed_preparation_reaches_every_waiter_and_caches_nothing() {
        let cache = Arc::new(PromptCache::new());
        let pipeline = Arc::new(FailingPipeline {
            prepare_calls: AtomicUsize::new(0),
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || cache.lookup_or_prepare(&pair("doomed"), &*pipeline))
            })
            .collect();

        for handle in handles {
            let error = handle.join().unwrap().unwrap_err();
            assert_eq!(error.code, ErrorCode::ConditioningFailed);
            assert!(error.message.contains("encoder out of memory"));
        }

        // One shared failure, nothing inserted, and a later call retries.
        assert_eq!(pipeline.prepare_calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        assert!(cache.lookup_or_prepare(&pair("doomed"), &*pipeline).is_err());
        assert_eq!(pipeline.prepare_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_drops_entries() {
        let cache = PromptCache::new();
        let pipeline = PassthroughPipeline::new();
        cache.lookup_or_prepare(&pair("a"), &pipeline).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
