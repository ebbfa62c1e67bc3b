//! Short-lived context cache: LRU capacity bound plus a TTL check on read.
//!
//! Entries expire purely by elapsed time; a store write never invalidates
//! them, so cached context can lag new messages by up to the TTL.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::context::ContextResult;

type Clock = Box<dyn Fn() -> Instant + Send + Sync>;

pub struct ContextCache {
    entries: Arc<Mutex<LruCache<String, (ContextResult, Instant)>>>,
    ttl: Duration,
    clock: Clock,
}

impl ContextCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Box::new(Instant::now))
    }

    /// Constructor with an injected clock, for deterministic expiry tests.
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Clock) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(100).unwrap());
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(cap))),
            ttl,
            clock,
        }
    }

    pub fn insert(&self, key: String, result: ContextResult) {
        let now = (self.clock)();
        let mut entries = self.entries.lock().unwrap();
        entries.put(key, (result, now));
    }

    /// Returns the cached result if it is younger than the TTL; expired
    /// entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<ContextResult> {
        let now = (self.clock)();
        let mut entries = self.entries.lock().unwrap();
        let expired = match entries.get(key) {
            Some((result, stored_at)) => {
                if now.duration_since(*stored_at) < self.ttl {
                    return Some(result.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
