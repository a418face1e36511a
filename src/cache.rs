use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::LookupResult;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = *self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        self.start + elapsed
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: LookupResult,
    created_at: Instant,
}

/// Complete lookup results keyed by canonical query, each valid for `ttl`.
pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<LookupResult> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if now.saturating_duration_since(entry.created_at) <= self.ttl => {
                    return Some(entry.result.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check under the write lock; a fresh entry may have replaced the stale one.
        if let Some(entry) = entries.get(key) {
            if now.saturating_duration_since(entry.created_at) <= self.ttl {
                return Some(entry.result.clone());
            }
            entries.remove(key);
            debug!("[Cache] evicted stale entry");
        }
        None
    }

    /// Store `result` under `key` and drop every entry that has outlived the TTL.
    pub async fn insert(&self, key: String, result: LookupResult) {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.created_at) <= ttl);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("[Cache] pruned {} stale entries", pruned);
        }

        entries.insert(
            key,
            CacheEntry {
                result,
                created_at: now,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
