//! Cache of sources that recently loaded.
//!
//! Owned by a [`super::ContentResolver`]; entries expire after a TTL and the
//! oldest entry is evicted once capacity is reached.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

/// Default entry lifetime (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of entries
pub const DEFAULT_CAPACITY: usize = 512;

/// A cached source
#[derive(Debug, Clone)]
pub struct CachedSource {
    /// Declared content type when the source loaded
    pub content_type: Option<String>,

    /// When the source loaded
    pub cached_at: Instant,
}

/// URL-keyed cache of known-good sources
#[derive(Debug)]
pub struct SourceCache {
    entries: HashMap<String, CachedSource>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl SourceCache {
    /// Create a cache. A capacity of zero disables caching.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity,
        }
    }

    fn is_expired(&self, entry: &CachedSource) -> bool {
        entry.cached_at.elapsed() >= self.ttl
    }

    /// Look up a URL, dropping it if expired
    pub fn get(&mut self, url: &str) -> Option<CachedSource> {
        let expired = match self.entries.get(url) {
            Some(entry) => self.is_expired(entry),
            None => return None,
        };

        if expired {
            self.entries.remove(url);
            return None;
        }

        self.entries.get(url).cloned()
    }

    /// Record a source that loaded
    pub fn insert(&mut self, url: impl Into<String>, content_type: Option<String>) {
        if self.capacity == 0 {
            return;
        }

        let url = url.into();
        if !self.entries.contains_key(&url) {
            self.purge_expired();

            while self.entries.len() >= self.capacity {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.cached_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(key) => {
                        debug!(url = %key, "Evicting oldest cached source");
                        self.entries.remove(&key);
                    }
                    None => break,
                }
            }
        }

        self.entries.insert(
            url,
            CachedSource {
                content_type,
                cached_at: Instant::now(),
            },
        );
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.cached_at.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Forget a URL
    pub fn invalidate(&mut self, url: &str) {
        self.entries.remove(url);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
