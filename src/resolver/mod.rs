//! Content resolution with ordered fallback.
//!
//! A [`ContentResolver`] walks a candidate list in order, making each URL the
//! active source and attempting a load. The first load that succeeds wins; a
//! failure advances to the next candidate; running out of candidates invokes
//! the caller's `on_all_failed` hook.
//!
//! Starting a new session cancels the previous one, so a late response for an
//! item the caller navigated away from never overwrites newer state.

pub mod cache;
pub mod state;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::{ContentFetcher, FetchError};
use crate::gateway::{generate_candidates, GatewayConfig};

pub use cache::{CachedSource, SourceCache};
pub use state::ResolveState;

/// Default per-candidate timeout
pub const DEFAULT_CANDIDATE_TIMEOUT: Duration = Duration::from_secs(15);

/// The source a session settled on
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// Index into the candidate list
    pub index: usize,

    /// The candidate URL
    pub url: String,

    /// Declared content type
    pub content_type: Option<String>,

    /// Whether the load was answered from the source cache
    pub from_cache: bool,
}

/// Terminal result of a resolution session
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A candidate loaded
    Playing(ResolvedSource),

    /// Every candidate failed
    Exhausted { attempts: usize },

    /// The session was superseded or aborted
    Cancelled { attempts: usize },
}

impl Resolution {
    /// The terminal state this result corresponds to
    pub fn state(&self) -> ResolveState {
        match self {
            Resolution::Playing(source) => ResolveState::Playing(source.index),
            Resolution::Exhausted { .. } => ResolveState::Exhausted,
            Resolution::Cancelled { .. } => ResolveState::Cancelled,
        }
    }

    /// The resolved source, if any
    pub fn source(&self) -> Option<&ResolvedSource> {
        match self {
            Resolution::Playing(source) => Some(source),
            _ => None,
        }
    }
}

/// Walks candidate URLs until one loads
pub struct ContentResolver {
    fetcher: Arc<dyn ContentFetcher>,
    gateway: GatewayConfig,
    cache: Mutex<SourceCache>,
    candidate_timeout: Duration,
    active: Mutex<Option<CancellationToken>>,
}

impl ContentResolver {
    /// Create a resolver with default timeout and cache
    pub fn new(fetcher: Arc<dyn ContentFetcher>, gateway: GatewayConfig) -> Self {
        Self {
            fetcher,
            gateway,
            cache: Mutex::new(SourceCache::default()),
            candidate_timeout: DEFAULT_CANDIDATE_TIMEOUT,
            active: Mutex::new(None),
        }
    }

    /// Set the per-candidate timeout
    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Replace the source cache
    pub fn with_cache(mut self, cache: SourceCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    /// Candidate URLs for an identifier
    pub fn candidates(&self, id: &str, known_direct_url: Option<&str>) -> Vec<String> {
        generate_candidates(&self.gateway, id, known_direct_url)
    }

    /// Start a new session, cancelling whichever session was active
    pub fn begin_session(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = active.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel the active session, if any
    pub fn cancel_active(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = active.take() {
            token.cancel();
        }
    }

    /// Purge expired cache entries; returns how many were removed
    pub fn purge_cache(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .purge_expired()
    }

    /// Resolve an identifier: generate its candidates and walk them
    pub async fn resolve_id<F>(
        &self,
        id: &str,
        known_direct_url: Option<&str>,
        on_all_failed: F,
    ) -> Resolution
    where
        F: FnOnce() + Send,
    {
        let candidates = self.candidates(id, known_direct_url);
        debug!(%id, count = candidates.len(), "Generated candidates");
        self.resolve(&candidates, on_all_failed).await
    }

    /// Walk a candidate list in a fresh session
    pub async fn resolve<F>(&self, candidates: &[String], on_all_failed: F) -> Resolution
    where
        F: FnOnce() + Send,
    {
        let token = self.begin_session();
        self.run_session(candidates, &token, on_all_failed).await
    }

    /// Walk a candidate list under a caller-supplied cancellation token
    pub async fn run_session<F>(
        &self,
        candidates: &[String],
        token: &CancellationToken,
        on_all_failed: F,
    ) -> Resolution
    where
        F: FnOnce() + Send,
    {
        let total = candidates.len();
        let mut state = ResolveState::Idle;
        let mut attempts = 0;
        // Content type and cache origin of the candidate that loaded
        let mut loaded: Option<(Option<String>, bool)> = None;

        loop {
            match state {
                ResolveState::Idle => {
                    state = state.start(total);
                }
                ResolveState::TryingCandidate(index) => {
                    if token.is_cancelled() {
                        state = state.on_cancel();
                        continue;
                    }

                    let url = &candidates[index];

                    if let Some(hit) = self.cached(url) {
                        debug!(index, %url, "Candidate answered from cache");
                        loaded = Some((hit.content_type, true));
                        state = state.on_success();
                        continue;
                    }

                    attempts += 1;
                    debug!(index, total, %url, "Trying candidate");

                    let attempt = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        result = self.load(url) => Some(result),
                    };

                    match attempt {
                        None => {
                            state = state.on_cancel();
                        }
                        Some(Ok(info)) => {
                            self.remember(url, info.content_type.clone());
                            loaded = Some((info.content_type, false));
                            state = state.on_success();
                        }
                        Some(Err(e)) => {
                            warn!(index, %url, error = %e, "Candidate failed");
                            state = state.on_failure(total);
                        }
                    }
                }
                ResolveState::Playing(index) => {
                    let url = candidates[index].clone();
                    let (content_type, from_cache) = loaded.take().unwrap_or_default();
                    info!(index, %url, from_cache, "Source resolved");
                    return Resolution::Playing(ResolvedSource {
                        index,
                        url,
                        content_type,
                        from_cache,
                    });
                }
                ResolveState::Exhausted => {
                    error!(attempts, "All source URLs failed to play");
                    on_all_failed();
                    return Resolution::Exhausted { attempts };
                }
                ResolveState::Cancelled => {
                    debug!(attempts, "Resolution cancelled");
                    return Resolution::Cancelled { attempts };
                }
            }
        }
    }

    async fn load(&self, url: &str) -> Result<crate::adapters::SourceInfo, FetchError> {
        tokio::time::timeout(self.candidate_timeout, self.fetcher.probe(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                seconds: self.candidate_timeout.as_secs(),
            })?
    }

    fn cached(&self, url: &str) -> Option<CachedSource> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
    }

    fn remember(&self, url: &str, content_type: Option<String>) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url, content_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FetchedContent, SourceInfo};
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// Fetcher that only answers for a fixed set of URLs and records calls
    struct Scripted {
        ok: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(ok: &[&str]) -> Self {
            Self {
                ok: ok.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentFetcher for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn probe(&self, url: &str) -> Result<SourceInfo, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.ok.contains(url) {
                let mut info = SourceInfo::new(url);
                info.content_type = Some("video/mp4".to_string());
                Ok(info)
            } else {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }

        async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
            Err(FetchError::Unreachable {
                url: url.to_string(),
                reason: "not scripted".to_string(),
            })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://c{}", i)).collect()
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let fetcher = Arc::new(Scripted::new(&["https://c2", "https://c3"]));
        let resolver = ContentResolver::new(fetcher.clone(), GatewayConfig::default());

        let result = resolver.resolve(&urls(5), || panic!("not exhausted")).await;

        assert_eq!(result.state(), ResolveState::Playing(2));
        assert_eq!(fetcher.calls(), vec!["https://c0", "https://c1", "https://c2"]);
    }

    #[tokio::test]
    async fn test_playing_carries_loaded_metadata() {
        let fetcher = Arc::new(Scripted::new(&["https://c1"]));
        let resolver = ContentResolver::new(fetcher, GatewayConfig::default());

        let first = resolver.resolve(&urls(3), || panic!("not exhausted")).await;
        let expected = ResolvedSource {
            index: 1,
            url: "https://c1".to_string(),
            content_type: Some("video/mp4".to_string()),
            from_cache: false,
        };
        assert_eq!(first, Resolution::Playing(expected.clone()));

        let second = resolver.resolve(&urls(3), || panic!("not exhausted")).await;
        assert_eq!(
            second,
            Resolution::Playing(ResolvedSource {
                from_cache: true,
                ..expected
            })
        );
    }

    #[tokio::test]
    async fn test_exhaustion_calls_hook_once() {
        let fetcher = Arc::new(Scripted::new(&[]));
        let resolver = ContentResolver::new(fetcher.clone(), GatewayConfig::default());
        let called = Mutex::new(0);

        let result = resolver
            .resolve(&urls(3), || *called.lock().unwrap() += 1)
            .await;

        assert_eq!(result, Resolution::Exhausted { attempts: 3 });
        assert_eq!(*called.lock().unwrap(), 1);
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_candidates_exhaust() {
        let resolver = ContentResolver::new(Arc::new(Scripted::new(&[])), GatewayConfig::default());
        let result = resolver.resolve(&[], || {}).await;
        assert_eq!(result, Resolution::Exhausted { attempts: 0 });
    }

    #[tokio::test]
    async fn test_cache_skips_round_trip() {
        let fetcher = Arc::new(Scripted::new(&["https://c1"]));
        let resolver = ContentResolver::new(fetcher.clone(), GatewayConfig::default());

        resolver.resolve(&urls(2), || {}).await;
        assert_eq!(fetcher.calls().len(), 2);

        let second = resolver.resolve(&urls(2), || {}).await;
        let source = second.source().unwrap();
        assert_eq!(source.index, 1);
        assert!(source.from_cache);
        // c0 is tried again (failures are not cached); c1 comes from cache
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_session() {
        let resolver = ContentResolver::new(Arc::new(Scripted::new(&[])), GatewayConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let result = resolver.run_session(&urls(3), &token, || panic!("no hook")).await;
        assert_eq!(result, Resolution::Cancelled { attempts: 0 });
    }

    #[test]
    fn test_begin_session_cancels_previous() {
        let resolver = ContentResolver::new(Arc::new(Scripted::new(&[])), GatewayConfig::default());
        let first = resolver.begin_session();
        let second = resolver.begin_session();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        resolver.cancel_active();
        assert!(second.is_cancelled());
    }
}
