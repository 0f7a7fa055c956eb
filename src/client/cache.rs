//! TTL cache over disablement fetches.
//!
//! One entry per context key. Concurrent lookups for the same key share a
//! single in-flight fetch; a failed fetch is evicted so the next lookup
//! retries instead of caching the failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::warn;

use crate::models::{DisabledTest, DisabledTestsResponse};

use super::{ClientError, ContextKey, DisablementFetcher, FailurePolicy};

/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CachedValue {
    response: DisabledTestsResponse,
    fetched_at: Instant,
}

/// One slot per context key. The cell is filled at most once; callers that
/// arrive while a fetch is in flight wait on it rather than fetching again.
struct Entry {
    cell: OnceCell<CachedValue>,
}

impl Entry {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cell: OnceCell::new(),
        })
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match self.cell.get() {
            Some(value) => value.fetched_at.elapsed() > ttl,
            // Unfilled means a fetch is in flight; not expired
            None => false,
        }
    }
}

/// Client-side cache of per-context disablement state.
pub struct DisablementCache<F> {
    fetcher: Arc<F>,
    ttl: Duration,
    policy: FailurePolicy,
    entries: Mutex<HashMap<ContextKey, Arc<Entry>>>,
}

impl<F: DisablementFetcher> DisablementCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_options(fetcher, DEFAULT_TTL, FailurePolicy::default())
    }

    pub fn with_options(fetcher: F, ttl: Duration, policy: FailurePolicy) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            ttl,
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The disablement map for a context, fetching on miss or expiry.
    ///
    /// Under [`FailurePolicy::FailOpen`] a fetch failure yields an empty
    /// map (every test enabled); under `FailClosed` it is returned to the
    /// caller.
    pub async fn get(&self, context: &ContextKey) -> Result<DisabledTestsResponse, ClientError> {
        let entry = self.entry_for(context);

        let fetched = entry
            .cell
            .get_or_try_init(|| async {
                let response = self.fetcher.fetch_disabled(context).await?;
                Ok::<_, ClientError>(CachedValue {
                    response,
                    fetched_at: Instant::now(),
                })
            })
            .await;

        match fetched {
            Ok(value) => Ok(value.response.clone()),
            Err(err) => {
                self.evict(context, &entry);
                match self.policy {
                    FailurePolicy::FailOpen => {
                        warn!(
                            repository = %context.repository,
                            error = %err,
                            "disablement fetch failed, treating all tests as enabled"
                        );
                        Ok(DisabledTestsResponse::empty())
                    }
                    FailurePolicy::FailClosed => Err(err),
                }
            }
        }
    }

    /// Whether one test is disabled in a context, and by which rule.
    pub async fn check(
        &self,
        context: &ContextKey,
        test_key: &str,
    ) -> Result<Option<DisabledTest>, ClientError> {
        let response = self.get(context).await?;
        Ok(response.disabled_tests.get(test_key).cloned())
    }

    /// The live entry for a key, replacing an expired one.
    fn entry_for(&self, context: &ContextKey) -> Arc<Entry> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match entries.get(context) {
            Some(entry) if !entry.is_expired(self.ttl) => entry.clone(),
            _ => {
                let entry = Entry::new();
                entries.insert(context.clone(), entry.clone());
                entry
            }
        }
    }

    /// Drop a failed entry so the next lookup retries. Only removes the
    /// exact entry that failed; a newer replacement stays.
    fn evict(&self, context: &ContextKey, failed: &Arc<Entry>) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(current) = entries.get(context) {
            if Arc::ptr_eq(current, failed) {
                entries.remove(context);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn context() -> ContextKey {
        ContextKey {
            repository: "mattermost/webapp".to_string(),
            project_name: Some("chrome".to_string()),
            branch: Some("main".to_string()),
            base_url: None,
        }
    }

    fn one_disabled() -> DisabledTestsResponse {
        let mut disabled_tests = HashMap::new();
        disabled_tests.insert(
            "specs/login.spec.ts::chrome::logs in".to_string(),
            DisabledTest {
                reason: "flaky on CI".to_string(),
                rule_id: Uuid::new_v4(),
                matched_branch: None,
                matched_env: None,
            },
        );
        DisabledTestsResponse {
            disabled_tests,
            timestamp: Utc::now(),
        }
    }

    /// Scripted fetcher: fails the first `fail_first` calls, then succeeds.
    struct MockFetcher {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                delay: Duration::ZERO,
            }
        }

        fn failing(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: n,
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                delay,
            }
        }
    }

    #[async_trait]
    impl DisablementFetcher for Arc<MockFetcher> {
        async fn fetch_disabled(
            &self,
            _context: &ContextKey,
        ) -> Result<DisabledTestsResponse, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if call < self.fail_first {
                return Err(ClientError::Transport("connection refused".to_string()));
            }
            Ok(one_disabled())
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = DisablementCache::new(fetcher.clone());

        let first = cache.get(&context()).await.unwrap();
        let second = cache.get(&context()).await.unwrap();

        assert_eq!(first.disabled_tests.len(), 1);
        assert_eq!(second.disabled_tests.len(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_contexts_fetch_separately() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = DisablementCache::new(fetcher.clone());

        cache.get(&context()).await.unwrap();
        let mut other = context();
        other.branch = Some("release/2.0".to_string());
        cache.get(&other).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let fetcher = Arc::new(MockFetcher::slow(Duration::from_millis(50)));
        let cache = Arc::new(DisablementCache::new(fetcher.clone()));

        let a = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&context()).await })
        };
        let b = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&context()).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache =
            DisablementCache::with_options(fetcher.clone(), Duration::ZERO, FailurePolicy::FailOpen);

        cache.get(&context()).await.unwrap();
        cache.get(&context()).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fail_open_returns_empty_map() {
        let fetcher = Arc::new(MockFetcher::failing(usize::MAX));
        let cache = DisablementCache::new(fetcher.clone());

        let response = cache.get(&context()).await.unwrap();
        assert!(response.disabled_tests.is_empty());
    }

    #[tokio::test]
    async fn test_fail_closed_surfaces_error() {
        let fetcher = Arc::new(MockFetcher::failing(usize::MAX));
        let cache =
            DisablementCache::with_options(fetcher.clone(), DEFAULT_TTL, FailurePolicy::FailClosed);

        let err = cache.get(&context()).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let fetcher = Arc::new(MockFetcher::failing(1));
        let cache = DisablementCache::new(fetcher.clone());

        let first = cache.get(&context()).await.unwrap();
        assert!(first.disabled_tests.is_empty());

        // Eviction on failure means this lookup fetches again
        let second = cache.get(&context()).await.unwrap();
        assert_eq!(second.disabled_tests.len(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_check_looks_up_by_test_key() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = DisablementCache::new(fetcher);

        let hit = cache
            .check(&context(), "specs/login.spec.ts::chrome::logs in")
            .await
            .unwrap();
        assert_eq!(hit.unwrap().reason, "flaky on CI");

        let miss = cache
            .check(&context(), "specs/other.spec.ts::chrome::something")
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
