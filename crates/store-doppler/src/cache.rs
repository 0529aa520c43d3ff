//! # Secret Cache
//!
//! Time-bounded in-memory store of provider secrets, refreshed in bulk from
//! the secret store on expiry. Serves the last known values through a
//! provider outage rather than failing token issuance.

use crate::client::SecretFetcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store_core::{StoreError, StoreResult};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Default time-to-live for cached secrets (24 hours)
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One generation of fetched secrets, replaced wholesale on refresh
struct Snapshot {
    secrets: HashMap<String, String>,
    fetched_at: Instant,
}

/// TTL-bounded secret cache with stampede protection.
///
/// `get` serves from the current snapshot while it is fresh. When the TTL
/// has elapsed, exactly one caller performs the bulk refresh; concurrent
/// callers wait on the refresh lock and then re-read the swapped snapshot.
/// A failed refresh falls back to the stale snapshot when one exists.
pub struct SecretCache {
    fetcher: Arc<dyn SecretFetcher>,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    // Single-writer section for refresh-and-swap. Readers never block on
    // the network: they block here only when the snapshot is missing/stale.
    refresh_lock: Mutex<()>,
}

impl SecretCache {
    /// Create a cache over a fetcher with the given TTL
    pub fn new(fetcher: Arc<dyn SecretFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Create a cache with the default 24 h TTL
    pub fn with_default_ttl(fetcher: Arc<dyn SecretFetcher>) -> Self {
        Self::new(fetcher, DEFAULT_SECRET_TTL)
    }

    /// Get a named secret's current value.
    ///
    /// Triggers a bulk refresh when no snapshot exists or the TTL has
    /// elapsed. On refresh failure the previous value is served if one
    /// exists; otherwise fails with `SecretUnavailable`. A name absent
    /// after a successful refresh fails with `SecretNotFound`.
    pub async fn get(&self, name: &str) -> StoreResult<String> {
        // Fast path: fresh snapshot under the read lock
        {
            let guard = self.snapshot.read().await;
            if let Some(snap) = guard.as_ref() {
                if snap.fetched_at.elapsed() <= self.ttl {
                    return Self::lookup(&snap.secrets, name);
                }
            }
        }

        self.refresh_and_get(name).await
    }

    /// Drop the current snapshot so the next `get` refreshes
    pub async fn invalidate(&self) {
        let mut guard = self.snapshot.write().await;
        *guard = None;
        debug!("Secret cache invalidated");
    }

    async fn refresh_and_get(&self, name: &str) -> StoreResult<String> {
        let _refresh = self.refresh_lock.lock().await;

        // Another caller may have completed the refresh while we waited;
        // re-check so N expired readers cause exactly one remote fetch.
        {
            let guard = self.snapshot.read().await;
            if let Some(snap) = guard.as_ref() {
                if snap.fetched_at.elapsed() <= self.ttl {
                    return Self::lookup(&snap.secrets, name);
                }
            }
        }

        match self.fetcher.fetch_secrets().await {
            Ok(secrets) => {
                info!("Secret cache refreshed: {} secrets", secrets.len());
                let mut guard = self.snapshot.write().await;
                let snap = guard.insert(Snapshot {
                    secrets,
                    fetched_at: Instant::now(),
                });
                Self::lookup(&snap.secrets, name)
            }
            Err(e) => {
                let guard = self.snapshot.read().await;
                match guard.as_ref() {
                    Some(snap) => {
                        // Stale-but-available: a transient secret-store
                        // outage must not take down token issuance.
                        warn!("Secret refresh failed, serving stale value: {}", e);
                        Self::lookup(&snap.secrets, name)
                    }
                    None => Err(StoreError::SecretUnavailable(e.to_string())),
                }
            }
        }
    }

    fn lookup(secrets: &HashMap<String, String>, name: &str) -> StoreResult<String> {
        secrets
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::SecretNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counting fetcher that can be flipped into failure mode
    struct MockFetcher {
        calls: AtomicUsize,
        failing: AtomicBool,
        secrets: HashMap<String, String>,
    }

    impl MockFetcher {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                secrets: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SecretFetcher for MockFetcher {
        async fn fetch_secrets(&self) -> StoreResult<HashMap<String, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Network("connection refused".to_string()))
            } else {
                Ok(self.secrets.clone())
            }
        }
    }

    #[tokio::test]
    async fn test_second_get_within_ttl_does_not_refetch() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        let cache = SecretCache::new(fetcher.clone(), Duration::from_secs(60));

        assert_eq!(cache.get("HMAC_SECRET_KEY").await.unwrap(), "k1");
        assert_eq!(cache.get("HMAC_SECRET_KEY").await.unwrap(), "k1");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refetches_once() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        let cache = SecretCache::new(fetcher.clone(), Duration::ZERO);

        cache.get("HMAC_SECRET_KEY").await.unwrap();
        cache.get("HMAC_SECRET_KEY").await.unwrap();
        // TTL of zero expires immediately, so each sequential get refreshes
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_expired_readers_trigger_single_fetch() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        let cache = Arc::new(SecretCache::new(fetcher.clone(), Duration::from_secs(60)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("HMAC_SECRET_KEY").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "k1");
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_serves_stale_value() {
        let fetcher = Arc::new(MockFetcher::new(&[("STRIPE_WEBHOOK_SECRET", "whsec_1")]));
        let cache = SecretCache::new(fetcher.clone(), Duration::ZERO);

        assert_eq!(cache.get("STRIPE_WEBHOOK_SECRET").await.unwrap(), "whsec_1");

        fetcher.set_failing(true);
        // TTL already elapsed; refresh fails; previous value still served
        assert_eq!(cache.get("STRIPE_WEBHOOK_SECRET").await.unwrap(), "whsec_1");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_first_refresh_failure_is_unavailable() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        fetcher.set_failing(true);
        let cache = SecretCache::with_default_ttl(fetcher);

        let err = cache.get("HMAC_SECRET_KEY").await.unwrap_err();
        assert!(matches!(err, StoreError::SecretUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_name_after_refresh_is_not_found() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        let cache = SecretCache::with_default_ttl(fetcher);

        let err = cache.get("NO_SUCH_SECRET").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::SecretNotFound { name } if name == "NO_SUCH_SECRET"
        ));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let fetcher = Arc::new(MockFetcher::new(&[("HMAC_SECRET_KEY", "k1")]));
        let cache = SecretCache::new(fetcher.clone(), Duration::from_secs(60));

        cache.get("HMAC_SECRET_KEY").await.unwrap();
        cache.invalidate().await;
        cache.get("HMAC_SECRET_KEY").await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }
}
