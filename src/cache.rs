//! Time-boxed memoization of dashboard snapshots.
//!
//! Kept outside the aggregation and dashboard services so those stay
//! stateless; callers that want caching wrap a service explicitly.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::ReportFilters;
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::dashboard::{ConsolidatedDashboardService, ConsolidatedData};
use crate::error::FetchError;

struct Entry<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

/// Async map whose entries expire `ttl` after they were stored.
pub struct TtlCache<K, V> {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &Entry<V>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) < self.ttl
    }

    /// The cached value for `key`, if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Store `value` under `key`, dropping any expired entries first.
    pub async fn insert(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, stored_at));
        if entries.len() < before {
            debug!(purged = before - entries.len(), "dropped expired cache entries");
        }
        entries.insert(key, Entry { stored_at, value });
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Return the fresh cached value or run `fetch` and cache its success.
    ///
    /// Errors are returned as-is and never cached. The lock is not held
    /// while `fetch` runs, so concurrent misses on one key may both fetch.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            debug!("cache hit");
            return Ok(value);
        }
        debug!("cache miss");
        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Drop expired entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }
}

/// [`ConsolidatedDashboardService::fetch_all_data`] memoized per
/// [`ReportFilters::dashboard_scope`].
pub struct CachedDashboard {
    service: ConsolidatedDashboardService,
    cache: Option<TtlCache<ReportFilters, ConsolidatedData>>,
}

impl CachedDashboard {
    pub fn new(service: ConsolidatedDashboardService, config: &CacheConfig) -> Self {
        Self::with_clock(service, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        service: ConsolidatedDashboardService,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = config
            .enabled
            .then(|| TtlCache::new(config.ttl, clock));
        Self { service, cache }
    }

    pub fn service(&self) -> &ConsolidatedDashboardService {
        &self.service
    }

    pub async fn fetch_all_data(
        &self,
        filters: &ReportFilters,
    ) -> Result<ConsolidatedData, FetchError> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_try_insert(filters.dashboard_scope(), || {
                        self.service.fetch_all_data(filters)
                    })
                    .await
            }
            None => self.service.fetch_all_data(filters).await,
        }
    }

    pub async fn invalidate(&self, filters: &ReportFilters) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&filters.dashboard_scope()).await;
        }
    }
}
