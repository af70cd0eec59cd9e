//! Read-through cache used for user settings and notification reads.
//!
//! Values are stored as JSON strings so the same keys work against Redis and
//! the in-process [`MemoryCache`]. Writers invalidate with
//! [`Cache::delete_prefix`] right after the store write succeeds.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::Clock;
use crate::errors::AppResult;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()>;

    /// Delete every key starting with `prefix`. Returns the number of keys removed.
    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64>;
}

/// Return the cached value for `key`, or run `loader`, cache its result for `ttl_secs` and return it.
pub async fn read_through<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl_secs: u64,
    loader: F,
) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    if let Some(hit) = cached::<T>(cache, key).await? {
        return Ok(hit);
    }

    let value = loader().await?;
    cache.set_raw(key, &serde_json::to_string(&value)?, ttl_secs).await?;
    Ok(value)
}

/// Like [`read_through`], but a `None` from the loader is returned without being cached.
pub async fn read_through_optional<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl_secs: u64,
    loader: F,
) -> AppResult<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    if let Some(hit) = cached::<T>(cache, key).await? {
        return Ok(Some(hit));
    }

    let value = loader().await?;
    if let Some(v) = &value {
        cache.set_raw(key, &serde_json::to_string(v)?, ttl_secs).await?;
    }
    Ok(value)
}

async fn cached<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> AppResult<Option<T>> {
    let Some(raw) = cache.get_raw(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            // Unreadable entries behave like a miss and get overwritten by the loader.
            tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

/// Single-process cache with clock-driven expiry.
pub struct MemoryCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock().values().filter(|(_, expires)| *expires > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, DateTime<Utc>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, expires)) if *expires > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        let expires = self.clock.now() + Duration::seconds(ttl_secs as i64);
        self.lock().insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = MemoryCache::new(clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn loader_runs_once_within_ttl() {
        let (_clock, cache) = cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: i64 = read_through(&cache, "notifications:u1:unread_count", 300, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (clock, cache) = cache();
        cache.set_raw("k", "1", 300).await.unwrap();
        clock.advance(Duration::seconds(299));
        assert_eq!(cache.get_raw("k").await.unwrap().as_deref(), Some("1"));
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get_raw("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_prefix_only_touches_matching_keys() {
        let (_clock, cache) = cache();
        cache.set_raw("notifications:a:unread_count", "1", 300).await.unwrap();
        cache.set_raw("notifications:a:10:0", "[]", 300).await.unwrap();
        cache.set_raw("notifications:b:unread_count", "2", 300).await.unwrap();
        cache.set_raw("settings:a", "{}", 300).await.unwrap();

        let removed = cache.delete_prefix("notifications:a").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_raw("notifications:b:unread_count").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn optional_miss_is_not_cached() {
        let (_clock, cache) = cache();
        let value: Option<String> =
            read_through_optional(&cache, "settings:nobody", 300, || async { Ok(None) })
                .await
                .unwrap();
        assert!(value.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn undecodable_entry_is_reloaded() {
        let (_clock, cache) = cache();
        cache.set_raw("k", "not json", 300).await.unwrap();
        let value: Vec<u8> = read_through(&cache, "k", 300, || async { Ok(vec![1, 2]) })
            .await
            .unwrap();
        assert_eq!(value, vec![1, 2]);
        assert_eq!(cache.get_raw("k").await.unwrap().as_deref(), Some("[1,2]"));
    }
}
