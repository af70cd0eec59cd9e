use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::{Cache, MemoryCache};
use crate::clock::Clock;
use crate::errors::AppResult;

/// Redis-backed cache for `url`, or a process-local one when `url` is empty.
pub async fn connect_cache(url: &str, clock: Arc<dyn Clock>) -> Result<Arc<dyn Cache>, redis::RedisError> {
    if url.is_empty() {
        tracing::warn!("no redis url configured, using in-process cache");
        return Ok(Arc::new(MemoryCache::new(clock)));
    }
    Ok(Arc::new(RedisClient::connect(url).await?))
}

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// SCAN for `{prefix}*` and delete the matches. Not atomic against concurrent writers.
    pub async fn del_prefix(&self, prefix: &str) -> Result<u64, redis::RedisError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");

        let keys: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(&pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&keys).await?;
        Ok(removed)
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Cache for RedisClient {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.get(key).await?)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        Ok(self.set(key, value, ttl_secs).await?)
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        let removed = self.del_prefix(prefix).await?;
        tracing::debug!(prefix = %prefix, removed, "cache keys invalidated");
        Ok(removed)
    }
}
