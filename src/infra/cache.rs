//! Redis cache: JSON values with TTL, capped session lists and
//! fixed-window rate limiting.

use futures::StreamExt;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::config::{
    Config, CACHE_PREFIX_ANALYTICS, CACHE_PREFIX_RATE_LIMIT, CACHE_PREFIX_SESSION,
};
use crate::errors::{AppError, AppResult};

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    /// Delete all keys matching a glob pattern. Returns how many were removed.
    pub async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let mut scan_conn = self.connection.clone();
        let keys: Vec<String> = {
            let iter = scan_conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(cache_error)?;
            iter.collect().await
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let deleted: u64 = conn.del(&keys).await.map_err(cache_error)?;
        Ok(deleted)
    }

    // =========================================================================
    // Analytics Reports
    // =========================================================================

    /// Key of a cached report, e.g. `analytics:{school}:teacher:{id}`.
    pub fn analytics_key(school_id: Uuid, scope: &str) -> String {
        format!("{}{}:{}", CACHE_PREFIX_ANALYTICS, school_id, scope)
    }

    /// Drop every cached report of a school.
    pub async fn invalidate_analytics(&self, school_id: Uuid) -> AppResult<u64> {
        let pattern = format!("{}{}:*", CACHE_PREFIX_ANALYTICS, school_id);
        self.delete_pattern(&pattern).await
    }

    // =========================================================================
    // Session Cache Operations
    // =========================================================================

    pub async fn delete_session(&self, session_id: &str) -> AppResult<()> {
        let key = format!("{}{}", CACHE_PREFIX_SESSION, session_id);
        self.delete(&key).await
    }

    /// Append to a session list and keep its newest `max_len` entries.
    ///
    /// Push, trim and TTL refresh run as one MULTI/EXEC, so concurrent
    /// appends never overwrite each other.
    pub async fn push_session_entry<T: Serialize>(
        &self,
        session_id: &str,
        entry: &T,
        max_len: usize,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let key = format!("{}{}", CACHE_PREFIX_SESSION, session_id);
        let json = serde_json::to_string(entry)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;
        let (start, stop) = newest_range(max_len);

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .rpush(&key, json)
            .ignore()
            .ltrim(&key, start, stop)
            .ignore()
            .expire(&key, ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    /// Every entry of a session list, oldest first.
    pub async fn get_session_entries<T: DeserializeOwned>(&self, session_id: &str) -> AppResult<Vec<T>> {
        let key = format!("{}{}", CACHE_PREFIX_SESSION, session_id);
        let mut conn = self.connection.clone();
        let values: Vec<String> = conn.lrange(&key, 0, -1).await.map_err(cache_error)?;

        values
            .iter()
            .map(|json| {
                serde_json::from_str(json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })
            })
            .collect()
    }

    // =========================================================================
    // Rate Limiting Operations
    // =========================================================================

    /// Count a request in the current window.
    /// Returns (current_count, is_allowed).
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.connection.clone();

        let count: i64 = conn.incr(&key, 1).await.map_err(cache_error)?;
        if count == 1 {
            // First request opens the window
            let _: () = conn
                .expire(&key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        let count = count.max(0) as u64;
        Ok((count, count <= max_requests))
    }
}

/// LTRIM bounds keeping the last `max_len` entries of a list, at least one.
fn newest_range(max_len: usize) -> (isize, isize) {
    (-(max_len.max(1) as isize), -1)
}

fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_keys_are_scoped_by_school() {
        let school = Uuid::nil();
        assert_eq!(
            Cache::analytics_key(school, "school"),
            "analytics:00000000-0000-0000-0000-000000000000:school"
        );
        let teacher = Uuid::new_v4();
        assert!(Cache::analytics_key(school, &format!("teacher:{}", teacher))
            .ends_with(&teacher.to_string()));
    }

    #[test]
    fn trim_keeps_the_newest_entries() {
        assert_eq!(newest_range(50), (-50, -1));
        // LTRIM key 0 -1 would keep the whole list
        assert_eq!(newest_range(0), (-1, -1));
    }
}
