//! Shared handler state.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{Cache, Database};
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub cache: Arc<Cache>,
    pub database: Arc<Database>,
    pub analytics_ttl: u64,
    pub chat_history_ttl: u64,
}

impl AppState {
    /// Build every service over the database connection.
    pub fn from_config(database: Arc<Database>, cache: Arc<Cache>, config: Config) -> Self {
        let analytics_ttl = config.analytics_cache_ttl_seconds;
        let chat_history_ttl = config.chat_history_ttl_seconds;
        let services = Arc::new(Services::from_connection(database.get_connection(), config));

        Self::new(services, cache, database, analytics_ttl, chat_history_ttl)
    }

    pub fn new(
        services: Arc<Services>,
        cache: Arc<Cache>,
        database: Arc<Database>,
        analytics_ttl: u64,
        chat_history_ttl: u64,
    ) -> Self {
        Self {
            services,
            cache,
            database,
            analytics_ttl,
            chat_history_ttl,
        }
    }

    /// Serve `key` from the cache, or compute it with `load` and store it
    /// for `analytics_ttl` seconds.
    ///
    /// Cache failures degrade to computing the value.
    pub async fn cached<T, Fut>(&self, key: String, load: Fut) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.cache.get::<T>(&key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed"),
        }

        let value = load.await?;
        if let Err(e) = self.cache.set_with_ttl(&key, &value, self.analytics_ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
        Ok(value)
    }
}
