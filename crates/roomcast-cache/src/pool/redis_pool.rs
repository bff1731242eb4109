//! Pooled Redis connections for publishing.
//!
//! The subscriber keeps its own dedicated connection; this pool serves
//! `PUBLISH` and health checks only.

use deadpool_redis::{Config, Pool, Runtime};
use roomcast_common::RedisConfig;

/// Pool settings
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&RedisConfig> for RedisPoolConfig {
    fn from(config: &RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("cannot build Redis pool: {0}")]
    CreatePool(String),

    #[error("no Redis connection available: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("event encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Strip credentials from a Redis URL before it is logged
pub(crate) fn redact_url(url: &str) -> &str {
    url.split('@').next_back().unwrap_or(url)
}

#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    /// Build the pool. Connections are opened lazily on first use.
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        tracing::debug!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Redis pool built"
        );

        Ok(Self { pool })
    }

    pub fn from_config(config: &RedisConfig) -> RedisResult<Self> {
        Self::new(RedisPoolConfig::from(config))
    }

    /// Build the pool and make sure Redis answers before returning it
    pub async fn connect(config: &RedisConfig) -> RedisResult<Self> {
        let pool = Self::from_config(config)?;
        pool.health_check().await?;
        tracing::info!(url = %redact_url(&config.url), "Redis reachable");
        Ok(pool)
    }

    pub async fn get(&self) -> RedisResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// `PING` over a pooled connection
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
