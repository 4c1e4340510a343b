//! Rolling per-`(handler, device, service)` value buffers backed by a
//! Redis-protocol store (a Valkey cluster in production). Lists are
//! LPUSH'd head-first and read back LRANGE'd then reversed, so callers see
//! values oldest-first.

pub mod memory;

use std::time::Duration;

use anomaly_common::{CoreError, CoreResult, StrategyStore};
use async_trait::async_trait;
use redis::AsyncCommands;

const REQUEST_DEADLINE: Duration = Duration::from_secs(5);

#[async_trait]
pub trait RollingValueStore: Send + Sync {
    /// Push `value` onto the head of `key`'s list and return up to
    /// `capacity` values, oldest-first. The list may transiently grow past
    /// `capacity` between stochastic trims.
    async fn push_and_range(
        &self,
        key: &str,
        value: serde_json::Value,
        capacity: usize,
    ) -> CoreResult<Vec<serde_json::Value>>;
}

pub struct RedisRollingStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisRollingStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    async fn with_deadline<T>(fut: impl std::future::Future<Output = redis::RedisResult<T>>) -> CoreResult<T> {
        match tokio::time::timeout(REQUEST_DEADLINE, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CoreError::retry(format!("rolling store rpc failed: {err}"))),
            Err(_) => Err(CoreError::retry("rolling store rpc timed out")),
        }
    }
}

#[async_trait]
impl RollingValueStore for RedisRollingStore {
    async fn push_and_range(
        &self,
        key: &str,
        value: serde_json::Value,
        capacity: usize,
    ) -> CoreResult<Vec<serde_json::Value>> {
        let encoded = serde_json::to_string(&value)
            .map_err(|e| CoreError::ignore(format!("unable to marshal value: {e}")))?;

        // lpush, the stochastic ltrim, and lrange share one 5s deadline,
        // same as a single context.WithTimeout reused across all three calls.
        let manager = self.manager.clone();
        let raw: Vec<String> = Self::with_deadline(async move {
            let mut conn = manager;
            conn.lpush::<_, _, ()>(key, encoded).await?;

            // Trim on average on every 5th call; the hot path tolerates a
            // transiently over-length list between trims.
            if rand::random::<u32>() % 5 == 0 {
                conn.ltrim::<_, ()>(key, 0, capacity as isize - 1).await?;
            }

            conn.lrange(key, 0, capacity as isize - 1).await
        })
        .await?;

        let mut values: Vec<serde_json::Value> = raw
            .into_iter()
            .map(|s| serde_json::from_str(&s))
            .collect::<Result<_, _>>()
            .map_err(|e| CoreError::ignore(format!("unable to unmarshal list from store: {e}")))?;
        values.reverse();
        Ok(values)
    }
}

#[async_trait]
impl StrategyStore for RedisRollingStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&value)?;
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, encoded).await?;
        Ok(())
    }
}
