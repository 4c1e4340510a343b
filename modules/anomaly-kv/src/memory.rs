use std::collections::HashMap;
use std::sync::Mutex;

use anomaly_common::{CoreResult, StrategyStore};
use async_trait::async_trait;

use crate::RollingValueStore;

/// In-process stand-in for [`RedisRollingStore`](crate::RedisRollingStore),
/// used by pipeline tests. Keeps every pushed value, oldest-first, and never
/// trims past `capacity` when reading.
#[derive(Default)]
pub struct MemoryRollingStore {
    lists: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    kv: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryRollingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RollingValueStore for MemoryRollingStore {
    async fn push_and_range(
        &self,
        key: &str,
        value: serde_json::Value,
        capacity: usize,
    ) -> CoreResult<Vec<serde_json::Value>> {
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(key.to_string()).or_default();
        list.push(value);
        let start = list.len().saturating_sub(capacity);
        Ok(list[start..].to_vec())
    }
}

#[async_trait]
impl StrategyStore for MemoryRollingStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.kv.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        self.kv.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_values_oldest_first_once_capacity_is_reached() {
        let store = MemoryRollingStore::new();
        for i in 0..7u32 {
            store
                .push_and_range("h_d_s", serde_json::json!(i), 5)
                .await
                .unwrap();
        }
        let window = store.push_and_range("h_d_s", serde_json::json!(7), 5).await.unwrap();
        assert_eq!(window, vec![
            serde_json::json!(3),
            serde_json::json!(4),
            serde_json::json!(5),
            serde_json::json!(6),
            serde_json::json!(7),
        ]);
    }

    #[tokio::test]
    async fn below_capacity_returns_partial_window() {
        let store = MemoryRollingStore::new();
        store.push_and_range("h_d_s", serde_json::json!(0), 5).await.unwrap();
        let window = store.push_and_range("h_d_s", serde_json::json!(1), 5).await.unwrap();
        assert_eq!(window.len(), 2);
    }

    #[tokio::test]
    async fn strategy_store_roundtrips_values() {
        let store = MemoryRollingStore::new();
        assert!(store.get("k").await.unwrap().is_none());
        store.set("k", serde_json::json!({"mean": 3.5})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(serde_json::json!({"mean": 3.5})));
    }
}
