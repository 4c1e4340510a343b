use std::sync::Mutex;

use anomaly_common::AnomalyRecord;
use async_trait::async_trait;

use crate::store::AnomalyStore;

#[derive(Default)]
pub struct MemoryAnomalyStore {
    records: Mutex<Vec<AnomalyRecord>>,
}

impl MemoryAnomalyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AnomalyRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnomalyStore for MemoryAnomalyStore {
    async fn store_anomaly(&self, record: AnomalyRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}
