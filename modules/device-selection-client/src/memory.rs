use std::sync::RwLock;

use async_trait::async_trait;
use anomaly_common::Selectable;

use crate::{DeviceGroupFilterCriteria, DeviceSelectionClient, Result};

/// Returns a fixed selectable list regardless of the query, for tests that
/// only care about downstream routing-table construction.
#[derive(Default)]
pub struct MemoryDeviceSelectionClient {
    selectables: RwLock<Vec<Selectable>>,
}

impl MemoryDeviceSelectionClient {
    pub fn new(selectables: Vec<Selectable>) -> Self {
        Self {
            selectables: RwLock::new(selectables),
        }
    }
}

#[async_trait]
impl DeviceSelectionClient for MemoryDeviceSelectionClient {
    async fn get_selectables(
        &self,
        _criteria: DeviceGroupFilterCriteria,
        attribute_key: &str,
    ) -> Result<Vec<Selectable>> {
        Ok(self
            .selectables
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.device.has_true_attribute(attribute_key))
            .cloned()
            .collect())
    }
}
