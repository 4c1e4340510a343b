pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{DeviceSelectionError, Result};

use async_trait::async_trait;
use anomaly_common::Selectable;
use serde::Serialize;

/// One `interaction x function x aspect` filter clause. The service only
/// ever issues `EVENT` interaction queries.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceGroupFilterCriteria {
    pub interaction: &'static str,
    pub function_id: String,
    pub aspect_id: String,
}

impl DeviceGroupFilterCriteria {
    pub fn event(function_id: impl Into<String>, aspect_id: impl Into<String>) -> Self {
        Self {
            interaction: "event",
            function_id: function_id.into(),
            aspect_id: aspect_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GetSelectablesRequest {
    filter: Vec<DeviceGroupFilterCriteria>,
    include_groups: bool,
    include_imports: bool,
    include_devices: bool,
    filter_by_device_attribute_keys: Vec<String>,
}

#[async_trait]
pub trait DeviceSelectionClient: Send + Sync {
    /// Devices-only selectables matching the given criteria, further
    /// restricted to devices carrying `attribute_key`. Groups and imports
    /// are always excluded.
    async fn get_selectables(
        &self,
        criteria: DeviceGroupFilterCriteria,
        attribute_key: &str,
    ) -> Result<Vec<Selectable>>;
}

pub struct HttpDeviceSelectionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeviceSelectionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DeviceSelectionClient for HttpDeviceSelectionClient {
    async fn get_selectables(
        &self,
        criteria: DeviceGroupFilterCriteria,
        attribute_key: &str,
    ) -> Result<Vec<Selectable>> {
        let body = GetSelectablesRequest {
            filter: vec![criteria],
            include_groups: false,
            include_imports: false,
            include_devices: true,
            filter_by_device_attribute_keys: vec![attribute_key.to_string()],
        };
        let url = format!("{}/selectables", self.base_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DeviceSelectionError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<Vec<Selectable>>().await?)
    }
}
