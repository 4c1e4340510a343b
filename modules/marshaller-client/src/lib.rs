pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{MarshallerError, Result};

use async_trait::async_trait;
use anomaly_common::{AspectNode, Protocol, Service};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
struct OutputPathsRequest<'a> {
    service: &'a Service,
    function_id: &'a str,
    aspect_node: &'a AspectNode,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputPathsResponse {
    #[serde(default)]
    paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct UnmarshalRequest<'a> {
    protocol: &'a Protocol,
    service: &'a Service,
    characteristic_id: &'a str,
    path: &'a str,
    raw_value: &'a serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait MarshallerClient: Send + Sync {
    async fn get_output_paths(
        &self,
        service: &Service,
        function_id: &str,
        aspect_node: &AspectNode,
    ) -> Result<Vec<String>>;

    async fn unmarshal(
        &self,
        protocol: &Protocol,
        service: &Service,
        characteristic_id: &str,
        path: &str,
        raw_value: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value>;
}

pub struct HttpMarshallerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarshallerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MarshallerClient for HttpMarshallerClient {
    async fn get_output_paths(
        &self,
        service: &Service,
        function_id: &str,
        aspect_node: &AspectNode,
    ) -> Result<Vec<String>> {
        let body = OutputPathsRequest {
            service,
            function_id,
            aspect_node,
        };
        let url = format!("{}/output-paths", self.base_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(MarshallerError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let parsed: OutputPathsResponse = resp.json().await?;
        Ok(parsed.paths)
    }

    async fn unmarshal(
        &self,
        protocol: &Protocol,
        service: &Service,
        characteristic_id: &str,
        path: &str,
        raw_value: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let body = UnmarshalRequest {
            protocol,
            service,
            characteristic_id,
            path,
            raw_value,
        };
        let url = format!("{}/unmarshal", self.base_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(MarshallerError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<serde_json::Value>().await?)
    }
}
