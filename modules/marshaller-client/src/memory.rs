use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use anomaly_common::{AspectNode, Protocol, Service};

use crate::{MarshallerClient, MarshallerError, Result};

/// Looks up output paths by `(function_id, aspect_id)` from a fixed table and
/// unmarshals by taking `raw_value[path]` verbatim — good enough for pipeline
/// tests that don't exercise real protocol-specific decoding.
#[derive(Default)]
pub struct MemoryMarshallerClient {
    paths: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl MemoryMarshallerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_path(
        self,
        function_id: impl Into<String>,
        aspect_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.paths
            .write()
            .unwrap()
            .entry((function_id.into(), aspect_id.into()))
            .or_default()
            .push(path.into());
        self
    }
}

#[async_trait]
impl MarshallerClient for MemoryMarshallerClient {
    async fn get_output_paths(
        &self,
        _service: &Service,
        function_id: &str,
        aspect_node: &AspectNode,
    ) -> Result<Vec<String>> {
        let key = (function_id.to_string(), aspect_node.id.clone());
        Ok(self.paths.read().unwrap().get(&key).cloned().unwrap_or_default())
    }

    async fn unmarshal(
        &self,
        _protocol: &Protocol,
        _service: &Service,
        _characteristic_id: &str,
        path: &str,
        raw_value: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value> {
        raw_value
            .get(path)
            .cloned()
            .ok_or_else(|| MarshallerError::Parse(format!("missing field `{path}` in raw value")))
    }
}
