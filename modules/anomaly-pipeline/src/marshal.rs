use std::collections::HashMap;

use anomaly_cache::MetadataCache;
use anomaly_common::{CoreError, CoreResult, Protocol, Service};
use marshaller_client::MarshallerClient;

/// Resolves the output path and decodes a raw payload into the handler's
/// declared characteristic.
pub struct MarshallerAdapter {
    marshaller: std::sync::Arc<dyn MarshallerClient>,
    cache: std::sync::Arc<MetadataCache>,
}

impl MarshallerAdapter {
    pub fn new(marshaller: std::sync::Arc<dyn MarshallerClient>, cache: std::sync::Arc<MetadataCache>) -> Self {
        Self { marshaller, cache }
    }

    pub async fn marshal(
        &self,
        raw_value: &serde_json::Map<String, serde_json::Value>,
        service: &Service,
        function_id: &str,
        aspect_node: &anomaly_common::AspectNode,
        characteristic_id: &str,
        protocols: &HashMap<String, Protocol>,
    ) -> CoreResult<serde_json::Value> {
        let protocol = protocols
            .get(&service.protocol_id)
            .ok_or_else(|| CoreError::ignore(format!("unknown service protocol: {}", service.protocol_id)))?;

        // Reject an unknown characteristic locally before a network round trip.
        self.cache
            .get_characteristic(characteristic_id)
            .await
            .map_err(|e| CoreError::ignore(format!("unknown characteristic {characteristic_id}: {e}")))?;

        let paths = self
            .marshaller
            .get_output_paths(service, function_id, aspect_node)
            .await
            .map_err(|e| CoreError::ignore(format!("unable to resolve output paths: {e}")))?;

        if paths.len() > 1 {
            tracing::warn!(service = %service.id, ?paths, "only first path found by function id and aspect node is used for unmarshal");
        }
        let path = paths
            .first()
            .ok_or_else(|| CoreError::ignore("no output path found for criteria"))?;

        self.marshaller
            .unmarshal(protocol, service, characteristic_id, path, raw_value)
            .await
            .map_err(|e| CoreError::ignore(format!("unable to unmarshal: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_common::AspectNode;
    use device_repo_client::memory::MemoryDeviceRepoClient;
    use marshaller_client::memory::MemoryMarshallerClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn protocols() -> HashMap<String, Protocol> {
        let mut map = HashMap::new();
        map.insert(
            "p1".to_string(),
            Protocol {
                id: "p1".to_string(),
                name: "mqtt".to_string(),
            },
        );
        map
    }

    #[tokio::test]
    async fn unknown_protocol_is_ignored() {
        let repo: Arc<dyn device_repo_client::DeviceRepoClient> = Arc::new(
            MemoryDeviceRepoClient::new().with_characteristic(anomaly_common::Characteristic {
                id: "c1".to_string(),
                sub_characteristics: vec![],
            }),
        );
        let cache = Arc::new(MetadataCache::new(repo, Duration::from_secs(60)));
        let marshaller: Arc<dyn MarshallerClient> = Arc::new(MemoryMarshallerClient::new());
        let adapter = MarshallerAdapter::new(marshaller, cache);
        let service = Service {
            id: "s1".to_string(),
            protocol_id: "unknown".to_string(),
        };
        let result = adapter
            .marshal(
                &serde_json::Map::new(),
                &service,
                "f1",
                &AspectNode::default(),
                "c1",
                &protocols(),
            )
            .await;
        assert!(result.unwrap_err().is_ignore());
    }

    #[tokio::test]
    async fn resolves_path_and_decodes_value() {
        let repo: Arc<dyn device_repo_client::DeviceRepoClient> = Arc::new(
            MemoryDeviceRepoClient::new().with_characteristic(anomaly_common::Characteristic {
                id: "c1".to_string(),
                sub_characteristics: vec![],
            }),
        );
        let cache = Arc::new(MetadataCache::new(repo, Duration::from_secs(60)));
        let marshaller: Arc<dyn MarshallerClient> =
            Arc::new(MemoryMarshallerClient::new().with_output_path("f1", "a1", "value"));
        let adapter = MarshallerAdapter::new(marshaller, cache);
        let service = Service {
            id: "s1".to_string(),
            protocol_id: "p1".to_string(),
        };
        let mut raw = serde_json::Map::new();
        raw.insert("value".to_string(), serde_json::json!(42));
        let aspect_node = AspectNode {
            id: "a1".to_string(),
            parent_id: None,
        };
        let result = adapter
            .marshal(&raw, &service, "f1", &aspect_node, "c1", &protocols())
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!(42));
    }

    #[tokio::test]
    async fn unknown_characteristic_is_ignored() {
        let repo: Arc<dyn device_repo_client::DeviceRepoClient> = Arc::new(MemoryDeviceRepoClient::new());
        let cache = Arc::new(MetadataCache::new(repo, Duration::from_secs(60)));
        let marshaller: Arc<dyn MarshallerClient> = Arc::new(MemoryMarshallerClient::new());
        let adapter = MarshallerAdapter::new(marshaller, cache);
        let service = Service {
            id: "s1".to_string(),
            protocol_id: "p1".to_string(),
        };
        let result = adapter
            .marshal(
                &serde_json::Map::new(),
                &service,
                "f1",
                &AspectNode::default(),
                "missing",
                &protocols(),
            )
            .await;
        assert!(result.unwrap_err().is_ignore());
    }
}
