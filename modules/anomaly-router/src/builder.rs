use std::collections::HashMap;
use std::sync::Arc;

use anomaly_common::{AspectNode, HandlerSpec, Protocol, RoutingEntry, RoutingTable, Selectable};
use device_repo_client::DeviceRepoClient;
use device_selection_client::{DeviceGroupFilterCriteria, DeviceSelectionClient};

pub struct RoutingTableBuilder {
    device_repo: Arc<dyn DeviceRepoClient>,
    device_selection: Arc<dyn DeviceSelectionClient>,
    anomaly_detector_attribute: String,
}

impl RoutingTableBuilder {
    pub fn new(
        device_repo: Arc<dyn DeviceRepoClient>,
        device_selection: Arc<dyn DeviceSelectionClient>,
        anomaly_detector_attribute: impl Into<String>,
    ) -> Self {
        Self {
            device_repo,
            device_selection,
            anomaly_detector_attribute: anomaly_detector_attribute.into(),
        }
    }

    /// Deterministic, single-shot build against the handler list snapshot
    /// taken by the caller. The protocol list is fetched once and shared
    /// across every entry.
    pub async fn build(&self, specs: Vec<HandlerSpec>) -> anyhow::Result<RoutingTable> {
        let protocols: HashMap<String, Protocol> = self
            .device_repo
            .list_protocols()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let entry = self.build_entry(spec, &protocols).await?;
            entries.push(entry);
        }
        Ok(RoutingTable { entries })
    }

    async fn build_entry(
        &self,
        spec: HandlerSpec,
        protocols: &HashMap<String, Protocol>,
    ) -> anyhow::Result<RoutingEntry> {
        let criteria = DeviceGroupFilterCriteria::event(spec.function_id.clone(), spec.aspect_id.clone());
        let selectables = self
            .device_selection
            .get_selectables(criteria, &self.anomaly_detector_attribute)
            .await?;

        let matches: Vec<Selectable> = selectables
            .into_iter()
            .filter(|s| s.device.has_true_attribute(&self.anomaly_detector_attribute))
            .collect();

        let aspect_node: AspectNode = self.device_repo.get_aspect_node(&spec.aspect_id).await?;

        Ok(RoutingEntry {
            spec,
            matches,
            aspect_node,
            protocols: protocols.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_common::{AnomalyStrategy, Attribute, DetectOutcome, Device, Service, StrategyContext};
    use async_trait::async_trait;
    use device_repo_client::memory::MemoryDeviceRepoClient;
    use device_selection_client::memory::MemoryDeviceSelectionClient;

    struct NoopStrategy;
    #[async_trait]
    impl AnomalyStrategy for NoopStrategy {
        async fn detect(&self, _ctx: &StrategyContext, _values: &[serde_json::Value]) -> DetectOutcome {
            DetectOutcome::default()
        }
    }

    fn spec(name: &str) -> HandlerSpec {
        HandlerSpec {
            name: name.to_string(),
            function_id: "f1".to_string(),
            aspect_id: "a1".to_string(),
            characteristic_id: "c1".to_string(),
            buffer_size: 5,
            strategy: Arc::new(NoopStrategy),
        }
    }

    fn selectable(device_id: &str, has_attribute: bool, service_ids: &[&str]) -> Selectable {
        let attributes = if has_attribute {
            vec![Attribute {
                key: "anomaly_detector".to_string(),
                value: "true".to_string(),
            }]
        } else {
            vec![]
        };
        Selectable {
            device: Device {
                id: device_id.to_string(),
                attributes,
            },
            services: service_ids
                .iter()
                .map(|id| Service {
                    id: id.to_string(),
                    protocol_id: "p1".to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn entries_exclude_devices_without_the_attribute() {
        let device_repo: Arc<dyn DeviceRepoClient> = Arc::new(
            MemoryDeviceRepoClient::new().with_aspect_node(AspectNode {
                id: "a1".to_string(),
                parent_id: None,
            }),
        );
        let selection: Arc<dyn DeviceSelectionClient> = Arc::new(MemoryDeviceSelectionClient::new(vec![
            selectable("d1", true, &["s1"]),
            selectable("d2", false, &["s2"]),
        ]));
        let builder = RoutingTableBuilder::new(device_repo, selection, "anomaly_detector");
        let table = builder.build(vec![spec("h1")]).await.unwrap();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].matches.len(), 1);
        assert_eq!(table.entries[0].matches[0].device.id, "d1");
    }

    #[tokio::test]
    async fn handler_with_no_matches_still_produces_an_entry() {
        let device_repo: Arc<dyn DeviceRepoClient> = Arc::new(
            MemoryDeviceRepoClient::new().with_aspect_node(AspectNode {
                id: "a1".to_string(),
                parent_id: None,
            }),
        );
        let selection: Arc<dyn DeviceSelectionClient> = Arc::new(MemoryDeviceSelectionClient::new(vec![]));
        let builder = RoutingTableBuilder::new(device_repo, selection, "anomaly_detector");
        let table = builder.build(vec![spec("h1")]).await.unwrap();
        assert_eq!(table.entries.len(), 1);
        assert!(table.entries[0].matches.is_empty());
        assert!(table.topic_set().is_empty());
    }
}
