//! The literal worked scenario: buffer size 5, function f1/aspect a1/characteristic c1,
//! device d1 opted in via `anomaly_detector = "true"`, device d2 opted out, service s1
//! under protocol p1, values 0..=19 converted 10x by the marshaller, anomaly iff 100 is
//! in the window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anomaly_cache::MetadataCache;
use anomaly_common::{
    AnomalyStrategy, AspectNode, Attribute, Characteristic, DetectOutcome, Device, EventMessage,
    EventMessageWithTimestamp, HandlerSpec, Protocol, ReactionSink, RoutingEntry, RoutingTable, Selectable, Service,
    StrategyContext,
};
use anomaly_kv::memory::MemoryRollingStore;
use anomaly_pipeline::marshal::MarshallerAdapter;
use anomaly_pipeline::pipeline::EventPipeline;
use async_trait::async_trait;
use device_repo_client::memory::MemoryDeviceRepoClient;
use marshaller_client::memory::MemoryMarshallerClient;
use tokio::sync::RwLock;

struct ContainsOneHundred;
#[async_trait]
impl AnomalyStrategy for ContainsOneHundred {
    async fn detect(&self, _ctx: &StrategyContext, values: &[serde_json::Value]) -> DetectOutcome {
        let anomaly = values.iter().any(|v| v == &serde_json::json!(100));
        DetectOutcome {
            anomaly,
            description: if anomaly { "100 in window".to_string() } else { String::new() },
        }
    }
}

#[derive(Default)]
struct RecordingReaction {
    calls: std::sync::Mutex<Vec<String>>,
}
#[async_trait]
impl ReactionSink for RecordingReaction {
    async fn react(
        &self,
        _handler_name: &str,
        device_id: &str,
        _service_id: &str,
        _description: &str,
        _timestamp: i64,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(device_id.to_string());
        Ok(())
    }
}

fn device(id: &str, opted_in: bool) -> Device {
    Device {
        id: id.to_string(),
        attributes: if opted_in {
            vec![Attribute {
                key: "anomaly_detector".to_string(),
                value: "true".to_string(),
            }]
        } else {
            vec![]
        },
    }
}

fn event(device_id: &str, raw_value: i64) -> EventMessageWithTimestamp {
    let mut raw = serde_json::Map::new();
    raw.insert("value".to_string(), serde_json::json!(raw_value));
    EventMessageWithTimestamp {
        event: EventMessage {
            device_id: device_id.to_string(),
            service_id: "s1".to_string(),
            value: raw,
        },
        timestamp: 1_700_000_000,
    }
}

#[tokio::test]
async fn warm_up_sliding_windows_and_device_opt_out() {
    let repo: Arc<dyn device_repo_client::DeviceRepoClient> = Arc::new(
        MemoryDeviceRepoClient::new().with_characteristic(Characteristic {
            id: "c1".to_string(),
            sub_characteristics: vec![],
        }),
    );
    let cache = Arc::new(MetadataCache::new(repo, Duration::from_secs(60)));
    let marshaller_client: Arc<dyn marshaller_client::MarshallerClient> =
        Arc::new(MemoryMarshallerClient::new().with_output_path("f1", "a1", "value"));
    let marshaller = Arc::new(MarshallerAdapter::new(marshaller_client, cache));
    let rolling_store = Arc::new(MemoryRollingStore::new());
    let reaction = Arc::new(RecordingReaction::default());

    let mut protocols = HashMap::new();
    protocols.insert(
        "p1".to_string(),
        Protocol {
            id: "p1".to_string(),
            name: "mqtt".to_string(),
        },
    );

    let entry = RoutingEntry {
        spec: HandlerSpec {
            name: "h1".to_string(),
            function_id: "f1".to_string(),
            aspect_id: "a1".to_string(),
            characteristic_id: "c1".to_string(),
            buffer_size: 5,
            strategy: Arc::new(ContainsOneHundred),
        },
        matches: vec![
            Selectable {
                device: device("d1", true),
                services: vec![Service {
                    id: "s1".to_string(),
                    protocol_id: "p1".to_string(),
                }],
            },
            Selectable {
                device: device("d2", false),
                services: vec![Service {
                    id: "s1".to_string(),
                    protocol_id: "p1".to_string(),
                }],
            },
        ],
        aspect_node: AspectNode {
            id: "a1".to_string(),
            parent_id: None,
        },
        protocols,
    };

    let table = Arc::new(RwLock::new(RoutingTable { entries: vec![entry] }));
    let pipeline = EventPipeline::new(table, marshaller, rolling_store.clone(), rolling_store, reaction.clone());

    for raw in 0..20i64 {
        pipeline.handle(event("d1", raw * 10)).await.unwrap();
        pipeline.handle(event("d2", raw * 10)).await.unwrap();
    }

    // d2 carries no anomaly_detector attribute -> excluded from matches entirely.
    let calls = reaction.calls.lock().unwrap();
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(|device_id| device_id == "d1"));
}
