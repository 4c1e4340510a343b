use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Detects anomalies in an ordered, oldest-first window of converted values.
///
/// Implementations must not panic in practice, but the pipeline wraps every
/// call in a panic barrier regardless: a caught panic becomes a structured
/// *ignore*.
#[async_trait]
pub trait AnomalyStrategy: Send + Sync {
    async fn detect(&self, ctx: &StrategyContext, values: &[serde_json::Value]) -> DetectOutcome;
}

/// Reacts to a detected anomaly: notifies a user and persists a durable
/// record. Implementations aggregate both failures rather than
/// short-circuiting on the first.
#[async_trait]
pub trait ReactionSink: Send + Sync {
    async fn react(
        &self,
        handler_name: &str,
        device_id: &str,
        service_id: &str,
        description: &str,
        timestamp: i64,
    ) -> anyhow::Result<()>;
}

/// Minimal key-value access a strategy may use for its own extra state
/// (running mean, stddev, counts, ...), namespaced under
/// `handlerstore_<name>_<device>_<service>_<field>`.
#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
}

pub struct StrategyContext {
    pub device_id: String,
    pub service_id: String,
    pub store: Arc<dyn StrategyStore>,
}

#[derive(Debug, Clone, Default)]
pub struct DetectOutcome {
    pub anomaly: bool,
    pub description: String,
}

/// Build the `handlerstore_<name>_<device>_<service>_<field>` sub-namespace key.
pub fn handler_store_key(handler: &str, device: &str, service: &str, field: &str) -> String {
    format!("handlerstore_{handler}_{device}_{service}_{field}")
}

/// Immutable, registry-scoped handler declaration. A `buffer_size` of 0
/// means "do not register" — the registry never stores such a spec.
#[derive(Clone)]
pub struct HandlerSpec {
    pub name: String,
    pub function_id: String,
    pub aspect_id: String,
    pub characteristic_id: String,
    pub buffer_size: usize,
    pub strategy: Arc<dyn AnomalyStrategy>,
}

impl std::fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("name", &self.name)
            .field("function_id", &self.function_id)
            .field("aspect_id", &self.aspect_id)
            .field("characteristic_id", &self.characteristic_id)
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Device {
    /// True iff the attribute list carries `attribute_key` with value
    /// `"true"` (case-insensitive, trimmed).
    pub fn has_true_attribute(&self, attribute_key: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.key == attribute_key && a.value.trim().eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Service {
    pub id: String,
    pub protocol_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Selectable {
    pub device: Device,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Protocol {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AspectNode {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Concept {
    pub id: String,
    #[serde(default)]
    pub characteristic_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Characteristic {
    pub id: String,
    #[serde(default)]
    pub sub_characteristics: Vec<Characteristic>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacteristicInfos {
    /// Every descendant characteristic (including roots), keyed by id.
    pub by_id: HashMap<String, Characteristic>,
    /// Maps a descendant characteristic id to the id of its tree's root.
    pub id_to_root_id: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConceptsInfos {
    pub concept_ids_by_characteristic_id: HashMap<String, Vec<String>>,
}

/// One handler's fully resolved routing state after a reload.
#[derive(Clone)]
pub struct RoutingEntry {
    pub spec: HandlerSpec,
    pub matches: Vec<Selectable>,
    pub aspect_node: AspectNode,
    pub protocols: HashMap<String, Protocol>,
}

#[derive(Clone, Default)]
pub struct RoutingTable {
    pub entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    /// The derived subscription topic set: one topic per distinct service id
    /// referenced in any entry's matches, transformed per [`service_id_to_topic`].
    pub fn topic_set(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .entries
            .iter()
            .flat_map(|e| e.matches.iter())
            .flat_map(|s| s.services.iter())
            .map(|svc| service_id_to_topic(&svc.id))
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }
}

/// Transform a service id into its bus topic: `#` and `:` become `_`.
/// Intentionally lossy — two distinct ids could collapse to one topic, but
/// the upstream id space disallows that collision in practice. Preserve this
/// exact mapping for wire compatibility.
pub fn service_id_to_topic(service_id: &str) -> String {
    service_id.replace('#', "_").replace(':', "_")
}

/// `(handler_name, device_id, service_id)` serialized for the rolling store.
pub fn buffer_key(handler_name: &str, device_id: &str, service_id: &str) -> String {
    format!("{handler_name}_{device_id}_{service_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub handler: String,
    pub device: String,
    pub service: String,
    pub description: String,
    pub unix_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub topic: String,
}

impl Notification {
    pub fn anomaly(
        user_id: impl Into<String>,
        handler_name: &str,
        device_display_name: &str,
        device_id: &str,
        service_id: &str,
        description: &str,
        topic: impl Into<String>,
    ) -> Self {
        Notification {
            user_id: user_id.into(),
            title: "Anomaly Detected".to_string(),
            message: format!(
                "{handler_name} anomaly detected for device {device_display_name} ({device_id}) in service {service_id}\ndesc: {description}\n"
            ),
            topic: topic.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtendedDevice {
    pub id: String,
    pub owner_id: String,
    pub display_name: String,
}

/// Inbound bus message, decoded JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub value: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct EventMessageWithTimestamp {
    pub event: EventMessage,
    pub timestamp: i64,
}

/// A raw record as delivered by the group-consumer, before JSON decoding.
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_encoding_replaces_hash_and_colon() {
        assert_eq!(
            service_id_to_topic("urn:infai:ses:service:s1"),
            "urn_infai_ses_service_s1"
        );
        assert_eq!(service_id_to_topic("a#b:c"), "a_b_c");
        assert_eq!(service_id_to_topic("plain"), "plain");
    }

    #[test]
    fn buffer_key_is_stable_for_same_tuple() {
        assert_eq!(buffer_key("h1", "d1", "s1"), "h1_d1_s1");
        assert_eq!(buffer_key("h1", "d1", "s1"), buffer_key("h1", "d1", "s1"));
    }

    #[test]
    fn attribute_match_is_case_insensitive_and_trimmed() {
        let device = Device {
            id: "d1".to_string(),
            attributes: vec![Attribute {
                key: "anomaly_detector".to_string(),
                value: "  TRUE  ".to_string(),
            }],
        };
        assert!(device.has_true_attribute("anomaly_detector"));
        assert!(!device.has_true_attribute("other_key"));
    }

    #[test]
    fn device_without_matching_attribute_is_excluded() {
        let device = Device {
            id: "d2".to_string(),
            attributes: vec![],
        };
        assert!(!device.has_true_attribute("anomaly_detector"));
    }

    #[test]
    fn routing_table_topic_set_is_sorted_and_deduped() {
        let make_entry = |services: Vec<&str>| RoutingEntry {
            spec: HandlerSpec {
                name: "h".to_string(),
                function_id: "f".to_string(),
                aspect_id: "a".to_string(),
                characteristic_id: "c".to_string(),
                buffer_size: 1,
                strategy: Arc::new(NoopStrategy),
            },
            matches: vec![Selectable {
                device: Device::default(),
                services: services
                    .into_iter()
                    .map(|id| Service {
                        id: id.to_string(),
                        protocol_id: "p".to_string(),
                    })
                    .collect(),
            }],
            aspect_node: AspectNode::default(),
            protocols: HashMap::new(),
        };
        let table = RoutingTable {
            entries: vec![make_entry(vec!["b", "a"]), make_entry(vec!["a"])],
        };
        assert_eq!(table.topic_set(), vec!["a".to_string(), "b".to_string()]);
    }

    struct NoopStrategy;
    #[async_trait]
    impl AnomalyStrategy for NoopStrategy {
        async fn detect(&self, _ctx: &StrategyContext, _values: &[serde_json::Value]) -> DetectOutcome {
            DetectOutcome::default()
        }
    }
}
