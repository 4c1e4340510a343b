use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use anomaly_common::{AspectNode, Characteristic, Concept, ExtendedDevice, Protocol};

use crate::{DeviceRepoClient, DeviceRepoError, Result};

/// In-memory stand-in for [`HttpDeviceRepoClient`](crate::HttpDeviceRepoClient), used by
/// downstream crates' tests instead of wiring up a real device repository.
#[derive(Default)]
pub struct MemoryDeviceRepoClient {
    protocols: RwLock<Vec<Protocol>>,
    aspect_nodes: RwLock<HashMap<String, AspectNode>>,
    concepts: RwLock<HashMap<String, Concept>>,
    function_concepts: RwLock<HashMap<String, String>>,
    characteristics: RwLock<Vec<Characteristic>>,
    devices: RwLock<HashMap<String, ExtendedDevice>>,
}

impl MemoryDeviceRepoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(self, protocol: Protocol) -> Self {
        self.protocols.write().unwrap().push(protocol);
        self
    }

    pub fn with_aspect_node(self, node: AspectNode) -> Self {
        self.aspect_nodes.write().unwrap().insert(node.id.clone(), node);
        self
    }

    pub fn with_concept(self, concept: Concept) -> Self {
        self.concepts.write().unwrap().insert(concept.id.clone(), concept);
        self
    }

    pub fn with_function_concept(self, function_id: impl Into<String>, concept_id: impl Into<String>) -> Self {
        self.function_concepts
            .write()
            .unwrap()
            .insert(function_id.into(), concept_id.into());
        self
    }

    pub fn with_characteristic(self, characteristic: Characteristic) -> Self {
        self.characteristics.write().unwrap().push(characteristic);
        self
    }

    pub fn with_device(self, device: ExtendedDevice) -> Self {
        self.devices.write().unwrap().insert(device.id.clone(), device);
        self
    }
}

#[async_trait]
impl DeviceRepoClient for MemoryDeviceRepoClient {
    async fn list_protocols(&self) -> Result<Vec<Protocol>> {
        Ok(self.protocols.read().unwrap().clone())
    }

    async fn get_aspect_node(&self, aspect_id: &str) -> Result<AspectNode> {
        self.aspect_nodes
            .read()
            .unwrap()
            .get(aspect_id)
            .cloned()
            .ok_or_else(|| DeviceRepoError::NotFound(aspect_id.to_string()))
    }

    async fn get_concept(&self, concept_id: &str) -> Result<Concept> {
        self.concepts
            .read()
            .unwrap()
            .get(concept_id)
            .cloned()
            .ok_or_else(|| DeviceRepoError::NotFound(concept_id.to_string()))
    }

    async fn get_function_concept_id(&self, function_id: &str) -> Result<String> {
        self.function_concepts
            .read()
            .unwrap()
            .get(function_id)
            .cloned()
            .ok_or_else(|| DeviceRepoError::NotFound(function_id.to_string()))
    }

    async fn list_concepts(&self) -> Result<Vec<Concept>> {
        Ok(self.concepts.read().unwrap().values().cloned().collect())
    }

    async fn list_characteristics(&self) -> Result<Vec<Characteristic>> {
        Ok(self.characteristics.read().unwrap().clone())
    }

    async fn read_extended_device(&self, device_id: &str) -> Result<ExtendedDevice> {
        self.devices
            .read()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or_else(|| DeviceRepoError::NotFound(device_id.to_string()))
    }
}
