pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{DeviceRepoError, Result};

use async_trait::async_trait;
use anomaly_common::{AspectNode, Characteristic, CharacteristicInfos, Concept, ExtendedDevice, Protocol};

/// Everything the core needs from the device repository. Kept narrow on
/// purpose — the repository's own domain (devices, functions, aspects,
/// characteristics) is owned and implemented externally.
#[async_trait]
pub trait DeviceRepoClient: Send + Sync {
    async fn list_protocols(&self) -> Result<Vec<Protocol>>;
    async fn get_aspect_node(&self, aspect_id: &str) -> Result<AspectNode>;
    async fn get_concept(&self, concept_id: &str) -> Result<Concept>;
    async fn get_function_concept_id(&self, function_id: &str) -> Result<String>;
    async fn list_concepts(&self) -> Result<Vec<Concept>>;
    async fn list_characteristics(&self) -> Result<Vec<Characteristic>>;
    async fn read_extended_device(&self, device_id: &str) -> Result<ExtendedDevice>;
}

/// Flatten a characteristic tree (pre-order), recording the root id for every
/// descendant. Shared by the HTTP client and the in-memory fake so both
/// produce identical `CharacteristicInfos` for the same input tree.
pub fn flatten_characteristics(roots: &[Characteristic]) -> CharacteristicInfos {
    let mut infos = CharacteristicInfos::default();
    for root in roots {
        flatten_into(root, &root.id, &mut infos, true);
    }
    infos
}

fn flatten_into(node: &Characteristic, root_id: &str, infos: &mut CharacteristicInfos, is_root: bool) {
    infos.by_id.insert(node.id.clone(), node.clone());
    if !is_root {
        infos.id_to_root_id.insert(node.id.clone(), root_id.to_string());
    }
    for child in &node.sub_characteristics {
        flatten_into(child, root_id, infos, false);
    }
}

pub struct HttpDeviceRepoClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeviceRepoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeviceRepoError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl DeviceRepoClient for HttpDeviceRepoClient {
    async fn list_protocols(&self) -> Result<Vec<Protocol>> {
        self.get_json("/protocols?limit=9999&offset=0&sort=name.asc").await
    }

    async fn get_aspect_node(&self, aspect_id: &str) -> Result<AspectNode> {
        self.get_json(&format!("/aspect-nodes/{aspect_id}")).await
    }

    async fn get_concept(&self, concept_id: &str) -> Result<Concept> {
        self.get_json(&format!("/concepts/{concept_id}")).await
    }

    async fn get_function_concept_id(&self, function_id: &str) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct FunctionResp {
            concept_id: String,
        }
        let resp: FunctionResp = self.get_json(&format!("/functions/{function_id}")).await?;
        Ok(resp.concept_id)
    }

    async fn list_concepts(&self) -> Result<Vec<Concept>> {
        self.get_json("/concepts?limit=99999").await
    }

    async fn list_characteristics(&self) -> Result<Vec<Characteristic>> {
        self.get_json("/characteristics?limit=99999").await
    }

    async fn read_extended_device(&self, device_id: &str) -> Result<ExtendedDevice> {
        self.get_json(&format!("/devices/{device_id}?as=extended")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_common::Characteristic;

    fn characteristic(id: &str, children: Vec<Characteristic>) -> Characteristic {
        Characteristic {
            id: id.to_string(),
            sub_characteristics: children,
        }
    }

    #[test]
    fn flatten_includes_root_and_every_descendant() {
        let tree = characteristic(
            "root",
            vec![
                characteristic("child-a", vec![characteristic("grandchild", vec![])]),
                characteristic("child-b", vec![]),
            ],
        );
        let infos = flatten_characteristics(&[tree]);
        assert_eq!(infos.by_id.len(), 4);
        assert!(infos.by_id.contains_key("root"));
        assert!(infos.by_id.contains_key("grandchild"));
        assert_eq!(infos.id_to_root_id.get("grandchild"), Some(&"root".to_string()));
        assert_eq!(infos.id_to_root_id.get("child-b"), Some(&"root".to_string()));
        assert!(!infos.id_to_root_id.contains_key("root"));
    }
}
