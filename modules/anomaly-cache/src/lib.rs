//! Read-through cache in front of the device repository, mirroring the
//! original `cache.Use(key, loader, ttl)` pattern: a cache miss runs the
//! loader, stores the result, and is returned; a signal invalidates
//! everything rather than individual keys.

use std::sync::Arc;
use std::time::Duration;

use anomaly_common::{Characteristic, CharacteristicInfos, Concept, ConceptsInfos};
use device_repo_client::DeviceRepoClient;
use moka::future::Cache;

pub struct MetadataCache {
    client: Arc<dyn DeviceRepoClient>,
    concepts: Cache<String, Concept>,
    concept_of_function: Cache<String, String>,
    characteristic_infos: Cache<(), Arc<CharacteristicInfos>>,
    concepts_infos: Cache<(), Arc<ConceptsInfos>>,
}

impl MetadataCache {
    pub fn new(client: Arc<dyn DeviceRepoClient>, ttl: Duration) -> Self {
        let build = || Cache::builder().time_to_live(ttl).build();
        Self {
            client,
            concepts: build(),
            concept_of_function: build(),
            characteristic_infos: build(),
            concepts_infos: build(),
        }
    }

    pub async fn get_concept(&self, concept_id: &str) -> anyhow::Result<Concept> {
        if let Some(hit) = self.concepts.get(concept_id).await {
            return Ok(hit);
        }
        let concept = self.client.get_concept(concept_id).await?;
        self.concepts.insert(concept_id.to_string(), concept.clone()).await;
        Ok(concept)
    }

    /// Mirrors the original's swallow-and-log-empty-string behavior on error:
    /// callers treat an empty concept id as "no constraint".
    pub async fn get_concept_id_of_function(&self, function_id: &str) -> String {
        if let Some(hit) = self.concept_of_function.get(function_id).await {
            return hit;
        }
        match self.client.get_function_concept_id(function_id).await {
            Ok(concept_id) => {
                self.concept_of_function
                    .insert(function_id.to_string(), concept_id.clone())
                    .await;
                concept_id
            }
            Err(err) => {
                tracing::error!(%function_id, error = %err, "unable to get concept of function");
                String::new()
            }
        }
    }

    pub async fn get_characteristic_infos(&self) -> anyhow::Result<Arc<CharacteristicInfos>> {
        if let Some(hit) = self.characteristic_infos.get(&()).await {
            return Ok(hit);
        }
        let roots = self.client.list_characteristics().await?;
        let infos = Arc::new(device_repo_client::flatten_characteristics(&roots));
        self.characteristic_infos.insert((), infos.clone()).await;
        Ok(infos)
    }

    pub async fn get_characteristic(&self, id: &str) -> anyhow::Result<Characteristic> {
        let infos = self.get_characteristic_infos().await?;
        infos
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("characteristic not found: {id}"))
    }

    pub async fn get_concepts_infos(&self) -> anyhow::Result<Arc<ConceptsInfos>> {
        if let Some(hit) = self.concepts_infos.get(&()).await {
            return Ok(hit);
        }
        let concepts = self.client.list_concepts().await?;
        let mut by_characteristic: std::collections::HashMap<String, Vec<String>> = Default::default();
        for concept in concepts {
            for characteristic_id in &concept.characteristic_ids {
                by_characteristic
                    .entry(characteristic_id.clone())
                    .or_default()
                    .push(concept.id.clone());
            }
        }
        let infos = Arc::new(ConceptsInfos {
            concept_ids_by_characteristic_id: by_characteristic,
        });
        self.concepts_infos.insert((), infos.clone()).await;
        Ok(infos)
    }

    /// Drop every cached entry. Called when a cache-invalidation signal
    /// arrives on one of the configured bus topics.
    pub async fn invalidate_all(&self) {
        self.concepts.invalidate_all();
        self.concept_of_function.invalidate_all();
        self.characteristic_infos.invalidate_all();
        self.concepts_infos.invalidate_all();
    }
}
