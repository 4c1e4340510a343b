use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anomaly_bus::EventOutput;
use anomaly_common::{
    buffer_key, CoreError, CoreResult, EventMessage, EventMessageWithTimestamp, ConsumerMessage, ReactionSink,
    RoutingTable, StrategyContext,
};
use anomaly_kv::RollingValueStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::marshal::MarshallerAdapter;

/// Decode -> route -> marshal -> buffer -> detect -> react. Reads the
/// routing table under a shared reader lock so a reload never blocks an
/// in-flight event for longer than the swap itself.
pub struct EventPipeline {
    routing_table: Arc<RwLock<RoutingTable>>,
    marshaller: Arc<MarshallerAdapter>,
    rolling_store: Arc<dyn RollingValueStore>,
    strategy_store: Arc<dyn anomaly_common::StrategyStore>,
    reaction: Arc<dyn ReactionSink>,
}

impl EventPipeline {
    pub fn new(
        routing_table: Arc<RwLock<RoutingTable>>,
        marshaller: Arc<MarshallerAdapter>,
        rolling_store: Arc<dyn RollingValueStore>,
        strategy_store: Arc<dyn anomaly_common::StrategyStore>,
        reaction: Arc<dyn ReactionSink>,
    ) -> Self {
        Self {
            routing_table,
            marshaller,
            rolling_store,
            strategy_store,
            reaction,
        }
    }

    pub async fn handle(&self, event: EventMessageWithTimestamp) -> CoreResult<()> {
        let table = self.routing_table.read().await;
        for entry in &table.entries {
            let Some(selectable) = entry.matches.iter().find(|m| m.device.id == event.event.device_id) else {
                continue;
            };
            let Some(service) = selectable.services.iter().find(|s| s.id == event.event.service_id) else {
                continue;
            };

            let marshalled = self
                .marshaller
                .marshal(
                    &event.event.value,
                    service,
                    &entry.spec.function_id,
                    &entry.aspect_node,
                    &entry.spec.characteristic_id,
                    &entry.protocols,
                )
                .await?;

            let key = buffer_key(&entry.spec.name, &event.event.device_id, &service.id);
            let values = self
                .rolling_store
                .push_and_range(&key, marshalled, entry.spec.buffer_size)
                .await?;

            if values.len() < entry.spec.buffer_size {
                continue;
            }

            let ctx = StrategyContext {
                device_id: event.event.device_id.clone(),
                service_id: service.id.clone(),
                store: self.strategy_store.clone(),
            };
            let outcome = detect_with_panic_barrier(entry.spec.strategy.as_ref(), &ctx, &values).await;

            if outcome.anomaly {
                self.reaction
                    .react(
                        &entry.spec.name,
                        &event.event.device_id,
                        &service.id,
                        &outcome.description,
                        event.timestamp,
                    )
                    .await
                    .map_err(|e| CoreError::ignore(format!("unable to react to anomaly: {e}")))?;
            }
        }
        Ok(())
    }
}

/// Runs a strategy's `detect` behind a panic barrier: any unwind becomes a
/// non-anomaly outcome rather than taking down the pipeline task.
async fn detect_with_panic_barrier(
    strategy: &(dyn anomaly_common::AnomalyStrategy),
    ctx: &StrategyContext,
    values: &[serde_json::Value],
) -> anomaly_common::DetectOutcome {
    // `detect` is async, so a panic inside it is caught by `catch_unwind`
    // only if polled to completion within this call; AssertUnwindSafe is
    // sound here because `ctx`/`values` are not mutated on panic.
    let fut = strategy.detect(ctx, values);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(&payload);
            tracing::error!(panic = %message, "strategy panicked during detect");
            anomaly_common::DetectOutcome {
                anomaly: false,
                description: String::new(),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

use futures::FutureExt;

/// Bridges the bus's [`EventOutput`] contract into the pipeline: decodes the
/// payload, substitutes a wall-clock timestamp when the bus supplied none.
pub struct PipelineOutput {
    pipeline: Arc<EventPipeline>,
}

impl PipelineOutput {
    pub fn new(pipeline: Arc<EventPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventOutput for PipelineOutput {
    async fn handle(&self, msg: ConsumerMessage) -> CoreResult<()> {
        let event: EventMessage = serde_json::from_slice(&msg.payload)
            .map_err(|e| CoreError::ignore(format!("unable to unmarshal event: {e}")))?;
        let timestamp = if msg.timestamp == 0 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        } else {
            msg.timestamp
        };
        self.pipeline
            .handle(EventMessageWithTimestamp { event, timestamp })
            .await
    }
}
