use std::sync::Arc;

use anomaly_common::{AnomalyRecord, Notification, ReactionSink};
use async_trait::async_trait;
use device_repo_client::DeviceRepoClient;
use notifier_client::NotifierClient;

use crate::store::AnomalyStore;

/// Fetches the owning user's extended device record, sends a notification,
/// and persists a durable anomaly record. Both the notify and store steps
/// run even if one fails; their errors are joined rather than
/// short-circuited, mirroring `errors.Join` in the original.
pub struct AnomalyReactionSink {
    device_repo: Arc<dyn DeviceRepoClient>,
    notifier: Arc<dyn NotifierClient>,
    store: Arc<dyn AnomalyStore>,
    notification_topic: String,
    ignore_duplicates_within_seconds: i64,
}

impl AnomalyReactionSink {
    pub fn new(
        device_repo: Arc<dyn DeviceRepoClient>,
        notifier: Arc<dyn NotifierClient>,
        store: Arc<dyn AnomalyStore>,
        notification_topic: impl Into<String>,
        ignore_duplicates_within_seconds: i64,
    ) -> Self {
        Self {
            device_repo,
            notifier,
            store,
            notification_topic: notification_topic.into(),
            ignore_duplicates_within_seconds,
        }
    }

    async fn notify(&self, handler_name: &str, device_id: &str, service_id: &str, description: &str) -> anyhow::Result<()> {
        let device = self
            .device_repo
            .read_extended_device(device_id)
            .await
            .map_err(|e| anyhow::anyhow!("unable to get device id={device_id:?} err={e}"))?;
        let notification = Notification::anomaly(
            device.owner_id,
            handler_name,
            &device.display_name,
            &device.id,
            service_id,
            description,
            self.notification_topic.clone(),
        );
        self.notifier
            .notify(&notification, self.ignore_duplicates_within_seconds)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReactionSink for AnomalyReactionSink {
    async fn react(
        &self,
        handler_name: &str,
        device_id: &str,
        service_id: &str,
        description: &str,
        timestamp: i64,
    ) -> anyhow::Result<()> {
        let notify_result = self.notify(handler_name, device_id, service_id, description).await;
        let store_result = self
            .store
            .store_anomaly(AnomalyRecord {
                handler: handler_name.to_string(),
                device: device_id.to_string(),
                service: service_id.to_string(),
                description: description.to_string(),
                unix_timestamp: timestamp,
            })
            .await;

        match (notify_result, store_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(notify_err), Ok(())) => Err(notify_err.context("unable to notify")),
            (Ok(()), Err(store_err)) => Err(store_err.context("unable to store anomaly state")),
            (Err(notify_err), Err(store_err)) => Err(anyhow::anyhow!(
                "unable to notify: {notify_err}; unable to store anomaly state: {store_err}"
            )),
        }
    }
}
