pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{NotifierError, Result};

use std::time::Duration;

use async_trait::async_trait;
use anomaly_common::Notification;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait NotifierClient: Send + Sync {
    async fn notify(&self, notification: &Notification, ignore_duplicates_within_seconds: i64) -> Result<()>;
}

pub struct HttpNotifierClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifierClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl NotifierClient for HttpNotifierClient {
    async fn notify(&self, notification: &Notification, ignore_duplicates_within_seconds: i64) -> Result<()> {
        let url = format!(
            "{}/notifications?ignore_duplicates_within_seconds={}",
            self.base_url, ignore_duplicates_within_seconds
        );
        tracing::debug!(user_id = %notification.user_id, %url, "sending anomaly notification");
        let resp = self.client.post(&url).json(notification).send().await?;
        let status = resp.status();
        if status.as_u16() >= 300 {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "unexpected response status from notifier");
            return Err(NotifierError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
