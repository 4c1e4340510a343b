use std::sync::Mutex;

use async_trait::async_trait;
use anomaly_common::Notification;

use crate::{NotifierClient, Result};

/// Records every notification it's asked to send, for assertions in tests.
#[derive(Default)]
pub struct MemoryNotifierClient {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifierClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierClient for MemoryNotifierClient {
    async fn notify(&self, notification: &Notification, _ignore_duplicates_within_seconds: i64) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
