//! Managed group-consumer wrapper: topic reconfiguration sorts the new topic
//! list, no-ops if it is unchanged and the consumer is already running, and
//! otherwise fully drains the old consumer before starting a new one at the
//! latest offset.

use std::sync::Arc;

use anomaly_common::{ConsumerMessage, CoreError, CoreResult};
use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::ClientConfig;
use rdkafka::Message;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

#[async_trait]
pub trait EventOutput: Send + Sync {
    async fn handle(&self, msg: ConsumerMessage) -> CoreResult<()>;
}

pub trait BusErrorHandler: Send + Sync {
    fn on_error(&self, topic: &str, error: &str);
}

struct RunningConsumer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Inner {
    topics: Vec<String>,
    stopped: bool,
    running: Option<RunningConsumer>,
}

/// `Created -> Running <-> Reconfiguring -> Running | Stopped`. `Stop` is
/// terminal: subsequent `update_topics` calls are ignored.
pub struct ManagedConsumer {
    kafka_url: String,
    consumer_group: String,
    inner: Mutex<Inner>,
}

impl ManagedConsumer {
    pub fn new(kafka_url: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            kafka_url: kafka_url.into(),
            consumer_group: consumer_group.into(),
            inner: Mutex::new(Inner {
                topics: Vec::new(),
                stopped: false,
                running: None,
            }),
        }
    }

    /// Sort `new_topics`; if the consumer is running with the same sorted
    /// list, do nothing. Otherwise stop-drain the old consumer (if any) and
    /// start a fresh one. On failure to start, the topic list is cleared so
    /// the next call is forced to retry a (re)start.
    pub async fn update_topics(
        &self,
        mut new_topics: Vec<String>,
        output: Arc<dyn EventOutput>,
        on_error: Arc<dyn BusErrorHandler>,
    ) -> anyhow::Result<()> {
        new_topics.sort();
        let mut inner = self.inner.lock().await;
        if inner.stopped {
            tracing::warn!("consumer is stopped, ignoring update_topics");
            return Ok(());
        }
        if inner.running.is_some() && inner.topics == new_topics {
            tracing::debug!("no topic changes -> continue with current consumer");
            return Ok(());
        }

        Self::stop_locked(&mut inner).await;

        if new_topics.len() <= 20 {
            tracing::info!(topics = ?new_topics, "update consumer topics");
        } else {
            tracing::info!(topic_count = new_topics.len(), "update consumer topics");
        }

        match self.start(new_topics.clone(), output, on_error).await {
            Ok(running) => {
                inner.running = Some(running);
                inner.topics = new_topics;
                Ok(())
            }
            Err(err) => {
                inner.topics.clear();
                Err(err)
            }
        }
    }

    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_locked(&mut inner).await;
        inner.stopped = true;
    }

    async fn stop_locked(inner: &mut Inner) {
        if let Some(running) = inner.running.take() {
            tracing::info!("stop consumer");
            let _ = running.shutdown.send(());
            let _ = running.task.await;
        }
    }

    async fn start(
        &self,
        topics: Vec<String>,
        output: Arc<dyn EventOutput>,
        on_error: Arc<dyn BusErrorHandler>,
    ) -> anyhow::Result<RunningConsumer> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.kafka_url)
            .set("group.id", &self.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .create()?;
        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topic_refs)?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut stream = consumer.stream();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    msg = stream.next() => {
                        let Some(msg) = msg else { break };
                        match msg {
                            Ok(borrowed) => {
                                let topic = borrowed.topic().to_string();
                                let payload = borrowed.payload().unwrap_or_default().to_vec();
                                let timestamp = borrowed.timestamp().to_millis().unwrap_or(0) / 1000;
                                let event = ConsumerMessage { topic: topic.clone(), payload, timestamp };
                                match output.handle(event).await {
                                    Ok(()) => {
                                        if let Err(err) = consumer.commit_message(&borrowed, CommitMode::Async) {
                                            tracing::warn!(%topic, error = %err, "unable to commit offset");
                                        }
                                    }
                                    Err(CoreError::Ignore(err)) => {
                                        tracing::warn!(%topic, error = %err, "listener threw an error but will not be retried");
                                        if let Err(err) = consumer.commit_message(&borrowed, CommitMode::Async) {
                                            tracing::warn!(%topic, error = %err, "unable to commit offset");
                                        }
                                    }
                                    Err(CoreError::Retry(err)) => {
                                        // Leave the offset uncommitted: a restart or rebalance
                                        // redelivers this message instead of treating the
                                        // service as dead.
                                        tracing::warn!(%topic, error = %err, "listener failed transiently, leaving offset uncommitted for redelivery");
                                    }
                                    Err(err) => {
                                        on_error.on_error(&topic, &err.to_string());
                                    }
                                }
                            }
                            Err(err) => {
                                on_error.on_error("", &err.to_string());
                            }
                        }
                    }
                }
            }
        });

        Ok(RunningConsumer {
            shutdown: shutdown_tx,
            task,
        })
    }
}
