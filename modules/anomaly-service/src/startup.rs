use std::sync::Arc;
use std::time::Duration;

use anomaly_bus::{BusErrorHandler, EventOutput, ManagedConsumer};
use anomaly_cache::MetadataCache;
use anomaly_common::{Config, RoutingTable};
use anomaly_kv::RedisRollingStore;
use anomaly_pipeline::{Debouncer, EventPipeline, MarshallerAdapter, PipelineOutput};
use anomaly_reaction::{AnomalyReactionSink, MongoAnomalyStore};
use anomaly_router::{HandlerRegistry, RegistryBuilder, RoutingTableBuilder};
use device_repo_client::HttpDeviceRepoClient;
use device_selection_client::HttpDeviceSelectionClient;
use futures::StreamExt;
use marshaller_client::HttpMarshallerClient;
use notifier_client::HttpNotifierClient;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::ClientConfig;
use tokio::sync::RwLock;

use crate::registry::reference_handlers;

/// Exits the process on any non-ignorable consumer error, matching how a
/// fatal per-topic callback is expected to behave: log and exit rather than
/// limp along with a silently-dead consumer.
struct FatalOnError;

impl BusErrorHandler for FatalOnError {
    fn on_error(&self, topic: &str, error: &str) {
        tracing::error!(%topic, %error, "fatal error consuming topic");
        std::process::exit(1);
    }
}

/// Background work started by [`start`]; dropping this without calling
/// [`ServiceHandle::shutdown`] leaves the consumer tasks running detached.
pub struct ServiceHandle {
    consumer: Arc<ManagedConsumer>,
    invalidation_listener: tokio::task::JoinHandle<()>,
}

impl ServiceHandle {
    pub async fn shutdown(self) {
        self.invalidation_listener.abort();
        self.consumer.stop().await;
    }
}

/// Wires every component together and starts consuming. Connects to
/// Redis/Mongo, builds the initial routing table, subscribes the business
/// consumer to its derived topics, and starts a debounced reload loop fed by
/// the cache invalidation topics.
pub async fn start(config: Config) -> anyhow::Result<ServiceHandle> {
    let device_repo: Arc<dyn device_repo_client::DeviceRepoClient> =
        Arc::new(HttpDeviceRepoClient::new(config.device_repository_url.clone()));
    let device_selection: Arc<dyn device_selection_client::DeviceSelectionClient> =
        Arc::new(HttpDeviceSelectionClient::new(config.device_selection_url.clone()));
    let marshaller_client: Arc<dyn marshaller_client::MarshallerClient> =
        Arc::new(HttpMarshallerClient::new(config.marshaller_url.clone()));
    let notifier: Arc<dyn notifier_client::NotifierClient> =
        Arc::new(HttpNotifierClient::new(config.notification_url.clone())?);

    let cache = Arc::new(MetadataCache::new(
        device_repo.clone(),
        Duration::from_secs(config.cache_duration_secs),
    ));
    let marshaller = Arc::new(MarshallerAdapter::new(marshaller_client, cache.clone()));

    let rolling_store: Arc<dyn anomaly_kv::RollingValueStore> =
        Arc::new(RedisRollingStore::connect(&config.val_key_url).await?);
    // A strategy's extra state shares the same rolling-value connection; the
    // two traits are separate seams even though one store implements both.
    let strategy_store: Arc<dyn anomaly_common::StrategyStore> =
        Arc::new(RedisRollingStore::connect(&config.val_key_url).await?);

    let anomaly_store: Arc<dyn anomaly_reaction::AnomalyStore> = Arc::new(
        MongoAnomalyStore::connect(&config.mongo_url, &config.mongo_table, &config.mongo_anomaly_collection).await?,
    );
    let reaction: Arc<dyn anomaly_common::ReactionSink> = Arc::new(AnomalyReactionSink::new(
        device_repo.clone(),
        notifier,
        anomaly_store,
        config.notification_topic.clone(),
        config.notifications_ignore_duplicates_within_seconds,
    ));

    let registry = reference_handlers()
        .into_iter()
        .fold(RegistryBuilder::new(), |builder, spec| builder.register(spec))
        .build();

    let builder = Arc::new(RoutingTableBuilder::new(
        device_repo,
        device_selection,
        config.anomaly_detector_attribute.clone(),
    ));

    let table = builder.build(registry.list()).await?;
    let initial_topics = table.topic_set();
    let routing_table = Arc::new(RwLock::new(table));

    let pipeline = Arc::new(EventPipeline::new(
        routing_table.clone(),
        marshaller,
        rolling_store,
        strategy_store,
        reaction,
    ));
    let output: Arc<dyn EventOutput> = Arc::new(PipelineOutput::new(pipeline));

    let error_handler: Arc<dyn BusErrorHandler> = Arc::new(FatalOnError);
    let consumer = Arc::new(ManagedConsumer::new(config.kafka_url.clone(), config.kafka_consumer_group.clone()));
    consumer
        .update_topics(initial_topics, output.clone(), error_handler.clone())
        .await?;

    let debouncer = Arc::new(Debouncer::new(Duration::from_millis(config.reload_debounce_ms)));

    let invalidation_listener = spawn_cache_invalidation_listener(CacheInvalidationDeps {
        kafka_url: config.kafka_url.clone(),
        consumer_group: format!("{}-cache-invalidation", config.kafka_consumer_group),
        topics: config.cache_invalidation_kafka_topics.clone(),
        cache,
        debouncer,
        builder,
        registry,
        routing_table,
        bus_consumer: consumer.clone(),
        output,
        error_handler,
    })?;

    Ok(ServiceHandle {
        consumer,
        invalidation_listener,
    })
}

struct CacheInvalidationDeps {
    kafka_url: String,
    consumer_group: String,
    topics: Vec<String>,
    cache: Arc<MetadataCache>,
    debouncer: Arc<Debouncer>,
    builder: Arc<RoutingTableBuilder>,
    registry: Arc<HandlerRegistry>,
    routing_table: Arc<RwLock<RoutingTable>>,
    bus_consumer: Arc<ManagedConsumer>,
    output: Arc<dyn EventOutput>,
    error_handler: Arc<dyn BusErrorHandler>,
}

/// A standalone, static-subscription consumer: every message on any of
/// `topics` means "something changed somewhere", so the payload is ignored
/// and a cache-wide invalidation plus a debounced reload is triggered.
/// Plays the role of a signal broker fed by a Kafka cache invalidator.
fn spawn_cache_invalidation_listener(deps: CacheInvalidationDeps) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    if deps.topics.is_empty() {
        tracing::info!("no cache invalidation topics configured, reload can only happen on restart");
        return Ok(tokio::spawn(async {}));
    }

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &deps.kafka_url)
        .set("group.id", &deps.consumer_group)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "latest")
        .create()?;
    let topic_refs: Vec<&str> = deps.topics.iter().map(String::as_str).collect();
    consumer.subscribe(&topic_refs)?;

    let CacheInvalidationDeps {
        cache,
        debouncer,
        builder,
        registry,
        routing_table,
        bus_consumer,
        output,
        error_handler,
        ..
    } = deps;

    let handle = tokio::spawn(async move {
        let mut stream = consumer.stream();
        loop {
            let Some(msg) = stream.next().await else { break };
            match msg {
                Ok(_) => {
                    cache.invalidate_all().await;
                    let builder = builder.clone();
                    let registry = registry.clone();
                    let routing_table = routing_table.clone();
                    let bus_consumer = bus_consumer.clone();
                    let output = output.clone();
                    let error_handler = error_handler.clone();
                    debouncer.trigger(move || async move {
                        reload(builder, registry, routing_table, bus_consumer, output, error_handler).await;
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cache invalidation consumer error");
                }
            }
        }
    });
    Ok(handle)
}

async fn reload(
    builder: Arc<RoutingTableBuilder>,
    registry: Arc<HandlerRegistry>,
    routing_table: Arc<RwLock<RoutingTable>>,
    bus_consumer: Arc<ManagedConsumer>,
    output: Arc<dyn EventOutput>,
    error_handler: Arc<dyn BusErrorHandler>,
) {
    let table = match builder.build(registry.list()).await {
        Ok(table) => table,
        Err(err) => {
            tracing::error!(error = %err, "unable to refresh routing table, keeping the current one");
            return;
        }
    };
    let topics = table.topic_set();
    *routing_table.write().await = table;
    if let Err(err) = bus_consumer.update_topics(topics, output, error_handler).await {
        tracing::error!(error = %err, "unable to update consumer topics after reload");
    }
}
