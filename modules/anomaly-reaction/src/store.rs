use std::time::Duration;

use anomaly_common::AnomalyRecord;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions, ReadConcern};
use mongodb::{Client, Collection, IndexModel};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn store_anomaly(&self, record: AnomalyRecord) -> anyhow::Result<()>;
}

pub struct MongoAnomalyStore {
    collection: Collection<AnomalyRecord>,
}

impl MongoAnomalyStore {
    /// Connects, selects `{database}.{collection}`, and ensures the
    /// `(device, service)` compound index plus a descending `unix_timestamp`
    /// index exist, so range queries over a device/service pair stay indexed
    /// as anomaly volume grows.
    pub async fn connect(url: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(url).await?;
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.read_concern = Some(ReadConcern::majority());
        let client = Client::with_options(options)?;
        let collection = client.database(database).collection::<AnomalyRecord>(collection);

        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "device": 1, "service": 1 })
                    .options(IndexOptions::builder().name("device_service".to_string()).build())
                    .build(),
            )
            .await?;
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "unix_timestamp": -1 })
                    .options(IndexOptions::builder().name("unix_timestamp_desc".to_string()).build())
                    .build(),
            )
            .await?;

        Ok(Self { collection })
    }
}

#[async_trait]
impl AnomalyStore for MongoAnomalyStore {
    async fn store_anomaly(&self, record: AnomalyRecord) -> anyhow::Result<()> {
        self.collection.insert_one(record).await?;
        Ok(())
    }
}
