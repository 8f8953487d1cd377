use crate::backend::{BackendError, CONFIG_KEY, Invalidations, MappingBackend, UPDATE_CHANNEL};
use crate::types::RawSnapshot;
use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

/// Redis-backed mapping store. Commands share one multiplexed connection;
/// subscriptions open a dedicated pub/sub connection.
pub struct RedisBackend {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("connected to redis mapping store");

        Ok(RedisBackend { client, conn })
    }
}

#[async_trait]
impl MappingBackend for RedisBackend {
    async fn fetch_snapshot(&self) -> Result<RawSnapshot, BackendError> {
        let mut conn = self.conn.clone();
        let fields: Vec<(String, String)> = conn.hgetall(CONFIG_KEY).await?;
        Ok(fields.into_iter().collect())
    }

    async fn set_sinks(&self, path: &str, encoded_sinks: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(CONFIG_KEY, path, encoded_sinks).await?;
        Ok(())
    }

    async fn delete_path(&self, path: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(CONFIG_KEY, path).await?;
        Ok(())
    }

    async fn publish_update(&self) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(UPDATE_CHANNEL, "update").await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Invalidations, BackendError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(UPDATE_CHANNEL).await?;

        let invalidations = pubsub.into_on_message().filter_map(|msg| async move {
            (msg.get_channel_name() == UPDATE_CHANNEL).then_some(Ok(()))
        });
        Ok(invalidations.boxed())
    }
}
