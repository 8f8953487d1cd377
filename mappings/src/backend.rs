use crate::types::RawSnapshot;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Hash key holding the shared mapping snapshot.
pub const CONFIG_KEY: &str = "giver_config";

/// Pub/sub channel signalling that the snapshot changed.
pub const UPDATE_CHANNEL: &str = "giver_config_update";

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("connection to the mapping store was lost")]
    Disconnected,
    #[error("mapping store unavailable: {0}")]
    Unavailable(String),
}

/// Stream of invalidation signals. An `Err` item or the end of the stream
/// means the subscription is gone.
pub type Invalidations = BoxStream<'static, Result<(), BackendError>>;

/// The shared store the mapping snapshot lives in.
///
/// Writes are individual field operations; there is no compare-and-swap, so
/// concurrent writers race per field.
#[async_trait]
pub trait MappingBackend: Send + Sync {
    /// Fetches every field of the snapshot hash, undecoded.
    async fn fetch_snapshot(&self) -> Result<RawSnapshot, BackendError>;

    async fn set_sinks(&self, path: &str, encoded_sinks: &str) -> Result<(), BackendError>;

    async fn delete_path(&self, path: &str) -> Result<(), BackendError>;

    /// Publishes an invalidation on the update channel.
    async fn publish_update(&self) -> Result<(), BackendError>;

    /// Subscribes to the update channel.
    async fn subscribe(&self) -> Result<Invalidations, BackendError>;
}
