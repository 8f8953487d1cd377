use crate::backend::{BackendError, MappingBackend};
use crate::merge::MappingDiff;
use crate::store::MappingStore;
use crate::types::{decode_snapshot, encode_sinks};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum RegisterError {
    #[error("mapping store error: {0}")]
    Backend(#[from] BackendError),
    #[error("failed to encode sink list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Applies registrations either to the local store or to the distributed
/// snapshot, depending on how the process was configured.
#[derive(Clone)]
pub enum Registrar {
    /// No distributed store: mutate the local table directly.
    Local(MappingStore),
    /// Read-modify-write against the shared snapshot, then invalidate.
    Distributed(Arc<dyn MappingBackend>),
}

impl Registrar {
    /// Registers `uri` as a sink of `endpoint`, moving it away from any other
    /// path that held it.
    pub async fn register(&self, endpoint: &str, uri: &str) -> Result<MappingDiff, RegisterError> {
        match self {
            Registrar::Local(store) => Ok(store.register(endpoint, uri)),
            Registrar::Distributed(backend) => {
                let written = write_diff(backend.as_ref(), endpoint, uri).await;
                // Fields written before a failure are already visible to other
                // processes, so the invalidation goes out either way.
                let published = backend.publish_update().await;
                if let Err(e) = &published {
                    tracing::error!(error = %e, "failed to publish mapping update");
                }
                let diff = written?;
                published?;
                Ok(diff)
            }
        }
    }
}

async fn write_diff(
    backend: &dyn MappingBackend,
    endpoint: &str,
    uri: &str,
) -> Result<MappingDiff, RegisterError> {
    let (table, _) = decode_snapshot(backend.fetch_snapshot().await?);
    let diff = MappingDiff::plan(&table, endpoint, uri);

    for (path, sinks) in &diff.upserts {
        backend.set_sinks(path, &encode_sinks(sinks)?).await?;
    }
    for path in &diff.deletions {
        backend.delete_path(path).await?;
    }

    tracing::info!(
        endpoint,
        sink = uri,
        upserts = diff.upserts.len(),
        deletions = diff.deletions.len(),
        "registration written to mapping store"
    );
    Ok(diff)
}
