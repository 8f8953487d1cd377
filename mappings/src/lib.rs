//! Path to sink mappings: the per-process store, the URI resolver cache, the
//! registration merge and the synchronizer that keeps the store in line with a
//! shared Redis snapshot.

pub mod backend;
pub mod merge;
pub mod metrics_defs;
pub mod redis_backend;
pub mod registrar;
pub mod resolver;
pub mod store;
pub mod synchronizer;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
pub mod types;

pub use backend::{BackendError, MappingBackend};
pub use merge::MappingDiff;
pub use redis_backend::RedisBackend;
pub use registrar::{RegisterError, Registrar};
pub use resolver::{Scheme, Target, UriCache};
pub use store::{MappingStore, ResolvedSink};
pub use synchronizer::{SyncError, Synchronizer};
pub use types::MappingTable;
