// Per-sink failure counters. Bounded so that a stream of distinct broken sink
// URIs cannot grow memory without limit; the sink.errors metric carries the
// totals for sinks that get evicted.
use crate::metrics_defs::SINK_ERRORS;
use moka::sync::Cache;
use shared::counter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ErrorCache {
    cache: Cache<String, Arc<AtomicU64>>,
}

impl ErrorCache {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity).build();

        ErrorCache { cache }
    }

    /// Counts one failure for `sink` and returns its running total.
    pub fn record(&self, sink: &str) -> u64 {
        counter!(SINK_ERRORS).increment(1);
        let count = self
            .cache
            .get_with(sink.to_string(), || Arc::new(AtomicU64::new(0)));
        count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn count(&self, sink: &str) -> u64 {
        self.cache
            .get(sink)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}
