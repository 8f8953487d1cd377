//! In-memory stand-in for the distributed mapping store.

use crate::backend::{BackendError, Invalidations, MappingBackend};
use crate::types::{MappingTable, RawSnapshot, decode_snapshot, encode_sinks};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Clone, Copy, Debug)]
enum Signal {
    Update,
    Disconnect,
    Close,
}

pub struct MemoryBackend {
    hash: Mutex<RawSnapshot>,
    signals: broadcast::Sender<Signal>,
    fail_writes: AtomicBool,
    publishes: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(64);
        MemoryBackend {
            hash: Mutex::new(RawSnapshot::new()),
            signals,
            fail_writes: AtomicBool::new(false),
            publishes: AtomicUsize::new(0),
        }
    }

    pub fn with_table(table: &MappingTable) -> Self {
        let backend = Self::new();
        for (path, sinks) in table {
            let encoded = encode_sinks(sinks).expect("sink list encodes");
            backend.set_raw(path, &encoded);
        }
        backend
    }

    /// Writes a field verbatim, bypassing encoding.
    pub fn set_raw(&self, path: &str, value: &str) {
        self.hash.lock().insert(path.to_string(), value.to_string());
    }

    pub fn table(&self) -> MappingTable {
        decode_snapshot(self.hash.lock().clone()).0
    }

    /// Makes subsequent field writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Breaks every open subscription with an error.
    pub fn disconnect(&self) {
        let _ = self.signals.send(Signal::Disconnect);
    }

    /// Ends every open subscription without an error, as when the pub/sub
    /// connection is dropped by the server.
    pub fn close_subscriptions(&self) {
        let _ = self.signals.send(Signal::Close);
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(BackendError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MappingBackend for MemoryBackend {
    async fn fetch_snapshot(&self) -> Result<RawSnapshot, BackendError> {
        Ok(self.hash.lock().clone())
    }

    async fn set_sinks(&self, path: &str, encoded_sinks: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        self.set_raw(path, encoded_sinks);
        Ok(())
    }

    async fn delete_path(&self, path: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        self.hash.lock().shift_remove(path);
        Ok(())
    }

    async fn publish_update(&self) -> Result<(), BackendError> {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        let _ = self.signals.send(Signal::Update);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Invalidations, BackendError> {
        let rx = self.signals.subscribe();
        let invalidations = futures::stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Ok(Signal::Update) | Err(RecvError::Lagged(_)) => Some((Ok(()), rx)),
                Ok(Signal::Disconnect) => Some((Err(BackendError::Disconnected), rx)),
                Ok(Signal::Close) | Err(RecvError::Closed) => None,
            }
        });
        Ok(invalidations.boxed())
    }
}
