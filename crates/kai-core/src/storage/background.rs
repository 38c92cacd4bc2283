//! Store wrapper that moves writes off the caller's thread.
//!
//! The engine persists while holding its state lock. Wrapping the real
//! store in a [`BackgroundStore`] turns each save into a channel send, so
//! SQLite IO happens on a dedicated writer thread and never delays tick
//! delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

use super::Store;
use crate::error::StorageError;

struct PendingWrite {
    key: String,
    bytes: Vec<u8>,
}

pub struct BackgroundStore<S: Store + 'static> {
    inner: Arc<S>,
    /// Latest value per key, so loads observe writes still in the queue.
    overlay: Mutex<HashMap<String, Vec<u8>>>,
    tx: Mutex<Option<UnboundedSender<PendingWrite>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Store + 'static> BackgroundStore<S> {
    pub fn new(inner: S) -> Self {
        let inner = Arc::new(inner);
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingWrite>();
        let writer = Arc::clone(&inner);
        let worker = std::thread::Builder::new()
            .name("kai-store-writer".into())
            .spawn(move || {
                while let Some(write) = rx.blocking_recv() {
                    if let Err(e) = writer.save(&write.key, &write.bytes) {
                        warn!(key = %write.key, error = %e, "background save failed");
                    }
                }
                debug!("store writer drained");
            })
            .ok();

        Self {
            inner,
            overlay: Mutex::new(HashMap::new()),
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(worker),
        }
    }

    /// Stop accepting writes and block until the queue is flushed.
    pub fn shutdown(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("store writer panicked");
            }
        }
    }
}

impl<S: Store + 'static> Store for BackgroundStore<S> {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let tx = self.tx.lock().map_err(|_| StorageError::Locked)?;
        let tx = tx.as_ref().ok_or(StorageError::WriterClosed)?;
        if let Ok(mut overlay) = self.overlay.lock() {
            overlay.insert(key.to_string(), bytes.to_vec());
        }
        tx.send(PendingWrite {
            key: key.to_string(),
            bytes: bytes.to_vec(),
        })
        .map_err(|_| StorageError::WriterClosed)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(bytes) = self
            .overlay
            .lock()
            .map_err(|_| StorageError::Locked)?
            .get(key)
        {
            return Ok(Some(bytes.clone()));
        }
        self.inner.load(key)
    }
}

impl<S: Store + 'static> Drop for BackgroundStore<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn writes_reach_inner_store_after_shutdown() {
        let inner = Arc::new(MemoryStore::new());
        let store = BackgroundStore::new(Arc::clone(&inner));
        store.save("a", b"1").unwrap();
        store.save("a", b"2").unwrap();
        store.shutdown();
        assert_eq!(inner.load("a").unwrap().as_deref(), Some(&b"2"[..]));
    }

    #[test]
    fn loads_see_queued_writes() {
        let store = BackgroundStore::new(MemoryStore::new());
        store.save("k", b"queued").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some(&b"queued"[..]));
    }

    #[test]
    fn save_after_shutdown_is_rejected() {
        let store = BackgroundStore::new(MemoryStore::new());
        store.shutdown();
        assert!(matches!(
            store.save("k", b"v"),
            Err(StorageError::WriterClosed)
        ));
    }
}
