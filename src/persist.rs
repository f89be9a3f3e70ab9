use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::storage::KeyValueStore;

struct WriteRequest {
    key: &'static str,
    value: String,
}

/// Fire-and-forget writes to a [`KeyValueStore`].
///
/// Every scheduled write is a full snapshot and is performed independently;
/// nothing is coalesced or retried. A failed write is logged and dropped.
/// Writes run on one background thread in the order they were scheduled.
/// Dropping the persister waits for queued writes to finish.
pub struct Persister {
    tx: Option<Sender<WriteRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    pub fn spawn(backend: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::channel::<WriteRequest>();

        let worker = thread::Builder::new()
            .name("daybook-persist".to_string())
            .spawn(move || {
                for request in rx {
                    match backend.set(request.key, &request.value) {
                        Ok(()) => tracing::trace!(
                            key = request.key,
                            bytes = request.value.len(),
                            "persisted snapshot"
                        ),
                        Err(e) => {
                            tracing::error!(key = request.key, error = %e, "failed to save")
                        }
                    }
                }
            });

        match worker {
            Ok(handle) => Self {
                tx: Some(tx),
                worker: Some(handle),
            },
            Err(e) => {
                tracing::error!(error = %e, "could not start persistence thread");
                Self {
                    tx: None,
                    worker: None,
                }
            }
        }
    }

    /// Queue `value` to be written under `key` and return immediately
    pub fn schedule(&self, key: &'static str, value: String) {
        let Some(tx) = &self.tx else {
            tracing::error!(key, "failed to save: persistence thread not running");
            return;
        };
        if tx.send(WriteRequest { key, value }).is_err() {
            tracing::error!(key, "failed to save: persistence thread stopped");
        }
    }

    /// Stop accepting writes and wait for the queue to drain
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("persistence thread panicked");
            }
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        self.shutdown();
    }
}
