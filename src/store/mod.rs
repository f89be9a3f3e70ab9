pub mod draft;
pub mod journal_store;
pub mod observer;
pub mod task_store;

pub use draft::TaskDraft;
pub use journal_store::{JournalError, JournalSection, JournalStore};
pub use observer::{SubscriptionId, Subscribers};
pub use task_store::TaskStore;

use thiserror::Error;

use crate::storage::StorageError;

/// Reasons a persisted collection could not be used. Never surfaced to
/// callers; the stores log it and fall back to a default collection.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Failed to parse stored data: {0}")]
    ParseError(#[from] serde_json::Error),
}
