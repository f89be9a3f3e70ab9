pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod models;
pub mod persist;
pub mod stats;
pub mod storage;
pub mod store;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use models::{JournalEntry, Subtask, Task};
pub use stats::TaskStats;
pub use storage::{KeyValueStore, MemoryStore};
pub use store::{JournalStore, TaskDraft, TaskStore};
pub use utils::Profile;
