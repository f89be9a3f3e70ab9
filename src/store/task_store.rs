use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

use super::LoadError;
use super::observer::{SubscriptionId, Subscribers};
use crate::models::{Subtask, Task};
use crate::persist::Persister;
use crate::stats::{self, TaskStats};
use crate::storage::{KeyValueStore, TASKS_KEY};
use crate::utils::IdGenerator;

/// Canonical in-memory task list, mirrored to the backend after every change.
///
/// The store starts out loading. Until [`TaskStore::load`] has run, the
/// sequence is not authoritative and nothing is written to the backend.
/// Mutations that find nothing to change return `false`/`None` and neither
/// persist nor notify.
pub struct TaskStore {
    tasks: Vec<Task>,
    is_loading: bool,
    seed_on_first_run: bool,
    ids: IdGenerator,
    backend: Arc<dyn KeyValueStore>,
    persister: Persister,
    subscribers: Subscribers<Task>,
}

/// Built-in collection used when nothing usable has been saved yet
pub fn seed_tasks(today: NaiveDate) -> Vec<Task> {
    let mut task = Task::new("1".to_string(), "Learn Rust 🦀".to_string());
    task.subtasks = vec![
        Subtask {
            id: "s1".to_string(),
            text: "Install the toolchain".to_string(),
            completed: true,
        },
        Subtask {
            id: "s2".to_string(),
            text: "Create a project".to_string(),
            completed: true,
        },
    ];
    task.due_date = Some(today);
    vec![task]
}

impl TaskStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            tasks: Vec::new(),
            is_loading: true,
            seed_on_first_run: true,
            ids: IdGenerator::new(),
            persister: Persister::spawn(backend.clone()),
            backend,
            subscribers: Subscribers::default(),
        }
    }

    /// Create the store and load the persisted collection
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let mut store = Self::new(backend);
        store.load();
        store
    }

    /// Whether a missing or unreadable collection is replaced by the seed
    /// tasks (default) or by an empty list
    pub fn seed_on_first_run(mut self, enabled: bool) -> Self {
        self.seed_on_first_run = enabled;
        self
    }

    /// Read the persisted collection, falling back to the seed on any failure
    pub fn load(&mut self) {
        self.tasks = match self.read_persisted() {
            Ok(Some(tasks)) => {
                debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Ok(None) => {
                debug!("no saved tasks");
                self.fallback()
            }
            Err(e) => {
                warn!(error = %e, "failed to load tasks, using defaults");
                self.fallback()
            }
        };
        self.is_loading = false;
        self.subscribers.notify(&self.tasks);
    }

    fn read_persisted(&self) -> Result<Option<Vec<Task>>, LoadError> {
        match self.backend.get(TASKS_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn fallback(&self) -> Vec<Task> {
        if self.seed_on_first_run {
            seed_tasks(stats::today())
        } else {
            Vec::new()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats::from_tasks(&self.tasks, today)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[Task]) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Append a task. Blank titles are ignored.
    pub fn add_task(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let id = self.ids.next_id();
        self.tasks.push(Task::new(id.clone(), text.to_string()));
        debug!(task_id = %id, "added task");
        self.commit();
        Some(id)
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        debug!(task_id, "deleted task");
        self.commit();
        true
    }

    /// Replace a task's title. Any text is accepted here, blank included.
    pub fn update_task_text(&mut self, task_id: &str, text: &str) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        task.text = text.to_string();
        self.commit();
        true
    }

    pub fn set_due_date(&mut self, task_id: &str, date: NaiveDate) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        task.due_date = Some(date);
        debug!(task_id, %date, "set due date");
        self.commit();
        true
    }

    /// Append an open subtask. Blank titles and unknown tasks are ignored.
    pub fn add_subtask(&mut self, task_id: &str, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let index = self.tasks.iter().position(|t| t.id == task_id)?;

        let subtask_id = loop {
            let candidate = format!("s-{}", self.ids.next_value());
            if self.tasks[index].subtask(&candidate).is_none() {
                break candidate;
            }
        };
        self.tasks[index]
            .subtasks
            .push(Subtask::new(subtask_id.clone(), text.to_string()));
        debug!(task_id, subtask_id = %subtask_id, "added subtask");
        self.commit();
        Some(subtask_id)
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let Some(subtask) = self.subtask_mut(task_id, subtask_id) else {
            return false;
        };
        subtask.completed = !subtask.completed;
        self.commit();
        true
    }

    pub fn update_subtask_text(&mut self, task_id: &str, subtask_id: &str, text: &str) -> bool {
        let Some(subtask) = self.subtask_mut(task_id, subtask_id) else {
            return false;
        };
        subtask.text = text.to_string();
        self.commit();
        true
    }

    fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    fn subtask_mut(&mut self, task_id: &str, subtask_id: &str) -> Option<&mut Subtask> {
        self.task_mut(task_id)?
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
    }

    fn commit(&mut self) {
        self.persist();
        self.subscribers.notify(&self.tasks);
    }

    fn persist(&self) {
        if self.is_loading {
            return;
        }
        match serde_json::to_string(&self.tasks) {
            Ok(json) => self.persister.schedule(TASKS_KEY, json),
            Err(e) => tracing::error!(error = %e, "failed to serialize tasks"),
        }
    }
}
