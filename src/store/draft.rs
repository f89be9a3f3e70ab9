use super::task_store::TaskStore;
use crate::models::Task;

/// Edit buffer for one task's title and subtask texts.
///
/// Changes stay in the draft until [`TaskDraft::save`], which applies each
/// edited field through the store. Dropping the draft discards everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    task_id: String,
    text: String,
    subtasks: Vec<(String, String)>,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            text: task.text.clone(),
            subtasks: task
                .subtasks
                .iter()
                .map(|s| (s.id.clone(), s.text.clone()))
                .collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn subtask_text(&self, subtask_id: &str) -> Option<&str> {
        self.subtasks
            .iter()
            .find(|(id, _)| id == subtask_id)
            .map(|(_, text)| text.as_str())
    }

    /// Returns false if the task had no such subtask when the draft was taken
    pub fn set_subtask_text(&mut self, subtask_id: &str, text: impl Into<String>) -> bool {
        match self.subtasks.iter_mut().find(|(id, _)| id == subtask_id) {
            Some((_, existing)) => {
                *existing = text.into();
                true
            }
            None => false,
        }
    }

    /// Whether any field differs from the task's current state in `store`
    pub fn is_dirty(&self, store: &TaskStore) -> bool {
        match store.task(&self.task_id) {
            Some(task) => self.changes(task).next().is_some() || task.text != self.text,
            None => false,
        }
    }

    fn changes<'a>(&'a self, task: &'a Task) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.subtasks.iter().filter_map(move |(id, text)| {
            task.subtask(id)
                .filter(|current| current.text != *text)
                .map(|_| (id.as_str(), text.as_str()))
        })
    }

    /// Apply the edits to `store`. Returns the number of fields written.
    /// A task deleted since the draft was taken receives nothing.
    pub fn save(self, store: &mut TaskStore) -> usize {
        let Some(task) = store.task(&self.task_id) else {
            return 0;
        };

        let title_changed = task.text != self.text;
        let subtask_edits: Vec<(String, String)> = self
            .changes(task)
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect();

        let mut written = 0;
        if title_changed && store.update_task_text(&self.task_id, &self.text) {
            written += 1;
        }
        for (subtask_id, text) in subtask_edits {
            if store.update_subtask_text(&self.task_id, &subtask_id, &text) {
                written += 1;
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn store_with_task() -> (TaskStore, String, String, String) {
        let mut store = TaskStore::new(Arc::new(MemoryStore::new())).seed_on_first_run(false);
        store.load();
        let id = store.add_task("Trip").unwrap();
        let a = store.add_subtask(&id, "Book hotel").unwrap();
        let b = store.add_subtask(&id, "Pack").unwrap();
        (store, id, a, b)
    }

    #[test]
    fn save_applies_only_changed_fields() {
        let (mut store, id, a, b) = store_with_task();
        let mut draft = TaskDraft::from_task(store.task(&id).unwrap());

        assert!(!draft.is_dirty(&store));
        draft.set_text("Weekend trip");
        assert_eq!(draft.text(), "Weekend trip");
        assert!(draft.set_subtask_text(&b, "Pack bags"));
        assert!(!draft.set_subtask_text("nope", "x"));
        assert!(draft.is_dirty(&store));

        assert_eq!(draft.save(&mut store), 2);

        let task = store.task(&id).unwrap();
        assert_eq!(task.text, "Weekend trip");
        assert_eq!(task.subtask(&a).unwrap().text, "Book hotel");
        assert_eq!(task.subtask(&b).unwrap().text, "Pack bags");
    }

    #[test]
    fn dropping_a_draft_discards_edits() {
        let (store, id, a, _) = store_with_task();
        let mut draft = TaskDraft::from_task(store.task(&id).unwrap());
        draft.set_subtask_text(&a, "changed");
        assert_eq!(draft.subtask_text(&a), Some("changed"));
        drop(draft);

        assert_eq!(store.task(&id).unwrap().subtask(&a).unwrap().text, "Book hotel");
    }

    #[test]
    fn saving_after_delete_writes_nothing() {
        let (mut store, id, _, _) = store_with_task();
        let mut draft = TaskDraft::from_task(store.task(&id).unwrap());
        draft.set_text("gone");
        store.delete_task(&id);

        assert_eq!(draft.save(&mut store), 0);
        assert!(store.tasks().is_empty());
    }
}
