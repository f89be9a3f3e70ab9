use chrono::{Local, TimeZone};
use std::collections::HashMap;
use std::fmt::{Display, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::LoadError;
use super::observer::{SubscriptionId, Subscribers};
use crate::models::JournalEntry;
use crate::persist::Persister;
use crate::storage::{JOURNAL_KEY, KeyValueStore};
use crate::utils::IdGenerator;

/// Long-form day label, e.g. "Tuesday, June 10, 2025"
pub const DEFAULT_SECTION_FORMAT: &str = "%A, %B %-d, %Y";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JournalError {
    #[error("Nothing to save: the entry is empty.")]
    EmptyEntry,
}

/// Entries written on one calendar day
#[derive(Debug, PartialEq, Eq)]
pub struct JournalSection<'a> {
    pub title: String,
    pub entries: Vec<&'a JournalEntry>,
}

/// Append-only journal, newest entry first
pub struct JournalStore {
    entries: Vec<JournalEntry>,
    is_loading: bool,
    draft: String,
    section_format: String,
    ids: IdGenerator,
    backend: Arc<dyn KeyValueStore>,
    persister: Persister,
    subscribers: Subscribers<JournalEntry>,
}

impl JournalStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            entries: Vec::new(),
            is_loading: true,
            draft: String::new(),
            section_format: DEFAULT_SECTION_FORMAT.to_string(),
            ids: IdGenerator::new(),
            persister: Persister::spawn(backend.clone()),
            backend,
            subscribers: Subscribers::default(),
        }
    }

    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let mut store = Self::new(backend);
        store.load();
        store
    }

    /// strftime pattern used for section titles
    pub fn with_section_format(mut self, format: impl Into<String>) -> Self {
        self.section_format = format.into();
        self
    }

    /// Read persisted entries, starting empty on any failure
    pub fn load(&mut self) {
        self.entries = match self.read_persisted() {
            Ok(Some(mut entries)) => {
                entries.sort_by(|a, b| b.date.cmp(&a.date));
                debug!(count = entries.len(), "loaded journal entries");
                entries
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load journal entries");
                Vec::new()
            }
        };
        self.is_loading = false;
        self.subscribers.notify(&self.entries);
    }

    fn read_persisted(&self) -> Result<Option<Vec<JournalEntry>>, LoadError> {
        match self.backend.get(JOURNAL_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[JournalEntry]) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Prepend a new entry stamped with the current time
    pub fn add_entry(&mut self, text: &str) -> Result<&JournalEntry, JournalError> {
        if text.trim().is_empty() {
            return Err(JournalError::EmptyEntry);
        }
        let entry = JournalEntry::new(self.ids.next_id(), text.to_string());
        debug!(entry_id = %entry.id, "added journal entry");
        self.entries.insert(0, entry);
        self.persist();
        self.subscribers.notify(&self.entries);
        Ok(&self.entries[0])
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Save the compose buffer as an entry. The buffer is cleared only when
    /// the entry was accepted.
    pub fn submit_draft(&mut self) -> Result<&JournalEntry, JournalError> {
        let text = std::mem::take(&mut self.draft);
        if text.trim().is_empty() {
            self.draft = text;
            return Err(JournalError::EmptyEntry);
        }
        self.add_entry(&text)
    }

    /// Entries grouped by local calendar day
    pub fn sections(&self) -> Vec<JournalSection<'_>> {
        group_by_day(&self.entries, &Local, &self.section_format)
    }

    pub fn sections_in<Tz>(&self, tz: &Tz) -> Vec<JournalSection<'_>>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        group_by_day(&self.entries, tz, &self.section_format)
    }

    fn persist(&self) {
        if self.is_loading {
            return;
        }
        match serde_json::to_string(&self.entries) {
            Ok(json) => self.persister.schedule(JOURNAL_KEY, json),
            Err(e) => tracing::error!(error = %e, "failed to serialize journal entries"),
        }
    }
}

/// Partition entries into day sections titled with `format`. Sections come
/// in order of first appearance and keep the entries' relative order.
pub fn group_by_day<'a, Tz>(
    entries: &'a [JournalEntry],
    tz: &Tz,
    format: &str,
) -> Vec<JournalSection<'a>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut sections: Vec<JournalSection<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let title = day_label(entry, tz, format);
        match index.get(&title) {
            Some(&i) => sections[i].entries.push(entry),
            None => {
                index.insert(title.clone(), sections.len());
                sections.push(JournalSection {
                    title,
                    entries: vec![entry],
                });
            }
        }
    }
    sections
}

fn day_label<Tz>(entry: &JournalEntry, tz: &Tz, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = entry.date.with_timezone(tz);
    let mut label = String::new();
    if write!(label, "{}", local.format(format)).is_err() {
        label.clear();
        // chrono reports a bad pattern only when formatting
        let _ = write!(label, "{}", local.format(DEFAULT_SECTION_FORMAT));
    }
    label
}
