use clap::{Parser, Subcommand};
use std::io::Write;
use thiserror::Error;

use crate::stats::{self, TaskStats};
use crate::store::{JournalError, JournalStore, TaskDraft, TaskStore};
use crate::utils::parse_date;

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Tasks with subtasks, a dated journal and progress stats")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show all tasks with their subtasks (default if no subcommand)
    List,
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a task and all of its subtasks
    Delete { id: String },
    /// Change a task's title
    Rename { id: String, title: String },
    /// Set a task's due date
    Due {
        id: String,
        /// Due date (YYYY-MM-DD)
        date: String,
    },
    /// Edit a task's title and subtask texts in one go
    Edit {
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Subtask edit as SUBTASK_ID=TEXT, repeatable
        #[arg(long = "subtask", value_parser = parse_subtask_edit)]
        subtasks: Vec<(String, String)>,
    },
    /// Work with a task's subtasks
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommand,
    },
    /// Show completion statistics
    Stats,
    /// Write or read the journal
    Journal {
        #[command(subcommand)]
        command: JournalCommand,
    },
}

#[derive(Subcommand)]
pub enum SubtaskCommand {
    /// Append a subtask
    Add { task_id: String, text: String },
    /// Flip a subtask between done and open
    Toggle { task_id: String, subtask_id: String },
    /// Change a subtask's text
    Rename {
        task_id: String,
        subtask_id: String,
        text: String,
    },
}

#[derive(Subcommand)]
pub enum JournalCommand {
    /// Add an entry stamped with the current time
    Add { text: String },
    /// Show entries grouped by day
    List,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Subtask {subtask_id} not found in task {task_id}")]
    SubtaskNotFound { task_id: String, subtask_id: String },
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("{0}")]
    JournalError(#[from] JournalError),
    #[error("Failed to write output: {0}")]
    IoError(#[from] std::io::Error),
}

fn parse_subtask_edit(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(id, text)| (id.trim().to_string(), text.to_string()))
        .filter(|(id, _)| !id.is_empty())
        .ok_or_else(|| format!("expected SUBTASK_ID=TEXT, got '{}'", raw))
}

fn parse_due(raw: &str) -> Result<chrono::NaiveDate, CliError> {
    parse_date(raw)
        .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", raw, e)))
}

/// Handle the list command
pub fn handle_list(store: &TaskStore, out: &mut impl Write) -> Result<(), CliError> {
    if store.tasks().is_empty() {
        writeln!(out, "No tasks yet.")?;
        return Ok(());
    }

    let today = stats::today();
    for task in store.tasks() {
        let due = match task.due_date {
            Some(date) if task.is_overdue(today) => format!("  due {} (overdue)", date),
            Some(date) => format!("  due {}", date),
            None => String::new(),
        };
        writeln!(
            out,
            "[{}] {} {:>3}%{}",
            task.id,
            task.text,
            task.completion_percentage(),
            due
        )?;
        for subtask in &task.subtasks {
            let mark = if subtask.completed { "x" } else { " " };
            writeln!(out, "    [{}] {} ({})", mark, subtask.text, subtask.id)?;
        }
    }
    Ok(())
}

/// Handle the add command
pub fn handle_add(
    title: String,
    due: Option<String>,
    store: &mut TaskStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    // Validate the date before creating anything
    let due_date = due.as_deref().map(parse_due).transpose()?;

    let id = store.add_task(&title).ok_or(CliError::EmptyTitle)?;
    if let Some(date) = due_date {
        store.set_due_date(&id, date);
    }

    writeln!(out, "Task created successfully (ID: {})", id)?;
    Ok(())
}

pub fn handle_delete(id: String, store: &mut TaskStore, out: &mut impl Write) -> Result<(), CliError> {
    if !store.delete_task(&id) {
        return Err(CliError::TaskNotFound(id));
    }
    writeln!(out, "Task {} deleted", id)?;
    Ok(())
}

pub fn handle_rename(
    id: String,
    title: String,
    store: &mut TaskStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if !store.update_task_text(&id, &title) {
        return Err(CliError::TaskNotFound(id));
    }
    writeln!(out, "Task {} renamed", id)?;
    Ok(())
}

pub fn handle_due(
    id: String,
    date: String,
    store: &mut TaskStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let date = parse_due(&date)?;
    if !store.set_due_date(&id, date) {
        return Err(CliError::TaskNotFound(id));
    }
    writeln!(out, "Task {} due {}", id, date)?;
    Ok(())
}

/// Handle the edit command through a draft, so all edits land together
pub fn handle_edit(
    id: String,
    title: Option<String>,
    subtasks: Vec<(String, String)>,
    store: &mut TaskStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let task = store.task(&id).ok_or_else(|| CliError::TaskNotFound(id.clone()))?;
    let mut draft = TaskDraft::from_task(task);

    if let Some(title) = title {
        draft.set_text(title);
    }
    for (subtask_id, text) in subtasks {
        if !draft.set_subtask_text(&subtask_id, text) {
            return Err(CliError::SubtaskNotFound {
                task_id: id,
                subtask_id,
            });
        }
    }

    let written = draft.save(store);
    writeln!(out, "Task {} updated ({} field(s) changed)", id, written)?;
    Ok(())
}

pub fn handle_subtask(
    command: SubtaskCommand,
    store: &mut TaskStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        SubtaskCommand::Add { task_id, text } => {
            if store.task(&task_id).is_none() {
                return Err(CliError::TaskNotFound(task_id));
            }
            let id = store.add_subtask(&task_id, &text).ok_or(CliError::EmptyTitle)?;
            writeln!(out, "Subtask created successfully (ID: {})", id)?;
        }
        SubtaskCommand::Toggle {
            task_id,
            subtask_id,
        } => {
            if !store.toggle_subtask(&task_id, &subtask_id) {
                return Err(CliError::SubtaskNotFound {
                    task_id,
                    subtask_id,
                });
            }
            let done = store
                .task(&task_id)
                .and_then(|t| t.subtask(&subtask_id))
                .is_some_and(|s| s.completed);
            writeln!(
                out,
                "Subtask {} marked {}",
                subtask_id,
                if done { "done" } else { "open" }
            )?;
        }
        SubtaskCommand::Rename {
            task_id,
            subtask_id,
            text,
        } => {
            if !store.update_subtask_text(&task_id, &subtask_id, &text) {
                return Err(CliError::SubtaskNotFound {
                    task_id,
                    subtask_id,
                });
            }
            writeln!(out, "Subtask {} renamed", subtask_id)?;
        }
    }
    Ok(())
}

pub fn handle_stats(store: &TaskStore, out: &mut impl Write) -> Result<(), CliError> {
    let summary: TaskStats = store.stats(stats::today());
    writeln!(out, "Tasks:     {}", summary.total_tasks)?;
    writeln!(out, "Done:      {}", summary.completed_tasks)?;
    writeln!(out, "Overdue:   {}", summary.overdue_tasks)?;
    writeln!(
        out,
        "Subtasks:  {}/{}",
        summary.completed_subtasks, summary.total_subtasks
    )?;
    writeln!(out, "Overall:   {:.0}%", summary.overall_completion())?;
    writeln!(out, "Subtasks:  {:.0}%", summary.subtask_completion())?;
    if summary.total_tasks == 0 {
        writeln!(out, "No tasks to report on yet.")?;
    }
    Ok(())
}

pub fn handle_journal(
    command: JournalCommand,
    journal: &mut JournalStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        JournalCommand::Add { text } => {
            journal.set_draft(text);
            let entry = journal.submit_draft()?;
            writeln!(out, "Journal entry created successfully (ID: {})", entry.id)?;
        }
        JournalCommand::List => {
            let sections = journal.sections();
            if sections.is_empty() {
                writeln!(out, "The journal is empty.")?;
            }
            for section in sections {
                writeln!(out, "{}", section.title)?;
                for entry in section.entries {
                    let time = entry.date.with_timezone(&chrono::Local).format("%H:%M");
                    writeln!(out, "  {}  {}", time, entry.text)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn store() -> TaskStore {
        let mut store = TaskStore::new(Arc::new(MemoryStore::new())).seed_on_first_run(false);
        store.load();
        store
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn subtask_edit_argument_parsing() {
        assert_eq!(
            parse_subtask_edit("s-1=Buy milk=2L"),
            Ok(("s-1".to_string(), "Buy milk=2L".to_string()))
        );
        assert!(parse_subtask_edit("no-separator").is_err());
        assert!(parse_subtask_edit("=text").is_err());
    }

    #[test]
    fn add_rejects_bad_date_without_creating() {
        let mut store = store();
        let mut out = Vec::new();
        let result = handle_add("Taxes".into(), Some("15/04".into()), &mut store, &mut out);
        assert!(matches!(result, Err(CliError::DateParseError(_))));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn add_then_list_shows_due_date() {
        let mut store = store();
        let mut out = Vec::new();
        handle_add("Taxes".into(), Some("2099-04-15".into()), &mut store, &mut out).unwrap();
        let id = store.tasks()[0].id.clone();
        handle_subtask(
            SubtaskCommand::Add {
                task_id: id.clone(),
                text: "Forms".into(),
            },
            &mut store,
            &mut out,
        )
        .unwrap();

        let mut listing = Vec::new();
        handle_list(&store, &mut listing).unwrap();
        let listing = output(listing);
        assert!(listing.contains("Taxes   0%  due 2099-04-15"));
        assert!(listing.contains("[ ] Forms"));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut store = store();
        let mut out = Vec::new();
        assert!(matches!(
            handle_delete("nope".into(), &mut store, &mut out),
            Err(CliError::TaskNotFound(_))
        ));
        assert!(matches!(
            handle_edit("nope".into(), None, vec![], &mut store, &mut out),
            Err(CliError::TaskNotFound(_))
        ));
    }

    #[test]
    fn edit_with_unknown_subtask_changes_nothing() {
        let mut store = store();
        let id = store.add_task("Trip").unwrap();
        let mut out = Vec::new();

        let result = handle_edit(
            id.clone(),
            Some("Renamed".into()),
            vec![("missing".into(), "x".into())],
            &mut store,
            &mut out,
        );
        assert!(matches!(result, Err(CliError::SubtaskNotFound { .. })));
        assert_eq!(store.task(&id).unwrap().text, "Trip");
    }

    #[test]
    fn stats_output() {
        let mut store = store();
        let id = store.add_task("A").unwrap();
        let sub = store.add_subtask(&id, "a1").unwrap();
        store.toggle_subtask(&id, &sub);

        let mut out = Vec::new();
        handle_stats(&store, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("Done:      1"));
        assert!(text.contains("Overall:   100%"));
    }

    #[test]
    fn journal_add_rejects_blank() {
        let mut journal = JournalStore::open(Arc::new(MemoryStore::new()));
        let mut out = Vec::new();
        let result = handle_journal(JournalCommand::Add { text: " ".into() }, &mut journal, &mut out);
        assert!(matches!(result, Err(CliError::JournalError(JournalError::EmptyEntry))));

        handle_journal(JournalCommand::Add { text: "Sunny".into() }, &mut journal, &mut out).unwrap();
        let mut listing = Vec::new();
        handle_journal(JournalCommand::List, &mut journal, &mut listing).unwrap();
        assert!(output(listing).contains("Sunny"));
    }
}
