use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String, // unique among siblings only
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default, with = "due_date")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl Subtask {
    pub fn new(id: String, text: String) -> Self {
        Self {
            id,
            text,
            completed: false,
        }
    }
}

impl Task {
    pub fn new(id: String, text: String) -> Self {
        Self {
            id,
            text,
            subtasks: Vec::new(),
            due_date: None,
        }
    }

    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    /// Rounded percentage of completed subtasks, 0 when there are none
    pub fn completion_percentage(&self) -> u32 {
        let total = self.subtasks.len();
        if total == 0 {
            return 0;
        }
        (self.completed_subtasks() as f64 * 100.0 / total as f64).round() as u32
    }

    /// A task with no subtasks is never done
    pub fn is_fully_done(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.completed)
    }

    /// Due strictly before `today` and not fully done
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.is_fully_done(),
            None => false,
        }
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

impl JournalEntry {
    pub fn new(id: String, text: String) -> Self {
        Self {
            id,
            text,
            date: Utc::now(),
        }
    }
}

/// Due dates are written as `YYYY-MM-DD`. Older data stored full RFC 3339
/// timestamps, which are read back as their local calendar date.
mod due_date {
    use chrono::{DateTime, Local, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        if let Ok(date) = NaiveDate::parse_from_str(&raw, FORMAT) {
            return Ok(Some(date));
        }

        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| Some(ts.with_timezone(&Local).date_naive()))
            .map_err(|e| D::Error::custom(format!("invalid due date '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn task_with(flags: &[bool]) -> Task {
        let mut task = Task::new("t".to_string(), "Task".to_string());
        for (i, done) in flags.iter().enumerate() {
            let mut sub = Subtask::new(format!("s{}", i), format!("Sub {}", i));
            sub.completed = *done;
            task.subtasks.push(sub);
        }
        task
    }

    #[rstest]
    #[case(&[], 0)]
    #[case(&[false, false], 0)]
    #[case(&[true, false], 50)]
    #[case(&[true, false, false], 33)]
    #[case(&[true, true, false], 67)]
    #[case(&[true, true, true], 100)]
    fn completion_percentage_rounds(#[case] flags: &[bool], #[case] expected: u32) {
        assert_eq!(task_with(flags).completion_percentage(), expected);
    }

    #[test]
    fn task_without_subtasks_is_never_done() {
        assert!(!task_with(&[]).is_fully_done());
        assert!(task_with(&[true]).is_fully_done());
        assert!(!task_with(&[true, false]).is_fully_done());
    }

    #[test]
    fn overdue_requires_past_date_and_open_work() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        let mut task = task_with(&[false]);
        assert!(!task.is_overdue(today));

        task.due_date = Some(today);
        assert!(!task.is_overdue(today));

        task.due_date = Some(yesterday);
        assert!(task.is_overdue(today));

        task.subtasks[0].completed = true;
        assert!(!task.is_overdue(today));

        // no subtasks means never done, so a past due date is overdue
        let mut empty = task_with(&[]);
        empty.due_date = Some(yesterday);
        assert!(empty.is_overdue(today));
    }

    #[test]
    fn round_trip_keeps_due_dates_typed() {
        let mut task = task_with(&[true, false]);
        task.due_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let tasks = vec![task, task_with(&[])];

        let json = serde_json::to_string(&tasks).unwrap();
        assert!(json.contains("\"dueDate\":\"2025-01-31\""));
        assert!(json.contains("\"dueDate\":null"));

        let parsed: Vec<Task> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tasks);
    }

    #[test]
    fn reads_timestamp_due_dates() {
        let json = r#"[{"id":"1","text":"a","subtasks":[],"dueDate":"2025-03-01T12:00:00.000Z"}]"#;
        let parsed: Vec<Task> = serde_json::from_str(json).unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-03-01T12:00:00.000Z")
            .unwrap()
            .with_timezone(&chrono::Local)
            .date_naive();
        assert_eq!(parsed[0].due_date, Some(expected));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"[{"id":"1","text":"a","subtasks":[{"id":"s1","text":"b"}]}]"#;
        let parsed: Vec<Task> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].due_date, None);
        assert!(!parsed[0].subtasks[0].completed);
    }

    #[test]
    fn rejects_garbage_due_date() {
        let json = r#"[{"id":"1","text":"a","subtasks":[],"dueDate":"next tuesday"}]"#;
        assert!(serde_json::from_str::<Vec<Task>>(json).is_err());
    }
}
