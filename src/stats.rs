use chrono::NaiveDate;

use crate::models::Task;

/// Current local calendar date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Aggregate progress over a task snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total_tasks: usize,
    /// Tasks with at least one subtask, all of them completed
    pub completed_tasks: usize,
    pub total_subtasks: usize,
    pub completed_subtasks: usize,
    pub overdue_tasks: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total_tasks += 1;
            stats.total_subtasks += task.subtasks.len();
            stats.completed_subtasks += task.completed_subtasks();
            if task.is_fully_done() {
                stats.completed_tasks += 1;
            }
            if task.is_overdue(today) {
                stats.overdue_tasks += 1;
            }
            stats
        })
    }

    /// Percentage of fully done tasks
    pub fn overall_completion(&self) -> f64 {
        percentage(self.completed_tasks, self.total_tasks)
    }

    /// Percentage of completed subtasks across all tasks
    pub fn subtask_completion(&self) -> f64 {
        percentage(self.completed_subtasks, self.total_subtasks)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subtask;
    use pretty_assertions::assert_eq;

    fn task(id: &str, flags: &[bool], due: Option<NaiveDate>) -> Task {
        let mut task = Task::new(id.to_string(), id.to_string());
        task.subtasks = flags
            .iter()
            .enumerate()
            .map(|(i, done)| Subtask {
                id: format!("s{}", i),
                text: String::new(),
                completed: *done,
            })
            .collect();
        task.due_date = due;
        task
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        let stats = TaskStats::from_tasks(&[], today());
        assert_eq!(stats, TaskStats::default());
        assert_eq!(stats.overall_completion(), 0.0);
        assert_eq!(stats.subtask_completion(), 0.0);
    }

    #[test]
    fn counts_across_tasks() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let past = NaiveDate::from_ymd_opt(2025, 6, 1);
        let future = NaiveDate::from_ymd_opt(2025, 7, 1);

        let tasks = vec![
            task("done", &[true, true], past),
            task("open-late", &[true, false], past),
            task("bare-late", &[], past),
            task("open-later", &[false], future),
        ];
        let stats = TaskStats::from_tasks(&tasks, today);

        assert_eq!(
            stats,
            TaskStats {
                total_tasks: 4,
                completed_tasks: 1,
                total_subtasks: 5,
                completed_subtasks: 3,
                overdue_tasks: 2,
            }
        );
        assert_eq!(stats.overall_completion(), 25.0);
        assert_eq!(stats.subtask_completion(), 60.0);
    }
}
