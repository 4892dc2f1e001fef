use chrono::NaiveDate;

use crate::datetime::format_date;
use crate::filter::{FilterMode, filter};
use crate::store::count_tasks;
use crate::task::{Priority, Task, TaskId};

/// Display-ready projection of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub completed: bool,
    pub text: String,
    pub date_label: Option<String>,
    pub priority: Priority,
    pub priority_label: &'static str,
}

/// Everything the presentation layer needs to draw the list. Rebuilt from
/// scratch after every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub filter: FilterMode,
    pub items: Vec<TaskView>,
    pub empty: bool,
    pub show_list: bool,
    pub active: usize,
    pub summary: String,
}

impl TaskView {
    fn from_task(task: &Task, today: NaiveDate) -> Self {
        Self {
            id: task.id,
            completed: task.completed,
            text: task.text.clone(),
            date_label: task.date.map(|date| format_date(Some(date), today)),
            priority: task.priority,
            priority_label: task.priority.label(),
        }
    }
}

pub fn summary_text(active: usize) -> String {
    format!("{active} task(s) remaining")
}

/// The summary counts active tasks in the whole collection, not just the
/// visible ones.
#[tracing::instrument(skip(tasks, today), fields(total = tasks.len()))]
pub fn build(tasks: &[Task], mode: FilterMode, today: NaiveDate) -> ListView {
    let items: Vec<TaskView> = filter(tasks, mode)
        .into_iter()
        .map(|task| TaskView::from_task(task, today))
        .collect();
    let active = count_tasks(tasks).active;
    let empty = items.is_empty();

    ListView {
        filter: mode,
        items,
        empty,
        show_list: !empty,
        active,
        summary: summary_text(active),
    }
}
