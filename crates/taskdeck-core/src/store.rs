use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::storage::Persistence;
use crate::task::{Priority, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCounts {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
}

/// Owns the task collection, newest first. Every mutation is written
/// through to persistence before returning.
pub struct TaskStore {
    tasks: Vec<Task>,
    last_id: u64,
    persistence: Persistence,
}

impl TaskStore {
    #[tracing::instrument(skip(persistence))]
    pub fn open(persistence: Persistence) -> anyhow::Result<Self> {
        let tasks = persistence.load_tasks()?;
        let last_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        info!(count = tasks.len(), last_id, "opened task store");
        Ok(Self {
            tasks,
            last_id,
            persistence,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids come from the creation time in milliseconds but never repeat or
    /// go backwards, even within one millisecond.
    fn next_id(&mut self, now: DateTime<Utc>) -> TaskId {
        let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = stamp.max(self.last_id.saturating_add(1));
        self.last_id = id;
        TaskId(id)
    }

    /// Returns `None` without touching anything when `text` is blank.
    #[tracing::instrument(skip(self, text, now), fields(priority = %priority))]
    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("rejected blank task text");
            return Ok(None);
        }

        let id = self.next_id(now);
        let task = Task::new_pending(id, text.to_string(), priority, date, now);
        self.tasks.insert(0, task.clone());
        self.persist()?;

        debug!(id = %id, count = self.tasks.len(), "task added");
        Ok(Some(task))
    }

    /// Swaps in a new collection with the matching task flipped. Unknown ids
    /// are a no-op.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completed(&mut self, id: TaskId) -> anyhow::Result<bool> {
        if self.get(id).is_none() {
            debug!("toggle on unknown id ignored");
            return Ok(false);
        }

        let next: Vec<Task> = self
            .tasks
            .iter()
            .map(|task| {
                if task.id == id {
                    task.with_completed(!task.completed)
                } else {
                    task.clone()
                }
            })
            .collect();
        self.tasks = next;
        self.persist()?;
        Ok(true)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: TaskId) -> anyhow::Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!("delete on unknown id ignored");
            return Ok(false);
        }

        self.persist()?;
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> anyhow::Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(Task::is_active);
        let removed = before - self.tasks.len();
        self.persist()?;

        info!(removed, remaining = self.tasks.len(), "cleared completed tasks");
        Ok(removed)
    }

    pub fn count(&self) -> TaskCounts {
        count_tasks(&self.tasks)
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.persistence.save_tasks(&self.tasks)
    }
}

pub fn count_tasks(tasks: &[Task]) -> TaskCounts {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    TaskCounts {
        active: total - completed,
        completed,
        total,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::TaskStore;
    use crate::storage::{KeyValueStore, Persistence};
    use crate::task::{Priority, TaskId};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn store() -> (TaskStore, Persistence) {
        let persistence = Persistence::in_memory();
        let store = TaskStore::open(persistence.clone()).expect("open store");
        (store, persistence)
    }

    #[test]
    fn add_prepends_and_persists() {
        let (mut store, persistence) = store();
        let now = fixed_now();

        store
            .add("A", Priority::Medium, None, now)
            .expect("add A");
        store
            .add("  B  ", Priority::Medium, None, now + Duration::seconds(1))
            .expect("add B");

        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "A"]);
        assert_eq!(persistence.load_tasks().expect("reload"), store.tasks());
    }

    #[test]
    fn blank_text_is_rejected_without_writing() {
        let (mut store, persistence) = store();

        let added = store
            .add("   ", Priority::High, None, fixed_now())
            .expect("add");
        assert!(added.is_none());
        assert!(store.is_empty());
        assert!(persistence.backend().get("tasks").expect("get").is_none());
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let (mut store, _) = store();
        let now = fixed_now();

        let first = store.add("one", Priority::Low, None, now).expect("add");
        let second = store.add("two", Priority::Low, None, now).expect("add");
        let third = store
            .add("three", Priority::Low, None, now - Duration::seconds(5))
            .expect("add");

        let ids: Vec<u64> = [first, second, third]
            .into_iter()
            .map(|t| t.expect("added").id.0)
            .collect();
        assert_eq!(ids[0], u64::try_from(now.timestamp_millis()).expect("positive"));
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
    }

    #[test]
    fn ids_continue_after_reload() {
        let persistence = Persistence::in_memory();
        let now = fixed_now();
        let first_id = {
            let mut store = TaskStore::open(persistence.clone()).expect("open");
            store
                .add("kept", Priority::Low, None, now)
                .expect("add")
                .expect("added")
                .id
        };

        let mut reopened = TaskStore::open(persistence).expect("reopen");
        let second = reopened
            .add("later", Priority::Low, None, now - Duration::hours(1))
            .expect("add")
            .expect("added");
        assert!(second.id > first_id);
    }

    #[test]
    fn toggle_flips_only_the_matching_task() {
        let (mut store, persistence) = store();
        let now = fixed_now();
        let a = store
            .add("A", Priority::Medium, None, now)
            .expect("add")
            .expect("added");
        store
            .add("B", Priority::Medium, None, now)
            .expect("add");

        assert!(store.toggle_completed(a.id).expect("toggle"));
        assert!(store.get(a.id).expect("present").completed);
        assert_eq!(store.tasks().iter().filter(|t| t.completed).count(), 1);
        assert_eq!(persistence.load_tasks().expect("reload"), store.tasks());

        assert!(store.toggle_completed(a.id).expect("toggle back"));
        assert!(!store.get(a.id).expect("present").completed);
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let (mut store, _) = store();
        store
            .add("A", Priority::Medium, None, fixed_now())
            .expect("add");
        let before = store.tasks().to_vec();

        assert!(!store.toggle_completed(TaskId(42)).expect("toggle"));
        assert!(!store.delete(TaskId(42)).expect("delete"));
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn delete_and_clear_completed() {
        let (mut store, _) = store();
        let now = fixed_now();
        let ids: Vec<TaskId> = ["a", "b", "c", "d"]
            .iter()
            .map(|text| {
                store
                    .add(text, Priority::Medium, None, now)
                    .expect("add")
                    .expect("added")
                    .id
            })
            .collect();

        assert!(store.delete(ids[0]).expect("delete"));
        store.toggle_completed(ids[1]).expect("toggle");
        store.toggle_completed(ids[3]).expect("toggle");

        assert_eq!(store.clear_completed().expect("clear"), 2);
        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["c"]);

        let counts = store.count();
        assert_eq!((counts.active, counts.completed, counts.total), (1, 0, 1));
    }
}
