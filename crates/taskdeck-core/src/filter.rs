use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{
  trace,
  warn
};

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum FilterMode {
  #[default]
  All,
  Active,
  Completed
}

impl FilterMode {
  pub fn as_str(self) -> &'static str {
    match self {
      | FilterMode::All => "all",
      | FilterMode::Active => "active",
      | FilterMode::Completed => {
        "completed"
      }
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterMode::All => true,
      | FilterMode::Active => {
        !task.completed
      }
      | FilterMode::Completed => {
        task.completed
      }
    }
  }

  /// Boundary helper: unknown modes
  /// fall back to `All`.
  pub fn parse_or_default(
    raw: &str
  ) -> Self {
    match raw.parse() {
      | Ok(mode) => mode,
      | Err(err) => {
        warn!(
          error = %err,
          "unknown filter mode; \
           showing all tasks"
        );
        FilterMode::All
      }
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(FilterMode::All),
      | "active" => {
        Ok(FilterMode::Active)
      }
      | "completed" => {
        Ok(FilterMode::Completed)
      }
      | other => {
        Err(anyhow!(
          "unknown filter mode: \
           {other}"
        ))
      }
    }
  }
}

/// Tasks visible under `mode`, in
/// collection order.
pub fn filter(
  tasks: &[Task],
  mode: FilterMode
) -> Vec<&Task> {
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| mode.matches(task))
    .collect();
  trace!(
    mode = %mode,
    total = tasks.len(),
    visible = out.len(),
    "filtered tasks"
  );
  out
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    FilterMode,
    filter
  };
  use crate::task::{
    Priority,
    Task,
    TaskId
  };

  fn sample() -> Vec<Task> {
    let now = Utc
      .with_ymd_and_hms(
        2025, 9, 10, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let mk = |id: u64,
              text: &str,
              done: bool| {
      Task::new_pending(
        TaskId(id),
        text.to_string(),
        Priority::Medium,
        None,
        now
      )
      .with_completed(done)
    };
    vec![
      mk(4, "d", true),
      mk(3, "c", false),
      mk(2, "b", true),
      mk(1, "a", false),
    ]
  }

  fn texts(
    tasks: Vec<&Task>
  ) -> Vec<&str> {
    tasks
      .into_iter()
      .map(|t| t.text.as_str())
      .collect()
  }

  #[test]
  fn all_is_identity_and_idempotent() {
    let tasks = sample();
    let first =
      filter(&tasks, FilterMode::All);
    let second =
      filter(&tasks, FilterMode::All);
    assert_eq!(first, second);
    assert_eq!(
      texts(first),
      vec!["d", "c", "b", "a"]
    );
  }

  #[test]
  fn active_and_completed_keep_order() {
    let tasks = sample();
    assert_eq!(
      texts(filter(
        &tasks,
        FilterMode::Active
      )),
      vec!["c", "a"]
    );
    assert_eq!(
      texts(filter(
        &tasks,
        FilterMode::Completed
      )),
      vec!["d", "b"]
    );
  }

  #[test]
  fn parses_modes_case_insensitively() {
    assert_eq!(
      "Active"
        .parse::<FilterMode>()
        .expect("parse"),
      FilterMode::Active
    );
    assert!(
      "done"
        .parse::<FilterMode>()
        .is_err()
    );
    assert_eq!(
      FilterMode::parse_or_default(
        "done"
      ),
      FilterMode::All
    );
    assert_eq!(
      FilterMode::parse_or_default(
        "completed"
      ),
      FilterMode::Completed
    );
  }
}
