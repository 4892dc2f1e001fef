use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::datetime;
use crate::filter::FilterMode;
use crate::storage::Persistence;
use crate::store::TaskStore;
use crate::task::{Priority, TaskId};
use crate::theme::{Theme, ThemeController};
use crate::view::{self, ListView};

/// Events raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SubmitTask {
        text: String,
        priority: Priority,
        date: Option<NaiveDate>,
    },
    ToggleTask(TaskId),
    DeleteTask(TaskId),
    ClearCompleted,
    SelectFilter(FilterMode),
    ToggleTheme,
}

/// Application state: the task store, the selected filter and the theme.
pub struct App {
    store: TaskStore,
    filter: FilterMode,
    themes: ThemeController,
    tz: Option<Tz>,
}

impl App {
    #[tracing::instrument(skip(persistence, tz))]
    pub fn open(
        persistence: Persistence,
        filter: FilterMode,
        tz: Option<Tz>,
    ) -> anyhow::Result<Self> {
        let store = TaskStore::open(persistence.clone())?;
        let themes = ThemeController::load(persistence)?;
        info!(
            tasks = store.tasks().len(),
            theme = %themes.current(),
            filter = %filter,
            "app state loaded"
        );
        Ok(Self {
            store,
            filter,
            themes,
            tz,
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn theme(&self) -> Theme {
        self.themes.current()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        datetime::today(self.tz, now)
    }

    /// Lower bound for date pickers.
    pub fn min_date(&self, now: DateTime<Utc>) -> NaiveDate {
        datetime::min_date(self.today(now))
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> ListView {
        view::build(self.store.tasks(), self.filter, self.today(now))
    }

    /// Applies one event and returns the redrawn list.
    #[tracing::instrument(skip(self, now))]
    pub fn handle(&mut self, event: Event, now: DateTime<Utc>) -> anyhow::Result<ListView> {
        match event {
            Event::SubmitTask {
                text,
                priority,
                date,
            } => {
                self.store.add(&text, priority, date, now)?;
            }
            Event::ToggleTask(id) => {
                self.store.toggle_completed(id)?;
            }
            Event::DeleteTask(id) => {
                self.store.delete(id)?;
            }
            Event::ClearCompleted => {
                self.store.clear_completed()?;
            }
            Event::SelectFilter(mode) => {
                debug!(from = %self.filter, to = %mode, "filter selected");
                self.filter = mode;
            }
            Event::ToggleTheme => {
                self.themes.toggle()?;
            }
        }

        Ok(self.snapshot(now))
    }
}
