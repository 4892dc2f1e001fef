use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;
use crate::theme::Theme;

pub const TASKS_KEY: &str = "tasks";
pub const THEME_KEY: &str = "theme";

/// String key-value storage the app persists into.
///
/// Backends are used from a single thread, so methods take `&self` and
/// in-memory backends use interior mutability.
pub trait KeyValueStore {
    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under a data directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.data"))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "key not present");
            return Ok(None);
        }

        let bytes =
            fs::read(&path).with_context(|| format!("failed reading {}", path.display()))?;
        match String::from_utf8(bytes) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) => {
                // Only strings are ever written, so non-UTF-8 content is
                // garbage and reads as if the key were never set.
                debug!(file = %path.display(), error = %err, "stored value is not valid UTF-8");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        write_atomic(&path, value).with_context(|| format!("failed to save key {key}"))
    }
}

fn write_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), "writing atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

/// Reads and writes the task collection and theme preference through a
/// [`KeyValueStore`].
#[derive(Clone)]
pub struct Persistence {
    backend: Rc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    /// Missing or malformed data loads as an empty collection.
    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let Some(raw) = self.backend.get(TASKS_KEY)? else {
            debug!("no stored tasks; starting empty");
            return Ok(Vec::new());
        };

        let tasks = match decode_tasks(&raw) {
            Ok(tasks) => tasks,
            Err(err) => {
                debug!(error = %err, "stored tasks are malformed; starting empty");
                return Ok(Vec::new());
            }
        };

        let loaded = tasks.len();
        let tasks = sanitize(tasks);
        debug!(loaded, kept = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let serialized = encode_tasks(tasks)?;
        self.backend
            .set(TASKS_KEY, &serialized)
            .context("failed to save tasks")
    }

    /// Anything other than a stored `"dark"` reads as light.
    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Theme> {
        let raw = self.backend.get(THEME_KEY)?;
        let theme = raw
            .as_deref()
            .and_then(Theme::from_storage)
            .unwrap_or_default();
        debug!(?theme, "loaded theme");
        Ok(theme)
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        self.backend
            .set(THEME_KEY, theme.storage_value())
            .context("failed to save theme")
    }
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string(tasks).context("failed to serialize tasks")
}

pub fn decode_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    serde_json::from_str(raw).context("failed to parse stored tasks")
}

/// Drops records that break the collection invariants: blank text and
/// repeated ids (first occurrence wins).
fn sanitize(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            if task.text.trim().is_empty() {
                debug!(id = %task.id, "dropping stored task with blank text");
                return false;
            }
            if !seen.insert(task.id) {
                debug!(id = %task.id, "dropping stored task with duplicate id");
                return false;
            }
            true
        })
        .collect()
}
