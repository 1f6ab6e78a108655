//! Monitor task persistence.
//!
//! The store owns each task's `last_signal`. The monitor reads it, compares
//! it with the freshly classified signal, and writes it back through
//! [`TaskStore::update_last_signal`]; the engine never touches it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sigwatch_core::domain::{Period, SignalKind};
use sigwatch_core::signals::IndicatorSpec;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("task '{0}' already exists")]
    Duplicate(String),

    #[error("no task with id '{0}'")]
    NotFound(String),
}

/// One watched symbol/period/indicator combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorTask {
    pub id: String,
    pub symbol: String,
    pub period: Period,
    pub spec: IndicatorSpec,
    /// Where the notifier should deliver alerts (chat id, channel, ...).
    pub destination: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub last_signal: Option<SignalKind>,
}

fn default_enabled() -> bool {
    true
}

impl MonitorTask {
    pub fn new(symbol: &str, period: Period, spec: IndicatorSpec, destination: &str) -> Self {
        Self {
            id: Self::make_id(symbol, period, &spec),
            symbol: symbol.to_string(),
            period,
            spec,
            destination: destination.to_string(),
            enabled: true,
            last_signal: None,
        }
    }

    /// `<symbol>_<period>_<INDICATOR>`, e.g. `600519_60min_MACD_DIV`.
    pub fn make_id(symbol: &str, period: Period, spec: &IndicatorSpec) -> String {
        format!("{symbol}_{}_{}", period.code(), spec.kind().name())
    }
}

/// Persistence contract for monitor tasks.
pub trait TaskStore {
    fn list(&self) -> Vec<MonitorTask>;
    fn get(&self, id: &str) -> Option<MonitorTask>;
    fn add(&mut self, task: MonitorTask) -> Result<(), StoreError>;
    fn remove(&mut self, id: &str) -> Result<MonitorTask, StoreError>;
    fn update_last_signal(&mut self, id: &str, signal: SignalKind) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskFile {
    tasks: Vec<MonitorTask>,
}

/// JSON file store: `{ "tasks": [...] }`, rewritten after every mutation.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    tasks: Vec<MonitorTask>,
}

impl JsonTaskStore {
    /// Open an existing file, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<TaskFile>(&content)
                    .map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?
                    .tasks
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), tasks = tasks.len(), "opened task store");
        Ok(Self { path, tasks })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = TaskFile {
            tasks: self.tasks.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl TaskStore for JsonTaskStore {
    fn list(&self) -> Vec<MonitorTask> {
        self.tasks.clone()
    }

    fn get(&self, id: &str) -> Option<MonitorTask> {
        self.tasks.iter().find(|t| t.id == id).cloned()
    }

    fn add(&mut self, task: MonitorTask) -> Result<(), StoreError> {
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(StoreError::Duplicate(task.id));
        }
        debug!(id = %task.id, "adding task");
        self.tasks.push(task);
        self.save()
    }

    fn remove(&mut self, id: &str) -> Result<MonitorTask, StoreError> {
        let idx = self.position(id)?;
        let task = self.tasks.remove(idx);
        self.save()?;
        Ok(task)
    }

    fn update_last_signal(&mut self, id: &str, signal: SignalKind) -> Result<(), StoreError> {
        let idx = self.position(id)?;
        self.tasks[idx].last_signal = Some(signal);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigwatch_core::domain::{IndicatorKind, Polarity};

    fn task(symbol: &str, kind: IndicatorKind) -> MonitorTask {
        MonitorTask::new(symbol, Period::Min60, IndicatorSpec::default_for(kind), "chat-1")
    }

    #[test]
    fn id_format() {
        let t = task("600519", IndicatorKind::MacdDivergence);
        assert_eq!(t.id, "600519_60min_MACD_DIV");
        assert!(t.enabled);
        assert!(t.last_signal.is_none());
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTaskStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonTaskStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("A", IndicatorKind::Macd)).unwrap();
        let err = store.add(task("A", IndicatorKind::Macd)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "A_60min_MACD"));
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonTaskStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(matches!(store.remove("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_last_signal_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = JsonTaskStore::open(&path).unwrap();
        store.add(task("A", IndicatorKind::Kdj)).unwrap();
        let kind = SignalKind::new(IndicatorKind::Kdj, Polarity::Bearish);
        store.update_last_signal("A_60min_KDJ", kind).unwrap();

        let reopened = JsonTaskStore::open(&path).unwrap();
        assert_eq!(reopened.get("A_60min_KDJ").unwrap().last_signal, Some(kind));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonTaskStore::open(&path), Err(StoreError::Corrupt { .. })));
    }
}
