//! Durable "already completed" markers, one per study.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use study_core::{ErrorInfo, StudyError};

/// Value written under a study's completion key.
pub const COMPLETED_VALUE: &str = "true";

/// Storage key of a study's completion marker.
pub fn completion_key(study_id: &str) -> String {
    format!("{study_id}_completed")
}

/// String key-value storage that survives the session.
///
/// Failures are reported, but the session treats them as "no persistence"
/// and never blocks participation on them.
pub trait CompletionStore: Debug {
    /// Value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StudyError>;

    /// Writes `value` under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StudyError>;

    /// Whether a non-empty marker exists for `study_id`.
    fn is_completed(&self, study_id: &str) -> Result<bool, StudyError> {
        Ok(self
            .get(&completion_key(study_id))?
            .is_some_and(|value| !value.is_empty()))
    }

    /// Writes the marker for `study_id`.
    fn mark_completed(&mut self, study_id: &str) -> Result<(), StudyError> {
        self.set(&completion_key(study_id), COMPLETED_VALUE)
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    unavailable: bool,
}

impl MemoryStore {
    /// Empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every access fails, like storage in a private window.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Snapshot of every entry.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.borrow().clone()
    }

    fn check_available(&self) -> Result<(), StudyError> {
        if self.unavailable {
            return Err(StudyError::Storage(ErrorInfo::new(
                "storage-unavailable",
                "storage is not accessible",
            )));
        }
        Ok(())
    }
}

impl CompletionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StudyError> {
        self.check_available()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StudyError> {
        self.check_available()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a flat JSON object in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StudyError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            StudyError::Storage(
                ErrorInfo::new("storage-read", "failed to read completion store")
                    .with_context("path", self.path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            StudyError::Storage(
                ErrorInfo::new("storage-corrupt", "completion store is not a JSON object")
                    .with_context("path", self.path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }
}

impl CompletionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StudyError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StudyError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        let serialized = serde_json::to_string_pretty(&entries).map_err(|err| {
            StudyError::Storage(
                ErrorInfo::new("storage-encode", "failed to encode completion store")
                    .with_hint(err.to_string()),
            )
        })?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    StudyError::Storage(
                        ErrorInfo::new("storage-write", "failed to create store directory")
                            .with_context("path", parent.display().to_string())
                            .with_hint(err.to_string()),
                    )
                })?;
            }
        }
        fs::write(&self.path, serialized).map_err(|err| {
            StudyError::Storage(
                ErrorInfo::new("storage-write", "failed to write completion store")
                    .with_context("path", self.path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }
}
