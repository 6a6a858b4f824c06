//! Durable key-value slots backing the analytics store.
//!
//! The engine persists through this narrow seam so hosts can map it onto
//! whatever durable storage they have. Two implementations ship here: a
//! JSON-file store for standalone use and an in-memory store for tests and
//! ephemeral embedding.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::AutomationError;

/// Synchronous durable key-value storage.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, AutomationError>;
    fn save(&self, key: &str, value: &str) -> Result<(), AutomationError>;
    fn remove(&self, key: &str) -> Result<(), AutomationError>;
}

/// One JSON file per key under a base directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AutomationError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AutomationError::Storage(format!("creating {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, AutomationError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AutomationError::Storage(format!("reading {key}: {e}"))),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AutomationError> {
        std::fs::write(self.path_for(key), value)
            .map_err(|e| AutomationError::Storage(format!("writing {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), AutomationError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AutomationError::Storage(format!("removing {key}: {e}"))),
        }
    }
}

/// Volatile store for tests and hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.slots.lock().expect("store lock poisoned").get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AutomationError> {
        self.slots
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AutomationError> {
        self.slots.lock().expect("store lock poisoned").remove(key);
        Ok(())
    }
}
