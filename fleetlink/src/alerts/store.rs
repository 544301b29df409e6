//! Local fallback store.
//!
//! A small key-value store holding the focal vehicle's last known position
//! and the accumulated list of locally recorded alerts. Values are JSON
//! strings; the typed [`FallbackStore`] wrapper owns the keys and formats.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;

use super::model::Alert;
use crate::geo::GeoPoint;

/// Key holding the focal vehicle's last known position.
pub const POSITION_KEY: &str = "currentVehiclePosition";

/// Key holding the JSON array of recorded alerts.
pub const ACCIDENTS_KEY: &str = "accidents";

/// Errors from the fallback store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write a value file.
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value could not be encoded or decoded.
    #[error("Invalid JSON for key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Directory-backed store: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `directory`. The directory is created on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| StoreError::Io {
            path: self.directory.clone(),
            source,
        })?;

        // Write atomically via temp file
        let path = self.key_path(key);
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, value).map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &path).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-memory store, used when no directory is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to the fallback keys.
#[derive(Clone)]
pub struct FallbackStore {
    inner: Arc<dyn KeyValueStore>,
}

impl FallbackStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// A file-backed store under `directory`.
    pub fn open(directory: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(directory)))
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Last persisted focal position. Unreadable values are logged and ignored.
    pub fn load_position(&self) -> Option<GeoPoint> {
        let raw = match self.inner.get(POSITION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored position");
                return None;
            }
        };
        match serde_json::from_str::<GeoPoint>(&raw) {
            Ok(position) if position.is_finite() => Some(position),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed stored position");
                None
            }
        }
    }

    /// Persist the focal position.
    pub fn save_position(&self, position: GeoPoint) -> Result<(), StoreError> {
        let json = serde_json::to_string(&position).map_err(|source| StoreError::Json {
            key: POSITION_KEY.to_string(),
            source,
        })?;
        self.inner.set(POSITION_KEY, &json)
    }

    /// All stored alerts, oldest first.
    ///
    /// Entries are decoded leniently; a malformed store yields an empty list.
    pub fn load_alerts(&self) -> Vec<Alert> {
        self.read_raw_alerts()
            .iter()
            .map(|value| crate::live::decode_alert(value, Utc::now()))
            .collect()
    }

    /// Append an alert to the stored list.
    ///
    /// Fails without writing when the existing list cannot be read, so stored
    /// history is never replaced.
    pub fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut entries = self.read_raw_alerts_strict()?;
        let value = serde_json::to_value(alert).map_err(|source| StoreError::Json {
            key: ACCIDENTS_KEY.to_string(),
            source,
        })?;
        entries.push(value);

        let json = serde_json::to_string(&entries).map_err(|source| StoreError::Json {
            key: ACCIDENTS_KEY.to_string(),
            source,
        })?;
        self.inner.set(ACCIDENTS_KEY, &json)
    }

    fn read_raw_alerts(&self) -> Vec<serde_json::Value> {
        match self.read_raw_alerts_strict() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable stored alerts");
                Vec::new()
            }
        }
    }

    fn read_raw_alerts_strict(&self) -> Result<Vec<serde_json::Value>, StoreError> {
        let Some(raw) = self.inner.get(ACCIDENTS_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            key: ACCIDENTS_KEY.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for FallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStore").finish_non_exhaustive()
    }
}
