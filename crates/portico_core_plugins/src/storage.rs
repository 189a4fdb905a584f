//! Key-value storage collaborator.
//!
//! Components persist instance state across reconnects through a
//! path-addressed JSON store:
//!
//! - [`KeyValueStore`] - the backend seam (`get` / `put` / `delete` by path)
//! - [`MemoryStore`] - bundled in-process backend
//! - [`StorageAPI`] - build-time slot where a plugin may install a backend
//! - [`Storage`] - global resource handed to components at runtime
//! - [`StoragePlugin`] - wires the above together
//!
//! Paths are `/`-separated and absolute. `get` and `delete` address a whole
//! subtree: the entry at `path` itself plus every entry under `path/`.
//!
//! # Example
//!
//! ```
//! use portico_core_plugins::{MemoryStore, Storage};
//! use serde_json::json;
//!
//! let storage = Storage::new(MemoryStore::new());
//! storage.put("/notes/a", json!("first")).unwrap();
//! storage.put("/notes/b", json!("second")).unwrap();
//!
//! assert_eq!(storage.get("/notes").unwrap().len(), 2);
//! storage.delete("/notes/a").unwrap();
//! assert_eq!(storage.get("/notes").unwrap().len(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use portico_system::api::API;
use portico_system::plugin::Plugin;
use portico_system::resource::GlobalResource;
use portico_system::server::Server;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The path is empty or not absolute.
    #[error("invalid storage path '{0}': paths must start with '/'")]
    InvalidPath(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Backend for [`Storage`].
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns every entry at `path` or beneath it, keyed by full path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be read.
    fn get(&self, path: &str) -> Result<BTreeMap<String, Value>, StorageError>;

    /// Stores `value` at `path`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be written.
    fn put(&self, path: &str, value: Value) -> Result<(), StorageError>;

    /// Removes the entry at `path` and every entry beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be written.
    fn delete(&self, path: &str) -> Result<(), StorageError>;
}

fn in_subtree(key: &str, path: &str) -> bool {
    let prefix = path.trim_end_matches('/');
    key == path
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn validate(path: &str) -> Result<(), StorageError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory [`KeyValueStore`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, path: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| in_subtree(key, path))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn put(&self, path: &str, value: Value) -> Result<(), StorageError> {
        self.entries.write().insert(path.to_string(), value);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.entries.write().retain(|key, _| !in_subtree(key, path));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Resource
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime handle to the configured [`KeyValueStore`]. Cloning is cheap.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl GlobalResource for Storage {}

impl core::fmt::Debug for Storage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl Storage {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: impl KeyValueStore) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wraps a shared backend.
    #[must_use]
    pub fn from_shared(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns every entry at or beneath `path`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path or a backend failure.
    pub fn get(&self, path: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        validate(path)?;
        self.backend.get(path)
    }

    /// Stores `value` at `path`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path or a backend failure.
    pub fn put(&self, path: &str, value: Value) -> Result<(), StorageError> {
        validate(path)?;
        self.backend.put(path, value)
    }

    /// Removes the subtree at `path`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path or a backend failure.
    pub fn delete(&self, path: &str) -> Result<(), StorageError> {
        validate(path)?;
        self.backend.delete(path)
    }

    /// Reads the single entry stored exactly at `path` as `T`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path, a backend failure or a value that does not
    /// deserialize into `T`.
    pub fn load<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StorageError> {
        match self.get(path)?.remove(path) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes `value` and stores it at `path`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path, a backend failure or a serialization error.
    pub fn store<T: Serialize>(&self, path: &str, value: &T) -> Result<(), StorageError> {
        self.put(path, serde_json::to_value(value)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StorageAPI / StoragePlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Build-time slot for the storage backend.
///
/// A plugin that depends on [`StoragePlugin`] may call
/// [`set_backend`](Self::set_backend) during `build()`; the last call wins.
#[derive(Default)]
pub struct StorageAPI {
    backend: Mutex<Option<Arc<dyn KeyValueStore>>>,
}

impl API for StorageAPI {}

impl StorageAPI {
    /// Replaces the backend used once the server is ready.
    pub fn set_backend(&self, backend: Arc<dyn KeyValueStore>) {
        *self.backend.lock() = Some(backend);
    }

    fn take(&self) -> Option<Arc<dyn KeyValueStore>> {
        self.backend.lock().take()
    }
}

/// Provides the [`Storage`] global resource.
///
/// Defaults to a fresh [`MemoryStore`].
#[derive(Clone, Default)]
pub struct StoragePlugin {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl StoragePlugin {
    /// Uses the given backend instead of a [`MemoryStore`].
    #[must_use]
    pub fn with_store(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }
}

impl Plugin for StoragePlugin {
    fn build(&self, server: &mut Server) {
        let api = StorageAPI::default();
        if let Some(backend) = &self.backend {
            api.set_backend(Arc::clone(backend));
        }
        server.insert_api(api);
    }

    fn ready(&self, server: &mut Server) {
        let storage = match server.api::<StorageAPI>().and_then(StorageAPI::take) {
            Some(backend) => Storage::from_shared(backend),
            None => Storage::default(),
        };
        server.insert_global(storage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subtree_matching() {
        assert!(in_subtree("/a/b", "/a"));
        assert!(in_subtree("/a", "/a"));
        assert!(in_subtree("/a/b", "/a/"));
        assert!(!in_subtree("/ab", "/a"));
        assert!(in_subtree("/a", "/"));
    }

    #[test]
    fn get_returns_subtree_only() {
        let storage = Storage::default();
        storage.put("/portico/x/1", json!(1)).unwrap();
        storage.put("/portico/x/2", json!(2)).unwrap();
        storage.put("/portico/xy", json!(3)).unwrap();

        let found = storage.get("/portico/x").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["/portico/x/2"], json!(2));
    }

    #[test]
    fn delete_removes_subtree() {
        let storage = Storage::default();
        storage.put("/s", json!("root")).unwrap();
        storage.put("/s/child", json!("child")).unwrap();
        storage.put("/t", json!("other")).unwrap();

        storage.delete("/s").unwrap();
        assert!(storage.get("/s").unwrap().is_empty());
        assert_eq!(storage.get("/t").unwrap().len(), 1);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let storage = Storage::default();
        assert!(matches!(
            storage.put("notes", json!(null)),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn typed_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Note {
            text: String,
        }

        let storage = Storage::default();
        let note = Note { text: "hi".into() };
        storage.store("/note", &note).unwrap();
        assert_eq!(storage.load::<Note>("/note").unwrap(), Some(note));
        assert_eq!(storage.load::<Note>("/missing").unwrap(), None);
    }

    #[test]
    fn plugin_backend_can_be_replaced_during_build() {
        struct SharedBackend(Arc<MemoryStore>);
        impl Plugin for SharedBackend {
            fn build(&self, server: &mut Server) {
                server
                    .api::<StorageAPI>()
                    .unwrap()
                    .set_backend(self.0.clone());
            }
            fn dependencies(&self) -> Vec<portico_system::plugin::PluginId> {
                vec![portico_system::plugin::PluginId::of::<StoragePlugin>()]
            }
        }

        let shared = Arc::new(MemoryStore::new());
        let mut server = Server::new();
        server
            .add_plugins(SharedBackend(shared.clone()))
            .add_plugins(StoragePlugin::default());
        server.finish();

        let storage = server.get_global::<Storage>().unwrap();
        storage.put("/k", json!(true)).unwrap();
        assert_eq!(shared.get("/k").unwrap().len(), 1);
    }
}
