//! Persisted session storage.
//!
//! A store holds at most one `SessionContext` under a single key. Reads never
//! fail: a missing or unreadable entry is reported as `None`. Writes replace
//! the whole value.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use keyring::Entry;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::context::SessionContext;
use super::error::StoreError;
use crate::config::{Config, StorageBackend, APP_NAME};

pub trait SessionStore: Send + Sync {
    /// Current session, or `None` when absent or undecodable
    fn read(&self) -> Option<SessionContext>;

    /// Replace any stored session with `context`
    fn write(&self, context: &SessionContext) -> Result<(), StoreError>;

    /// Remove the stored session. Clearing an empty store is a no-op.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Open the store selected by `config.storage`
pub fn open_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config.storage {
        StorageBackend::File => Arc::new(FileSessionStore::new(config.data_dir()?, &config.storage_key)),
        StorageBackend::Keyring => Arc::new(KeyringSessionStore::new(&config.storage_key)?),
        StorageBackend::Memory => Arc::new(MemorySessionStore::new()),
    };
    debug!(backend = ?config.storage, key = %config.storage_key, "Session store opened");
    Ok(store)
}

/// JSON file named after the storage key, e.g. `AuthContext.json`.
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes writers against readers within this instance. Each write
    // goes through its own temp file, so other instances and processes
    // only ever see a whole file.
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            path: dir.into().join(format!("{}.json", key)),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Option<SessionContext> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Ignoring unparseable session file");
                None
            }
        }
    }

    fn write(&self, context: &SessionContext) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(context)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "Session written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// OS keychain entry holding the serialized session.
pub struct KeyringSessionStore {
    entry: Entry,
}

impl KeyringSessionStore {
    pub fn new(key: &str) -> Result<Self, StoreError> {
        Ok(Self {
            entry: Entry::new(APP_NAME, key)?,
        })
    }
}

impl SessionStore for KeyringSessionStore {
    fn read(&self) -> Option<SessionContext> {
        let secret = match self.entry.get_password() {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session from keychain");
                return None;
            }
        };
        serde_json::from_str(&secret)
            .map_err(|e| warn!(error = %e, "Ignoring unparseable keychain session"))
            .ok()
    }

    fn write(&self, context: &SessionContext) -> Result<(), StoreError> {
        let secret = serde_json::to_string(context)?;
        self.entry.set_password(&secret)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: RwLock<Option<SessionContext>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Option<SessionContext> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn write(&self, context: &SessionContext) -> Result<(), StoreError> {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(context.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
