use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{SessionStore, StorageScope};
use crate::errors::{WalletError, WalletResult};

/// Store for native hosts: the durable scope is a JSON file on disk, the session scope
/// lives in memory and disappears with the process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    session: RwLock<BTreeMap<String, String>>,
    durable: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or lazily creates) the durable file at `path`.
    pub fn open(path: impl AsRef<Path>) -> WalletResult<Self> {
        let path = path.as_ref().to_path_buf();
        let durable = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                WalletError::StorageError(format!(
                    "Durable store {} is unreadable: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            session: RwLock::new(BTreeMap::new()),
            durable: RwLock::new(durable),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> WalletResult<()> {
        let serialized = serde_json::to_vec_pretty(entries)?;
        let dir = self
            .path
            .parent()
            .ok_or_else(|| WalletError::StorageError("Invalid store path".to_string()))?;
        fs::create_dir_all(dir)?;

        let tmp_path = self.path.with_extension("new");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get_raw(&self, scope: StorageScope, key: &str) -> WalletResult<Option<String>> {
        let value = match scope {
            StorageScope::Session => self.session.read().get(key).cloned(),
            StorageScope::Durable => self.durable.read().get(key).cloned(),
        };
        Ok(value)
    }

    fn set_raw(&self, scope: StorageScope, key: &str, value: &str) -> WalletResult<()> {
        match scope {
            StorageScope::Session => {
                self.session
                    .write()
                    .insert(key.to_string(), value.to_string());
                Ok(())
            }
            StorageScope::Durable => {
                let mut durable = self.durable.write();
                durable.insert(key.to_string(), value.to_string());
                self.persist(&durable)
            }
        }
    }

    fn remove(&self, scope: StorageScope, key: &str) -> WalletResult<()> {
        match scope {
            StorageScope::Session => {
                self.session.write().remove(key);
                Ok(())
            }
            StorageScope::Durable => {
                let mut durable = self.durable.write();
                if durable.remove(key).is_some() {
                    self.persist(&durable)?;
                }
                Ok(())
            }
        }
    }

    fn keys(&self, scope: StorageScope) -> WalletResult<Vec<String>> {
        let keys = match scope {
            StorageScope::Session => self.session.read().keys().cloned().collect(),
            StorageScope::Durable => self.durable.read().keys().cloned().collect(),
        };
        Ok(keys)
    }
}
