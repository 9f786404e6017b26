//! Key/value persistence split into a session scope and a durable scope.
//!
//! The session scope lives as long as the browser tab (it survives a reload, which is
//! what redirect-based wallets rely on) and is wiped on disconnect. The durable scope
//! outlives the session and holds provider pairing artifacts.

pub mod file;
pub mod keys;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::WalletResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageScope {
    Session,
    Durable,
}

/// Raw string storage primitive. Implementations hold no business logic.
pub trait SessionStore {
    fn get_raw(&self, scope: StorageScope, key: &str) -> WalletResult<Option<String>>;
    fn set_raw(&self, scope: StorageScope, key: &str, value: &str) -> WalletResult<()>;
    fn remove(&self, scope: StorageScope, key: &str) -> WalletResult<()>;
    fn keys(&self, scope: StorageScope) -> WalletResult<Vec<String>>;
}

/// Typed helpers layered over any [`SessionStore`].
pub trait StoreExt: SessionStore {
    /// Reads a JSON value, returning `T::default()` when the key is missing.
    ///
    /// A present but undecodable value is an error; callers that treat corruption like
    /// absence use `unwrap_or_default()`.
    fn get_item<T>(&self, scope: StorageScope, key: &str) -> WalletResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.get_raw(scope, key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(T::default()),
        }
    }

    fn set_item<T>(&self, scope: StorageScope, key: &str, value: &T) -> WalletResult<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value)?;
        self.set_raw(scope, key, &encoded)
    }

    /// Reads a value stored verbatim (not JSON encoded). Missing keys read as `""`.
    fn get_string(&self, scope: StorageScope, key: &str) -> WalletResult<String> {
        Ok(self.get_raw(scope, key)?.unwrap_or_default())
    }

    fn set_string(&self, scope: StorageScope, key: &str, value: &str) -> WalletResult<()> {
        self.set_raw(scope, key, value)
    }

    /// Removes every key in `scope` starting with `prefix`, returning how many went.
    fn remove_prefixed(&self, scope: StorageScope, prefix: &str) -> WalletResult<usize> {
        let doomed: Vec<String> = self
            .keys(scope)?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in &doomed {
            self.remove(scope, key)?;
        }
        Ok(doomed.len())
    }
}

impl<S: SessionStore + ?Sized> StoreExt for S {}
