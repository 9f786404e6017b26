use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{SessionStore, StorageScope};
use crate::errors::WalletResult;

/// In-process store for both scopes.
///
/// Cloning the `Arc` that holds it and handing it to a fresh `WalletSession` is how a
/// page reload is reproduced outside the browser.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(StorageScope, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every key in `scope`, as closing the tab does for the session scope.
    pub fn clear(&self, scope: StorageScope) {
        self.entries.write().retain(|(s, _), _| *s != scope);
    }

    /// Copy of all entries, ordered by scope then key.
    pub fn snapshot(&self) -> BTreeMap<(StorageScope, String), String> {
        self.entries.read().clone()
    }
}

impl SessionStore for MemoryStore {
    fn get_raw(&self, scope: StorageScope, key: &str) -> WalletResult<Option<String>> {
        Ok(self.entries.read().get(&(scope, key.to_string())).cloned())
    }

    fn set_raw(&self, scope: StorageScope, key: &str, value: &str) -> WalletResult<()> {
        self.entries
            .write()
            .insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, scope: StorageScope, key: &str) -> WalletResult<()> {
        self.entries.write().remove(&(scope, key.to_string()));
        Ok(())
    }

    fn keys(&self, scope: StorageScope) -> WalletResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|(s, _)| *s == scope)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_only_affects_one_scope() {
        let store = MemoryStore::new();
        store.set_raw(StorageScope::Session, "a", "1").unwrap();
        store.set_raw(StorageScope::Durable, "b", "2").unwrap();

        store.clear(StorageScope::Session);

        assert_eq!(store.get_raw(StorageScope::Session, "a").unwrap(), None);
        assert_eq!(
            store.get_raw(StorageScope::Durable, "b").unwrap(),
            Some("2".to_string())
        );
    }
}
