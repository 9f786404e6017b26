//! `sessionStorage` / `localStorage` backed [`SessionStore`].

use dapp_wallet_lib::{SessionStore, StorageScope, WalletError, WalletResult};
use web_sys::Storage;

use crate::error::describe;

/// Session scope maps to `sessionStorage`, durable scope to `localStorage`.
pub struct BrowserStore;

impl BrowserStore {
    pub fn new() -> Self {
        Self
    }

    fn area(&self, scope: StorageScope) -> WalletResult<Storage> {
        let window = web_sys::window()
            .ok_or_else(|| WalletError::StorageError("no window".to_string()))?;
        let area = match scope {
            StorageScope::Session => window.session_storage(),
            StorageScope::Durable => window.local_storage(),
        };
        area.map_err(|e| WalletError::StorageError(describe(&e)))?
            .ok_or_else(|| WalletError::StorageError(format!("{:?} storage is disabled", scope)))
    }
}

impl Default for BrowserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_error(error: wasm_bindgen::JsValue) -> WalletError {
    WalletError::StorageError(describe(&error))
}

impl SessionStore for BrowserStore {
    fn get_raw(&self, scope: StorageScope, key: &str) -> WalletResult<Option<String>> {
        self.area(scope)?.get_item(key).map_err(storage_error)
    }

    fn set_raw(&self, scope: StorageScope, key: &str, value: &str) -> WalletResult<()> {
        self.area(scope)?.set_item(key, value).map_err(storage_error)
    }

    fn remove(&self, scope: StorageScope, key: &str) -> WalletResult<()> {
        self.area(scope)?.remove_item(key).map_err(storage_error)
    }

    fn keys(&self, scope: StorageScope) -> WalletResult<Vec<String>> {
        let area = self.area(scope)?;
        let length = area.length().map_err(storage_error)?;
        let mut keys = Vec::with_capacity(length as usize);
        for index in 0..length {
            if let Some(key) = area.key(index).map_err(storage_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
