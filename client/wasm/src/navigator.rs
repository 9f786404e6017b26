use dapp_wallet_lib::{Navigator, WalletError, WalletResult};
use wasm_bindgen::JsValue;

use crate::error::describe;

/// Page URL access through `window.location` and `window.history`.
pub struct BrowserNavigator;

impl BrowserNavigator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BrowserNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for BrowserNavigator {
    fn current_url(&self) -> String {
        web_sys::window()
            .and_then(|window| window.location().href().ok())
            .unwrap_or_default()
    }

    fn navigate_to(&self, url: &str) -> WalletResult<()> {
        let window = web_sys::window()
            .ok_or_else(|| WalletError::TransportFailure("no window".to_string()))?;
        window
            .location()
            .set_href(url)
            .map_err(|e| WalletError::TransportFailure(describe(&e)))
    }

    fn replace_url(&self, url: &str) {
        let replaced = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|window| window.history())
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = replaced {
            log::warn!("Could not rewrite page URL: {}", describe(&e));
        }
    }
}
