//! [`WalletBridge`] over page globals such as `window.ExtensionWallet.Obj`.

use async_trait::async_trait;
use dapp_wallet_lib::{WalletBridge, WalletError, WalletResult};
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::describe;

/// Resolves dotted method paths against `window` and awaits promise results.
pub struct JsBridge {
    root: JsValue,
}

impl JsBridge {
    pub fn new() -> WalletResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| WalletError::TransportFailure("no window".to_string()))?;
        Ok(Self {
            root: window.into(),
        })
    }

    /// Bridge rooted at an arbitrary object; used to inject wallet shims.
    pub fn with_root(root: JsValue) -> Self {
        Self { root }
    }

    /// Returns the function at `path` together with the object it is called on.
    fn resolve(&self, path: &str) -> WalletResult<(JsValue, Function)> {
        let mut owner = self.root.clone();
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let next = Reflect::get(&owner, &JsValue::from_str(segment))
                .map_err(|e| WalletError::TransportFailure(describe(&e)))?;
            if next.is_undefined() || next.is_null() {
                return Err(WalletError::TransportFailure(format!(
                    "{} is not available on this page",
                    path
                )));
            }
            if segments.peek().is_none() {
                let function = next.dyn_into::<Function>().map_err(|_| {
                    WalletError::TransportFailure(format!("{} is not callable", path))
                })?;
                return Ok((owner, function));
            }
            owner = next;
        }
        Err(WalletError::TransportFailure("empty method path".to_string()))
    }
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

#[async_trait(?Send)]
impl WalletBridge for JsBridge {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> WalletResult<Value> {
        let (this, function) = self.resolve(method)?;
        let js_args = Array::new();
        for arg in &args {
            let converted =
                to_js(arg).map_err(|e| WalletError::TransportFailure(e.to_string()))?;
            js_args.push(&converted);
        }

        log::debug!("Calling {}", method);
        let returned = function
            .apply(&this, &js_args)
            .map_err(|e| WalletError::TransportFailure(format!("{}: {}", method, describe(&e))))?;
        let settled = match returned.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise).await.map_err(|e| {
                WalletError::TransportFailure(format!("{}: {}", method, describe(&e)))
            })?,
            Err(plain) => plain,
        };

        serde_wasm_bindgen::from_value(settled)
            .map_err(|e| WalletError::MalformedResult(format!("{}: {}", method, e)))
    }
}
