//! Errors handed back to JavaScript.

use dapp_wallet_lib::WalletError;
use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub type WasmResult<T> = Result<T, WasmError>;

/// A `{ code, message }` object once it crosses into JS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmError {
    pub code: &'static str,
    pub message: String,
}

impl WasmError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<WalletError> for WasmError {
    fn from(error: WalletError) -> Self {
        let code = match &error {
            WalletError::TransportFailure(_) => "TRANSPORT_FAILURE",
            WalletError::MalformedResult(_) => "MALFORMED_RESULT",
            WalletError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            WalletError::VerificationFailed(_) => "VERIFICATION_FAILED",
            WalletError::NotConnected => "NOT_CONNECTED",
            WalletError::NetworkError(_) => "NETWORK_ERROR",
            WalletError::InvalidResponse(_) => "INVALID_RESPONSE",
            WalletError::StorageError(_) => "STORAGE_ERROR",
            WalletError::ConfigError(_) => "CONFIG_ERROR",
            WalletError::ValidationError(_) => "VALIDATION_ERROR",
        };
        Self::new(code, error.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for WasmError {
    fn from(error: serde_wasm_bindgen::Error) -> Self {
        Self::new("CONVERSION", error.to_string())
    }
}

impl From<WasmError> for JsValue {
    fn from(error: WasmError) -> Self {
        let object = Object::new();
        let _ = Reflect::set(&object, &"code".into(), &JsValue::from_str(error.code));
        let _ = Reflect::set(&object, &"message".into(), &JsValue::from_str(&error.message));
        object.into()
    }
}

/// Best-effort text for a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}
