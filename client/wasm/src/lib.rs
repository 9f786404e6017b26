//! dApp wallet session client for the browser.
//!
//! Wires the session core to `sessionStorage`/`localStorage`, `window.location` and the
//! wallet objects the page exposes, and exports a promise-based handle to JavaScript.

use std::rc::Rc;
use std::sync::Arc;

use dapp_wallet_lib::{
    ClientConfig, DappContext, ExternalWalletEvent, HardwareAddressPager, HostAdapters,
    PagerState, ResumeOutcome, SessionEvent, SignOutcome, TransactionRequest, WalletKind,
    WalletSession,
};
use js_sys::{Function, Promise};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

mod bridge;
mod error;
mod navigator;
mod store;

pub use bridge::JsBridge;
pub use error::{WasmError, WasmResult};
pub use navigator::BrowserNavigator;
pub use store::BrowserStore;

use bridge::to_js;

/// Overrides accepted by the [`WalletHandle`] constructor. Anything omitted keeps the
/// development defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HandleOptions {
    environment: Option<String>,
    backend_url: Option<String>,
    gateway_url: Option<String>,
    redirect_v1_url: Option<String>,
    redirect_v2_url: Option<String>,
    hardware_page_size: Option<usize>,
}

impl HandleOptions {
    fn into_config(self) -> ClientConfig {
        let mut config = ClientConfig::new(
            self.environment
                .unwrap_or_else(|| "development".to_string()),
        );
        if let Some(url) = self.backend_url {
            config.backend.base_url = url;
        }
        if let Some(url) = self.gateway_url {
            config.network.gateway_url = url;
        }
        if let Some(url) = self.redirect_v1_url {
            config.wallets.redirect_v1_url = url;
        }
        if let Some(url) = self.redirect_v2_url {
            config.wallets.redirect_v2_url = url;
        }
        if let Some(size) = self.hardware_page_size {
            config.wallets.hardware_page_size = size;
        }
        config
    }
}

fn sign_outcome_json(outcome: &SignOutcome) -> Value {
    match outcome {
        SignOutcome::Submitted(receipt) => json!({
            "status": "submitted",
            "batchId": receipt.batch_id.to_string(),
            "hashes": receipt.hashes,
        }),
        SignOutcome::Canceled => json!({ "status": "canceled" }),
        SignOutcome::Redirected => json!({ "status": "redirected" }),
        SignOutcome::Abandoned => json!({ "status": "abandoned" }),
    }
}

fn resume_outcome_json(outcome: &ResumeOutcome) -> Value {
    match outcome {
        ResumeOutcome::Idle => json!({ "kind": "idle" }),
        ResumeOutcome::Login { connected } => json!({ "kind": "login", "connected": connected }),
        ResumeOutcome::Signing(signing) => json!({
            "kind": "signing",
            "result": sign_outcome_json(signing),
        }),
    }
}

fn event_json(event: &SessionEvent) -> Value {
    match event {
        SessionEvent::Connected { address } => json!({ "type": "connected", "address": address }),
        SessionEvent::Disconnected => json!({ "type": "disconnected" }),
        SessionEvent::Notice(message) => json!({ "type": "notice", "message": message }),
    }
}

fn pager_state_label(state: PagerState) -> &'static str {
    match state {
        PagerState::Loading => "loading",
        PagerState::List => "list",
        PagerState::Verify => "verify",
        PagerState::Error => "error",
    }
}

fn pager_json(pager: &HardwareAddressPager) -> Value {
    let page = pager.page();
    json!({
        "state": pager_state_label(pager.state()),
        "pageIndex": page.page_index,
        "pageSize": page.page_size,
        "addresses": page.addresses,
        "selected": page.selected,
        "error": pager.error(),
    })
}

fn parse_kind(label: &str) -> WasmResult<WalletKind> {
    WalletKind::from_label(label)
        .ok_or_else(|| WasmError::new("UNKNOWN_WALLET", format!("Unknown wallet type: {}", label)))
}

fn json_to_js(value: &Value) -> Result<JsValue, JsValue> {
    to_js(value).map_err(|e| WasmError::from(e).into())
}

/// The page's wallet session.
#[wasm_bindgen]
pub struct WalletHandle {
    context: Rc<DappContext>,
}

impl WalletHandle {
    fn session(&self) -> Arc<WalletSession> {
        self.context.session().clone()
    }
}

#[wasm_bindgen]
impl WalletHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WalletHandle, JsValue> {
        let options: HandleOptions = if options.is_undefined() || options.is_null() {
            HandleOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(WasmError::from)?
        };
        let host = HostAdapters {
            store: Arc::new(BrowserStore::new()),
            bridge: Arc::new(JsBridge::new().map_err(WasmError::from)?),
            navigator: Arc::new(BrowserNavigator::new()),
        };
        let context = DappContext::new(options.into_config(), host).map_err(WasmError::from)?;
        Ok(WalletHandle {
            context: Rc::new(context),
        })
    }

    /// Finishes any redirect round trip the page was reloaded for.
    pub fn initialize(&self) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            let outcome = session.initialize().await;
            json_to_js(&resume_outcome_json(&outcome))
        })
    }

    /// Resolves to whether the session ended up connected. Redirect wallets leave the
    /// page instead of resolving meaningfully.
    pub fn connect(&self, wallet_type: String) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            let kind = parse_kind(&wallet_type)?;
            session.connect(kind).await;
            Ok(JsValue::from_bool(session.is_connected()))
        })
    }

    #[wasm_bindgen(js_name = signTransaction)]
    pub fn sign_transaction(&self, request: JsValue, title: Option<String>) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            let request: TransactionRequest =
                serde_wasm_bindgen::from_value(request).map_err(WasmError::from)?;
            let outcome = session
                .sign_transaction(&request, title.as_deref().unwrap_or_default())
                .await
                .map_err(WasmError::from)?;
            json_to_js(&sign_outcome_json(&outcome))
        })
    }

    #[wasm_bindgen(js_name = signTransactions)]
    pub fn sign_transactions(&self, requests: JsValue, title: Option<String>) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            let requests: Vec<TransactionRequest> =
                serde_wasm_bindgen::from_value(requests).map_err(WasmError::from)?;
            let outcome = session
                .sign_transactions(&requests, title.as_deref().unwrap_or_default())
                .await
                .map_err(WasmError::from)?;
            json_to_js(&sign_outcome_json(&outcome))
        })
    }

    pub fn disconnect(&self) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            session.disconnect().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Forwards a login or logout the wallet performed on its own. `payload` is the raw
    /// account token JSON for `"connected"`.
    #[wasm_bindgen(js_name = walletEvent)]
    pub fn wallet_event(&self, kind: String, payload: Option<String>) -> Promise {
        let session = self.session();
        future_to_promise(async move {
            let event = match kind.as_str() {
                "connected" => ExternalWalletEvent::Connected(payload.unwrap_or_default()),
                "disconnected" => ExternalWalletEvent::Disconnected,
                other => {
                    return Err(
                        WasmError::new("UNKNOWN_EVENT", format!("Unknown wallet event: {}", other))
                            .into(),
                    )
                }
            };
            session.handle_external_event(event).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Calls `callback` with every session event until the handle is dropped.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: Function) {
        let mut events = self.context.session().subscribe();
        spawn_local(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let payload = match json_to_js(&event_json(&event)) {
                            Ok(payload) => payload,
                            Err(_) => continue,
                        };
                        if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                            log::warn!("Session event listener threw: {}", error::describe(&e));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Session event listener skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    #[wasm_bindgen(js_name = isConnected)]
    pub fn is_connected(&self) -> bool {
        self.context.session().is_connected()
    }

    pub fn address(&self) -> Option<String> {
        self.context.session().address()
    }

    #[wasm_bindgen(js_name = walletType)]
    pub fn wallet_type(&self) -> Option<String> {
        self.context
            .session()
            .active_kind()
            .map(|kind| kind.label().to_string())
    }

    #[wasm_bindgen(js_name = accessToken)]
    pub fn access_token(&self) -> Option<String> {
        self.context
            .session()
            .access_token()
            .map(|token| token.expose().to_string())
    }

    #[wasm_bindgen(js_name = hardwarePager)]
    pub fn hardware_pager(&self) -> HardwarePagerHandle {
        HardwarePagerHandle {
            pager: Rc::new(Mutex::new(self.context.hardware_pager())),
            session: self.session(),
        }
    }
}

/// Hardware address picker. Every call resolves to the pager's current view.
#[wasm_bindgen]
pub struct HardwarePagerHandle {
    pager: Rc<Mutex<HardwareAddressPager>>,
    session: Arc<WalletSession>,
}

#[wasm_bindgen]
impl HardwarePagerHandle {
    pub fn start(&self) -> Promise {
        let pager = self.pager.clone();
        future_to_promise(async move {
            let mut pager = pager.lock().await;
            pager.start().await;
            json_to_js(&pager_json(&pager))
        })
    }

    pub fn next(&self) -> Promise {
        let pager = self.pager.clone();
        future_to_promise(async move {
            let mut pager = pager.lock().await;
            pager.next().await;
            json_to_js(&pager_json(&pager))
        })
    }

    pub fn prev(&self) -> Promise {
        let pager = self.pager.clone();
        future_to_promise(async move {
            let mut pager = pager.lock().await;
            pager.prev().await;
            json_to_js(&pager_json(&pager))
        })
    }

    pub fn select(&self, local: usize) -> Promise {
        let pager = self.pager.clone();
        future_to_promise(async move {
            let mut pager = pager.lock().await;
            pager.select(local);
            json_to_js(&pager_json(&pager))
        })
    }

    pub fn confirm(&self) -> Promise {
        let pager = self.pager.clone();
        let session = self.session.clone();
        future_to_promise(async move {
            let mut pager = pager.lock().await;
            pager.confirm(&session).await;
            json_to_js(&pager_json(&pager))
        })
    }
}

#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"dApp wallet module loaded".into());
}
