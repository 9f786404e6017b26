#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dapp_wallet_lib::storage::keys::{ACCESS_TOKEN, ACCOUNT_TOKEN, WALLET_KIND};
use dapp_wallet_lib::{
    AccessToken, AccountToken, ConnectionRequest, MemoryStore, Navigator, NetworkClient,
    SessionDeps, SignedTransaction, StorageScope, StoreExt, TokenExchange,
    TransactionStatus, TransactionSubmissionPipeline, TransactionsContainer, WalletBridge,
    WalletError, WalletKind, WalletProvidersConfig, WalletResult, WalletSession,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const DAPP_URL: &str = "https://dapp.example/swap";

type Responder = Box<dyn Fn(&[Value]) -> WalletResult<Value>>;

/// Page-side wallet objects answering from a script. Each method replies with the
/// queued values in order and repeats the last one; unscripted methods reply `null`.
/// A responder, when set, answers its method from the call arguments instead.
#[derive(Default)]
pub struct ScriptedBridge {
    script: Mutex<HashMap<String, Vec<WalletResult<Value>>>>,
    responders: Mutex<HashMap<String, Responder>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    yield_first: bool,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call yields to the executor once before answering.
    pub fn yielding() -> Self {
        Self {
            yield_first: true,
            ..Self::default()
        }
    }

    pub fn on(&self, method: &str, reply: WalletResult<Value>) -> &Self {
        self.script
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(reply);
        self
    }

    pub fn respond_with(
        &self,
        method: &str,
        responder: impl Fn(&[Value]) -> WalletResult<Value> + 'static,
    ) -> &Self {
        self.responders
            .lock()
            .insert(method.to_string(), Box::new(responder));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait(?Send)]
impl WalletBridge for ScriptedBridge {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> WalletResult<Value> {
        self.calls.lock().push((method.to_string(), args.clone()));
        if self.yield_first {
            tokio::task::yield_now().await;
        }
        if let Some(respond) = self.responders.lock().get(method) {
            return respond(&args);
        }
        let mut script = self.script.lock();
        match script.get_mut(method) {
            Some(replies) if replies.len() > 1 => replies.remove(0),
            Some(replies) => replies[0].clone(),
            None => Ok(Value::Null),
        }
    }
}

/// Browser location stand-in. Navigating away records the target and leaves the
/// current URL alone, since the test process never actually unloads.
pub struct FakeNavigator {
    current: Mutex<String>,
    visited: Mutex<Vec<String>>,
    fail_navigation: Mutex<bool>,
}

impl FakeNavigator {
    pub fn new(url: &str) -> Self {
        Self {
            current: Mutex::new(url.to_string()),
            visited: Mutex::new(Vec::new()),
            fail_navigation: Mutex::new(false),
        }
    }

    /// The URL the signer sends the browser back to.
    pub fn land_on(&self, url: &str) {
        *self.current.lock() = url.to_string();
    }

    pub fn current(&self) -> String {
        self.current.lock().clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    pub fn refuse_navigation(&self) {
        *self.fail_navigation.lock() = true;
    }
}

impl Navigator for FakeNavigator {
    fn current_url(&self) -> String {
        self.current()
    }

    fn navigate_to(&self, url: &str) -> WalletResult<()> {
        if *self.fail_navigation.lock() {
            return Err(WalletError::TransportFailure("navigation blocked".into()));
        }
        self.visited.lock().push(url.to_string());
        Ok(())
    }

    fn replace_url(&self, url: &str) {
        *self.current.lock() = url.to_string();
    }
}

/// Backend that grants a fixed access token, or rejects every exchange.
pub struct FakeBackend {
    grant: Mutex<Option<String>>,
    requests: Mutex<Vec<ConnectionRequest>>,
}

impl FakeBackend {
    pub fn granting(token: &str) -> Self {
        Self {
            grant: Mutex::new(Some(token.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            grant: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ConnectionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait(?Send)]
impl TokenExchange for FakeBackend {
    async fn verify(&self, request: &ConnectionRequest) -> WalletResult<AccessToken> {
        self.requests.lock().push(request.clone());
        match self.grant.lock().clone() {
            Some(token) => Ok(AccessToken::new(token)),
            None => Err(WalletError::VerificationFailed("400 invalid signature".into())),
        }
    }
}

/// Gateway that hands out sequential hashes and remembers what it was sent.
#[derive(Default)]
pub struct FakeNetwork {
    broadcasts: Mutex<Vec<Vec<SignedTransaction>>>,
    next_hash: Mutex<usize>,
    statuses: Mutex<HashMap<String, TransactionStatus>>,
    offline: Mutex<bool>,
}

impl FakeNetwork {
    pub fn broadcasts(&self) -> Vec<Vec<SignedTransaction>> {
        self.broadcasts.lock().clone()
    }

    pub fn settle(&self, hash: &str, status: TransactionStatus) {
        self.statuses.lock().insert(hash.to_string(), status);
    }

    pub fn go_offline(&self) {
        *self.offline.lock() = true;
    }

    fn hash(&self) -> String {
        let mut next = self.next_hash.lock();
        *next += 1;
        format!("hash-{}", *next)
    }
}

#[async_trait(?Send)]
impl NetworkClient for FakeNetwork {
    async fn submit(&self, signed: &SignedTransaction) -> WalletResult<String> {
        if *self.offline.lock() {
            return Err(WalletError::NetworkError("gateway unreachable".into()));
        }
        self.broadcasts.lock().push(vec![signed.clone()]);
        Ok(self.hash())
    }

    async fn submit_batch(&self, signed: &[SignedTransaction]) -> WalletResult<Vec<String>> {
        if *self.offline.lock() {
            return Err(WalletError::NetworkError("gateway unreachable".into()));
        }
        self.broadcasts.lock().push(signed.to_vec());
        Ok(signed.iter().map(|_| self.hash()).collect())
    }

    async fn poll_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        Ok(self
            .statuses
            .lock()
            .get(hash)
            .copied()
            .unwrap_or(TransactionStatus::Pending))
    }
}

/// One browser tab: storage, page objects and services shared by every
/// `WalletSession` built from it, so building a second session is a page reload.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub bridge: Arc<ScriptedBridge>,
    pub navigator: Arc<FakeNavigator>,
    pub backend: Arc<FakeBackend>,
    pub network: Arc<FakeNetwork>,
    pub ledger: Arc<TransactionsContainer>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_bridge(ScriptedBridge::new())
    }

    pub fn with_bridge(bridge: ScriptedBridge) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            bridge: Arc::new(bridge),
            navigator: Arc::new(FakeNavigator::new(DAPP_URL)),
            backend: Arc::new(FakeBackend::granting("tok123")),
            network: Arc::new(FakeNetwork::default()),
            ledger: Arc::new(TransactionsContainer::new()),
        }
    }

    pub fn rejecting_backend(mut self) -> Self {
        self.backend = Arc::new(FakeBackend::rejecting());
        self
    }

    pub fn session(&self) -> WalletSession {
        WalletSession::new(SessionDeps {
            store: self.store.clone(),
            bridge: self.bridge.clone(),
            navigator: self.navigator.clone(),
            backend: self.backend.clone(),
            pipeline: TransactionSubmissionPipeline::new(
                self.network.clone(),
                self.ledger.clone(),
            ),
            providers: WalletProvidersConfig {
                redirect_v1_url: "https://wallet.example".into(),
                redirect_v2_url: "https://wallet2.example".into(),
                hardware_page_size: 10,
            },
        })
    }

    /// Writes what a previous page load leaves behind after a successful connect.
    pub fn seed_connected(&self, kind: WalletKind, address: &str) {
        self.store
            .set_string(StorageScope::Session, ACCESS_TOKEN, "tok123")
            .unwrap();
        self.store
            .set_item(
                StorageScope::Session,
                ACCOUNT_TOKEN,
                &AccountToken::new(address, "beef"),
            )
            .unwrap();
        self.store
            .set_string(StorageScope::Session, WALLET_KIND, kind.label())
            .unwrap();
    }

    pub fn session_value(&self, key: &str) -> Option<String> {
        self.store
            .snapshot()
            .get(&(StorageScope::Session, key.to_string()))
            .cloned()
    }

    pub fn durable_value(&self, key: &str) -> Option<String> {
        self.store
            .snapshot()
            .get(&(StorageScope::Durable, key.to_string()))
            .cloned()
    }
}

pub fn account_json(address: &str) -> Value {
    json!({ "address": address, "signature": "beef" })
}

pub fn requests(n: usize) -> Vec<dapp_wallet_lib::TransactionRequest> {
    (0..n)
        .map(|i| dapp_wallet_lib::TransactionRequest(json!({ "nonce": i, "value": "0" })))
        .collect()
}

pub fn signed(n: usize) -> Vec<SignedTransaction> {
    (0..n)
        .map(|i| SignedTransaction(json!({ "nonce": i, "signature": format!("{:02x}", i) })))
        .collect()
}
