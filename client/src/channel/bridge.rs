use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ChannelReply;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

/// Sentinel a wallet returns when the user aborts a request.
pub const CANCELED: &str = "canceled";

/// Calls into page-side wallet objects (`"ExtensionWallet.Obj.login"` and the like).
///
/// The browser host implements this over JS interop; tests script it.
#[async_trait(?Send)]
pub trait WalletBridge {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> WalletResult<Value>;
}

/// The page URL and navigation.
pub trait Navigator {
    fn current_url(&self) -> String;

    /// Leaves the page. Nothing after this is guaranteed to run in a browser.
    fn navigate_to(&self, url: &str) -> WalletResult<()>;

    /// Rewrites the visible URL without reloading.
    fn replace_url(&self, url: &str);
}

/// One page-side wallet object and the calls every bridge-backed wallet understands.
#[derive(Clone)]
pub(crate) struct BridgeEndpoint {
    bridge: Arc<dyn WalletBridge>,
    namespace: &'static str,
}

impl BridgeEndpoint {
    pub(crate) fn new(bridge: Arc<dyn WalletBridge>, namespace: &'static str) -> Self {
        Self { bridge, namespace }
    }

    pub(crate) async fn call(&self, method: &str, args: Vec<Value>) -> WalletResult<Value> {
        let path = format!("{}.{}", self.namespace, method);
        self.bridge.invoke(&path, args).await
    }

    pub(crate) async fn login(
        &self,
        auth_token: &AuthToken,
        extra: Vec<Value>,
    ) -> WalletResult<ChannelReply<AccountToken>> {
        let mut args = vec![Value::String(auth_token.as_str().to_string())];
        args.extend(extra);
        decode_reply(self.call("login", args).await?)
    }

    pub(crate) async fn sign(
        &self,
        request: &TransactionRequest,
    ) -> WalletResult<ChannelReply<SignedTransaction>> {
        decode_reply(self.call("signTransaction", vec![request.0.clone()]).await?)
    }

    pub(crate) async fn sign_batch(
        &self,
        requests: &[TransactionRequest],
    ) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
        let batch = Value::Array(requests.iter().map(|r| r.0.clone()).collect());
        let reply = decode_reply::<Vec<SignedTransaction>>(
            self.call("signTransactions", vec![batch]).await?,
        )?;
        if let ChannelReply::Completed(signed) = &reply {
            if signed.len() != requests.len() {
                return Err(WalletError::MalformedResult(format!(
                    "Wallet signed {} of {} transactions",
                    signed.len(),
                    requests.len()
                )));
            }
        }
        Ok(reply)
    }

    pub(crate) async fn logout(&self) -> WalletResult<()> {
        self.call("logout", Vec::new()).await.map(|_| ())
    }

    pub(crate) async fn notify_cancellation(&self) -> WalletResult<()> {
        self.call("transactionCanceled", Vec::new()).await.map(|_| ())
    }
}

/// Interprets a wallet reply: the cancellation sentinel, a JSON string, or a value.
pub(crate) fn decode_reply<T: DeserializeOwned>(value: Value) -> WalletResult<ChannelReply<T>> {
    match value {
        Value::String(raw) if raw == CANCELED => Ok(ChannelReply::Canceled),
        Value::String(raw) => Ok(ChannelReply::Completed(serde_json::from_str(&raw)?)),
        Value::Null => Err(WalletError::MalformedResult(
            "Wallet returned no result".to_string(),
        )),
        other => Ok(ChannelReply::Completed(serde_json::from_value(other)?)),
    }
}

/// Reads the readiness flag returned by `init`-style calls. Only an explicit `false`
/// means not ready; objects that resolve with nothing are ready.
pub(crate) fn expect_ready(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}
