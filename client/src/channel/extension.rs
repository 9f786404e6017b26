use std::sync::Arc;

use serde_json::Value;

use super::bridge::{expect_ready, BridgeEndpoint, WalletBridge};
use super::ChannelReply;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

const NAMESPACE: &str = "ExtensionWallet.Obj";

/// Browser-extension wallet reached through the API it injects into the page.
pub struct ExtensionChannel {
    endpoint: BridgeEndpoint,
}

impl ExtensionChannel {
    pub fn new(bridge: Arc<dyn WalletBridge>) -> Self {
        Self {
            endpoint: BridgeEndpoint::new(bridge, NAMESPACE),
        }
    }

    /// Attaches to the extension. With `prior_address` the extension resumes the
    /// session it already paired for that account instead of prompting again.
    pub async fn initialize(&self, prior_address: Option<&str>) -> WalletResult<()> {
        let args = match prior_address {
            Some(address) if !address.is_empty() => vec![Value::String(address.to_string())],
            _ => Vec::new(),
        };
        let ready = self.endpoint.call("init", args).await?;
        if !expect_ready(&ready) {
            return Err(WalletError::TransportFailure(
                "Wallet extension is not available".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn authenticate(
        &self,
        auth_token: &AuthToken,
    ) -> WalletResult<ChannelReply<AccountToken>> {
        self.endpoint.login(auth_token, Vec::new()).await
    }

    pub async fn sign(
        &self,
        request: &TransactionRequest,
    ) -> WalletResult<ChannelReply<SignedTransaction>> {
        self.endpoint.sign(request).await
    }

    pub async fn sign_batch(
        &self,
        requests: &[TransactionRequest],
    ) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
        self.endpoint.sign_batch(requests).await
    }

    pub async fn logout(&self) -> WalletResult<()> {
        self.endpoint.logout().await
    }

    pub async fn notify_cancellation(&self) -> WalletResult<()> {
        self.endpoint.notify_cancellation().await
    }
}
