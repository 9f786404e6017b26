use std::sync::Arc;

use super::bridge::{expect_ready, BridgeEndpoint, WalletBridge};
use super::ChannelReply;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

const NAMESPACE: &str = "WebWallet.Obj";

/// Web wallet driven through an object the page script exposes.
pub struct InPageChannel {
    endpoint: BridgeEndpoint,
}

impl InPageChannel {
    pub fn new(bridge: Arc<dyn WalletBridge>) -> Self {
        Self {
            endpoint: BridgeEndpoint::new(bridge, NAMESPACE),
        }
    }

    pub async fn initialize(&self) -> WalletResult<()> {
        let ready = self.endpoint.call("init", Vec::new()).await?;
        if !expect_ready(&ready) {
            return Err(WalletError::TransportFailure(
                "Web wallet could not be initialized".to_string(),
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
