use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::bridge::{expect_ready, BridgeEndpoint, WalletBridge};
use super::ChannelReply;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

const NAMESPACE: &str = "HardwareWallet.Obj";

/// Paired hardware device. Nothing but `initialize` works until the device reported
/// itself ready; authentication signs a challenge for the selected address index.
pub struct HardwareChannel {
    endpoint: BridgeEndpoint,
    ready: AtomicBool,
    selected: Mutex<Option<usize>>,
}

impl HardwareChannel {
    pub fn new(bridge: Arc<dyn WalletBridge>) -> Self {
        Self {
            endpoint: BridgeEndpoint::new(bridge, NAMESPACE),
            ready: AtomicBool::new(false),
            selected: Mutex::new(None),
        }
    }

    /// Detects the device and checks it is unlocked with the right app open.
    pub async fn initialize(&self) -> WalletResult<()> {
        self.ready.store(false, Ordering::SeqCst);
        let ready = self
            .endpoint
            .call("prepLedger", Vec::new())
            .await
            .map_err(|e| WalletError::DeviceUnavailable(e.to_string()))?;
        if !expect_ready(&ready) {
            return Err(WalletError::DeviceUnavailable(
                "Hardware wallet is not connected or locked".to_string(),
            ));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Addresses `page * page_size .. (page + 1) * page_size` derived on the device.
    pub async fn list_addresses(&self, page: usize, page_size: usize) -> WalletResult<Vec<String>> {
        self.ensure_ready()?;
        let reply = self
            .endpoint
            .call(
                "getLedgerAddresses",
                vec![Value::from(page as u64), Value::from(page_size as u64)],
            )
            .await
            .map_err(|e| WalletError::DeviceUnavailable(e.to_string()))?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Picks the global address index the next authentication signs for.
    pub fn select_address(&self, index: usize) {
        *self.selected.lock() = Some(index);
    }

    pub fn selected_address(&self) -> Option<usize> {
        *self.selected.lock()
    }

    pub async fn authenticate(
        &self,
        auth_token: &AuthToken,
    ) -> WalletResult<ChannelReply<AccountToken>> {
        self.ensure_ready()?;
        let index = self.selected_address().ok_or_else(|| {
            WalletError::DeviceUnavailable("No hardware wallet address selected".to_string())
        })?;
        self.endpoint
            .login(auth_token, vec![Value::from(index as u64)])
            .await
    }

    pub async fn sign(
        &self,
        request: &TransactionRequest,
    ) -> WalletResult<ChannelReply<SignedTransaction>> {
        self.ensure_ready()?;
        self.endpoint.sign(request).await
    }

    pub async fn sign_batch(
        &self,
        requests: &[TransactionRequest],
    ) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
        self.ensure_ready()?;
        self.endpoint.sign_batch(requests).await
    }

    pub async fn logout(&self) -> WalletResult<()> {
        self.ready.store(false, Ordering::SeqCst);
        self.endpoint.logout().await
    }

    pub async fn notify_cancellation(&self) -> WalletResult<()> {
        self.endpoint.notify_cancellation().await
    }

    fn ensure_ready(&self) -> WalletResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(WalletError::DeviceUnavailable(
                "Hardware wallet has not been initialized".to_string(),
            ))
        }
    }
}
