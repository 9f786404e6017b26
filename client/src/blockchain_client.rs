/// Network gateway client used to broadcast signed transactions and read back their
/// status.
///
/// The gateway wraps every answer in a `{ data, error, code }` envelope; a missing
/// `data` or a non-empty `error` is a failed call.
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{
    GatewayResponse, SendMultipleData, SendTransactionData, TransactionStatusData,
};
use crate::config_store::NetworkConfig;
use crate::errors::{WalletError, WalletResult};
use crate::ledger::TransactionStatus;
use crate::transaction::SignedTransaction;

#[async_trait(?Send)]
pub trait NetworkClient {
    async fn submit(&self, signed: &SignedTransaction) -> WalletResult<String>;

    /// Hashes in submission order.
    async fn submit_batch(&self, signed: &[SignedTransaction]) -> WalletResult<Vec<String>>;

    async fn poll_status(&self, hash: &str) -> WalletResult<TransactionStatus>;
}

/// HTTP client for the network gateway.
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> WalletResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(30));
        let client = builder.build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(GatewayClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &NetworkConfig) -> WalletResult<Self> {
        Self::new(config.gateway_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> WalletResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::NetworkError(format!("HTTP request failed: {}", e)))?;
        unwrap_envelope(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> WalletResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::NetworkError(format!("HTTP request failed: {}", e)))?;
        unwrap_envelope(response).await
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> WalletResult<T> {
    let status = response.status();
    let envelope: GatewayResponse<T> = response.json().await.map_err(|e| {
        WalletError::NetworkError(format!("Failed to parse response ({}): {}", status, e))
    })?;
    parse_envelope(envelope)
}

fn parse_envelope<T>(envelope: GatewayResponse<T>) -> WalletResult<T> {
    if !envelope.error.is_empty() {
        return Err(WalletError::NetworkError(format!(
            "Gateway error {}: {}",
            envelope.code, envelope.error
        )));
    }
    envelope
        .data
        .ok_or_else(|| WalletError::InvalidResponse("No data in gateway response".to_string()))
}

#[async_trait(?Send)]
impl NetworkClient for GatewayClient {
    async fn submit(&self, signed: &SignedTransaction) -> WalletResult<String> {
        let data: SendTransactionData = self.post("/transaction/send", signed).await?;
        Ok(data.tx_hash)
    }

    async fn submit_batch(&self, signed: &[SignedTransaction]) -> WalletResult<Vec<String>> {
        let data: SendMultipleData = self.post("/transaction/send-multiple", signed).await?;
        Ok(data.ordered_hashes())
    }

    async fn poll_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let data: TransactionStatusData = self
            .get(&format!("/transaction/{}/status", hash))
            .await?;
        Ok(TransactionStatus::from_gateway(&data.status))
    }
}
