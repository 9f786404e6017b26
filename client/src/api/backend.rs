/// Backend token exchange.
///
/// The dApp backend checks that an account token was signed over the auth token the
/// session generated and answers with an access token for its own API.
use async_trait::async_trait;
use reqwest::Client;

use super::types::{ConnectionRequest, ConnectionToken, ErrorBody};
use crate::config_store::BackendConfig;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::AccessToken;

#[async_trait(?Send)]
pub trait TokenExchange {
    /// Every failure, transport or rejection, comes back as `VerificationFailed`.
    async fn verify(&self, request: &ConnectionRequest) -> WalletResult<AccessToken>;
}

pub struct HttpTokenExchange {
    client: Client,
    verify_url: String,
}

impl HttpTokenExchange {
    pub fn new(config: &BackendConfig) -> WalletResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs));
        let client = builder.build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            verify_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.verify_path.trim_start_matches('/')
            ),
        })
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }

    async fn exchange(&self, request: &ConnectionRequest) -> WalletResult<AccessToken> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(request)
            .send()
            .await
            .map_err(|e| WalletError::NetworkError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorBody>().await {
                Ok(body) => format!("{} {}", body.status_code, body.message),
                Err(_) => status.to_string(),
            };
            return Err(WalletError::InvalidResponse(detail));
        }

        let token: ConnectionToken = response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(WalletError::InvalidResponse(
                "Backend returned an empty access token".to_string(),
            ));
        }
        Ok(AccessToken::new(token.access_token))
    }
}

#[async_trait(?Send)]
impl TokenExchange for HttpTokenExchange {
    async fn verify(&self, request: &ConnectionRequest) -> WalletResult<AccessToken> {
        self.exchange(request)
            .await
            .map_err(|e| WalletError::VerificationFailed(e.to_string()))
    }
}
