//! Wallets that sign on an external page.
//!
//! Requests leave as URL parameters of the signer's hook page together with a
//! callback URL; the signer navigates back to the callback with the result in the
//! query string. The page that receives it is a brand-new process, so decoding the
//! return URL happens in free functions driven by the persisted continuation.

use std::fmt;
use std::sync::Arc;

use url::Url;

use super::bridge::{Navigator, CANCELED};
use super::ChannelReply;
use crate::errors::{WalletError, WalletResult};
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

const PARAM_TOKEN: &str = "token";
const PARAM_CALLBACK: &str = "callbackUrl";
const PARAM_PROTOCOL: &str = "protocol";
const PARAM_TRANSACTIONS: &str = "transactions";
const PARAM_ADDRESS: &str = "address";
const PARAM_SIGNATURE: &str = "signature";
const PARAM_SIGNED: &str = "signedTransactions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectProtocol {
    V1,
    V2,
}

impl RedirectProtocol {
    pub fn tag(self) -> &'static str {
        match self {
            RedirectProtocol::V1 => "v1",
            RedirectProtocol::V2 => "v2",
        }
    }
}

pub struct RedirectChannel {
    protocol: RedirectProtocol,
    endpoint: String,
    navigator: Arc<dyn Navigator>,
}

impl RedirectChannel {
    pub fn new(
        protocol: RedirectProtocol,
        endpoint: impl Into<String>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            protocol,
            endpoint: endpoint.into(),
            navigator,
        }
    }

    /// Nothing to attach to; only checks the signer endpoint is usable.
    pub fn initialize(&self) -> WalletResult<()> {
        self.hook_url("login", Vec::new()).map(|_| ())
    }

    pub fn authenticate(&self, auth_token: &AuthToken) -> WalletResult<ChannelReply<AccountToken>> {
        let url = self.login_url(auth_token)?;
        self.navigator.navigate_to(url.as_str())?;
        Ok(ChannelReply::Redirected)
    }

    pub fn sign(&self, request: &TransactionRequest) -> WalletResult<ChannelReply<SignedTransaction>> {
        let url = self.sign_url(std::slice::from_ref(request))?;
        self.navigator.navigate_to(url.as_str())?;
        Ok(ChannelReply::Redirected)
    }

    pub fn sign_batch(
        &self,
        requests: &[TransactionRequest],
    ) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
        let url = self.sign_url(requests)?;
        self.navigator.navigate_to(url.as_str())?;
        Ok(ChannelReply::Redirected)
    }

    /// The external signer keeps no session for us.
    pub fn logout(&self) -> WalletResult<()> {
        log::debug!("{} signer logout is local only", self.protocol.tag());
        Ok(())
    }

    pub fn notify_cancellation(&self) -> WalletResult<()> {
        log::debug!("{} signer reported a canceled signing", self.protocol.tag());
        Ok(())
    }

    pub fn login_url(&self, auth_token: &AuthToken) -> WalletResult<Url> {
        self.hook_url(
            "login",
            vec![(PARAM_TOKEN, auth_token.as_str().to_string())],
        )
    }

    pub fn sign_url(&self, requests: &[TransactionRequest]) -> WalletResult<Url> {
        let encoded = serde_json::to_string(requests)?;
        self.hook_url("sign", vec![(PARAM_TRANSACTIONS, encoded)])
    }

    fn hook_url(&self, hook: &str, params: Vec<(&str, String)>) -> WalletResult<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            WalletError::ConfigError(format!("Invalid signer endpoint {}: {}", self.endpoint, e))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                WalletError::ConfigError(format!(
                    "Signer endpoint {} cannot carry a path",
                    self.endpoint
                ))
            })?;
            segments.pop_if_empty().extend(["hook", hook]);
        }

        let callback = strip_return_parameters(&self.navigator.current_url());
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &params {
                query.append_pair(key, value);
            }
            query.append_pair(PARAM_CALLBACK, &callback);
            query.append_pair(PARAM_PROTOCOL, self.protocol.tag());
        }
        Ok(url)
    }
}

impl fmt::Debug for RedirectChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectChannel")
            .field("protocol", &self.protocol)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Account token carried back by a login redirect, if the URL has one.
pub fn decode_login_return(url: &str) -> WalletResult<Option<AccountToken>> {
    let parsed = Url::parse(url)?;
    let mut address = None;
    let mut signature = None;
    for (key, value) in parsed.query_pairs() {
        match &*key {
            PARAM_ADDRESS => address = Some(value.into_owned()),
            PARAM_SIGNATURE => signature = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(address.map(|address| AccountToken::new(address, signature.unwrap_or_default())))
}

/// Signed transactions (or the cancellation sentinel) carried back by a sign redirect.
pub fn decode_signed_return(url: &str) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
    let parsed = Url::parse(url)?;
    let raw = parsed
        .query_pairs()
        .find(|(key, _)| key == PARAM_SIGNED)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| {
            WalletError::MalformedResult("Return URL carries no signed transactions".to_string())
        })?;

    if raw == CANCELED {
        return Ok(ChannelReply::Canceled);
    }
    Ok(ChannelReply::Completed(serde_json::from_str(&raw)?))
}

/// The URL without its query string and fragment.
pub fn strip_return_parameters(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
