//! Wallet provider channels.
//!
//! Every provider family talks to its wallet differently (in-page bridge calls, an
//! extension-injected API, a full-page redirect, a paired hardware device) but exposes
//! the same capability set. [`SignerChannel`] is a closed enum over the five variants;
//! the session holds one at a time, chosen by [`WalletKind`].

pub mod bridge;
pub mod extension;
pub mod hardware;
pub mod in_page;
pub mod redirect;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use bridge::{Navigator, WalletBridge, CANCELED};
pub use extension::ExtensionChannel;
pub use hardware::HardwareChannel;
pub use in_page::InPageChannel;
pub use redirect::{RedirectChannel, RedirectProtocol};

use crate::config_store::WalletProvidersConfig;
use crate::errors::WalletResult;
use crate::tokens::{AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    InPageWeb,
    ExtensionInjected,
    RedirectV1,
    RedirectV2,
    Hardware,
}

impl WalletKind {
    pub const ALL: [WalletKind; 5] = [
        WalletKind::InPageWeb,
        WalletKind::ExtensionInjected,
        WalletKind::RedirectV1,
        WalletKind::RedirectV2,
        WalletKind::Hardware,
    ];

    /// Whether authenticate/sign leave the page and finish on the next load.
    pub fn is_redirect(self) -> bool {
        matches!(self, WalletKind::RedirectV1 | WalletKind::RedirectV2)
    }

    /// Whether initializing this kind checks for a pending redirect round trip.
    pub fn resumes_on_initialize(self) -> bool {
        matches!(
            self,
            WalletKind::InPageWeb | WalletKind::RedirectV1 | WalletKind::RedirectV2
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            WalletKind::InPageWeb => "web",
            WalletKind::ExtensionInjected => "extension",
            WalletKind::RedirectV1 => "redirect-v1",
            WalletKind::RedirectV2 => "redirect-v2",
            WalletKind::Hardware => "hardware",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        WalletKind::ALL
            .into_iter()
            .find(|kind| kind.label() == label)
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a channel call produced in this process.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReply<T> {
    Completed(T),
    /// The user aborted in the wallet.
    Canceled,
    /// The page is navigating to an external signer; the result arrives on reload.
    Redirected,
}

pub enum SignerChannel {
    InPageWeb(InPageChannel),
    ExtensionInjected(ExtensionChannel),
    RedirectV1(RedirectChannel),
    RedirectV2(RedirectChannel),
    Hardware(HardwareChannel),
}

impl SignerChannel {
    pub fn kind(&self) -> WalletKind {
        match self {
            SignerChannel::InPageWeb(_) => WalletKind::InPageWeb,
            SignerChannel::ExtensionInjected(_) => WalletKind::ExtensionInjected,
            SignerChannel::RedirectV1(_) => WalletKind::RedirectV1,
            SignerChannel::RedirectV2(_) => WalletKind::RedirectV2,
            SignerChannel::Hardware(_) => WalletKind::Hardware,
        }
    }

    pub fn as_hardware(&self) -> Option<&HardwareChannel> {
        match self {
            SignerChannel::Hardware(channel) => Some(channel),
            _ => None,
        }
    }

    /// `prior_address` is only read by the extension channel, which re-attaches to an
    /// already paired session for that address.
    pub async fn initialize(&self, prior_address: Option<&str>) -> WalletResult<()> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.initialize().await,
            SignerChannel::ExtensionInjected(channel) => channel.initialize(prior_address).await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.initialize()
            }
            SignerChannel::Hardware(channel) => channel.initialize().await,
        }
    }

    pub async fn authenticate(
        &self,
        auth_token: &AuthToken,
    ) -> WalletResult<ChannelReply<AccountToken>> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.authenticate(auth_token).await,
            SignerChannel::ExtensionInjected(channel) => channel.authenticate(auth_token).await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.authenticate(auth_token)
            }
            SignerChannel::Hardware(channel) => channel.authenticate(auth_token).await,
        }
    }

    pub async fn sign(
        &self,
        request: &TransactionRequest,
    ) -> WalletResult<ChannelReply<SignedTransaction>> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.sign(request).await,
            SignerChannel::ExtensionInjected(channel) => channel.sign(request).await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.sign(request)
            }
            SignerChannel::Hardware(channel) => channel.sign(request).await,
        }
    }

    pub async fn sign_batch(
        &self,
        requests: &[TransactionRequest],
    ) -> WalletResult<ChannelReply<Vec<SignedTransaction>>> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.sign_batch(requests).await,
            SignerChannel::ExtensionInjected(channel) => channel.sign_batch(requests).await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.sign_batch(requests)
            }
            SignerChannel::Hardware(channel) => channel.sign_batch(requests).await,
        }
    }

    pub async fn logout(&self) -> WalletResult<()> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.logout().await,
            SignerChannel::ExtensionInjected(channel) => channel.logout().await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.logout()
            }
            SignerChannel::Hardware(channel) => channel.logout().await,
        }
    }

    pub async fn notify_cancellation(&self) -> WalletResult<()> {
        match self {
            SignerChannel::InPageWeb(channel) => channel.notify_cancellation().await,
            SignerChannel::ExtensionInjected(channel) => channel.notify_cancellation().await,
            SignerChannel::RedirectV1(channel) | SignerChannel::RedirectV2(channel) => {
                channel.notify_cancellation()
            }
            SignerChannel::Hardware(channel) => channel.notify_cancellation().await,
        }
    }
}

impl fmt::Debug for SignerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignerChannel").field(&self.kind()).finish()
    }
}

/// Builds channels for a wallet kind from the shared page collaborators.
#[derive(Clone)]
pub struct ChannelFactory {
    bridge: Arc<dyn WalletBridge>,
    navigator: Arc<dyn Navigator>,
    providers: WalletProvidersConfig,
}

impl ChannelFactory {
    pub fn new(
        bridge: Arc<dyn WalletBridge>,
        navigator: Arc<dyn Navigator>,
        providers: WalletProvidersConfig,
    ) -> Self {
        Self {
            bridge,
            navigator,
            providers,
        }
    }

    pub fn build(&self, kind: WalletKind) -> SignerChannel {
        match kind {
            WalletKind::InPageWeb => SignerChannel::InPageWeb(InPageChannel::new(self.bridge.clone())),
            WalletKind::ExtensionInjected => {
                SignerChannel::ExtensionInjected(ExtensionChannel::new(self.bridge.clone()))
            }
            WalletKind::RedirectV1 => SignerChannel::RedirectV1(RedirectChannel::new(
                RedirectProtocol::V1,
                self.providers.redirect_v1_url.clone(),
                self.navigator.clone(),
            )),
            WalletKind::RedirectV2 => SignerChannel::RedirectV2(RedirectChannel::new(
                RedirectProtocol::V2,
                self.providers.redirect_v2_url.clone(),
                self.navigator.clone(),
            )),
            WalletKind::Hardware => {
                SignerChannel::Hardware(HardwareChannel::new(self.bridge.clone()))
            }
        }
    }

    pub fn hardware_page_size(&self) -> usize {
        self.providers.hardware_page_size
    }
}
