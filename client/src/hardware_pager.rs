//! Address picker for hardware wallets.
//!
//! The device derives addresses a page at a time. The user pages through them, picks
//! one and confirms, which signs the login challenge for that address on the device.

use std::sync::Arc;

use crate::channel::{ChannelFactory, HardwareChannel, SignerChannel, WalletKind};
use crate::errors::{WalletError, WalletResult};
use crate::session::WalletSession;
use crate::tokens::AuthToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagerState {
    #[default]
    Loading,
    List,
    Verify,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HardwareAddressPage {
    pub page_index: usize,
    pub page_size: usize,
    pub addresses: Vec<String>,
    /// Global address index, `local + page_index * page_size`.
    pub selected: Option<usize>,
}

pub struct HardwareAddressPager {
    channel: Arc<SignerChannel>,
    state: PagerState,
    page: HardwareAddressPage,
    auth_token: Option<AuthToken>,
    error: Option<String>,
}

impl HardwareAddressPager {
    pub fn new(factory: &ChannelFactory) -> Self {
        Self {
            channel: Arc::new(factory.build(WalletKind::Hardware)),
            state: PagerState::Loading,
            page: HardwareAddressPage {
                page_size: factory.hardware_page_size().max(1),
                ..HardwareAddressPage::default()
            },
            auth_token: None,
            error: None,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn page(&self) -> &HardwareAddressPage {
        &self.page
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_pending_auth(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Begins a fresh attempt: checks the device, then loads the first page.
    pub async fn start(&mut self) {
        self.page.page_index = 0;
        self.page.selected = None;
        self.page.addresses.clear();
        self.error = None;
        self.state = PagerState::Loading;

        let prepared = match self.device() {
            Ok(device) => device.initialize().await,
            Err(err) => Err(err),
        };
        if let Err(err) = prepared {
            self.fail(err);
            return;
        }
        self.load_page().await;
    }

    pub async fn next(&mut self) {
        if self.state != PagerState::List || self.page.addresses.is_empty() {
            return;
        }
        self.page.selected = None;
        self.page.page_index += 1;
        self.load_page().await;
    }

    pub async fn prev(&mut self) {
        if self.state != PagerState::List || self.page.page_index == 0 {
            return;
        }
        self.page.selected = None;
        self.page.page_index -= 1;
        self.load_page().await;
    }

    /// Selects the `local`-th address of the current page. Out-of-range picks are
    /// ignored.
    pub fn select(&mut self, local: usize) {
        if self.state != PagerState::List || local >= self.page.addresses.len() {
            return;
        }
        let global = local + self.page.page_index * self.page.page_size;
        self.page.selected = Some(global);
        if let Ok(device) = self.device() {
            device.select_address(global);
        }
    }

    /// Signs the login challenge for the selected address and connects the session.
    pub async fn confirm(&mut self, session: &WalletSession) {
        if self.page.selected.is_none() {
            log::debug!("Hardware confirm without a selected address");
            return;
        }
        let auth_token = AuthToken::random();
        self.auth_token = Some(auth_token.clone());
        self.state = PagerState::Verify;

        session
            .connect_with_channel(self.channel.clone(), auth_token)
            .await;

        self.auth_token = None;
        if session.is_connected() {
            log::info!("Hardware wallet connected");
        } else {
            self.fail(WalletError::DeviceUnavailable(
                "Hardware wallet login was not completed".to_string(),
            ));
        }
    }

    async fn load_page(&mut self) {
        self.state = PagerState::Loading;
        let page = self.page.page_index;
        let size = self.page.page_size;
        let fetched = match self.device() {
            Ok(device) => device.list_addresses(page, size).await,
            Err(err) => Err(err),
        };
        match fetched {
            Ok(addresses) => {
                self.page.addresses = addresses;
                self.state = PagerState::List;
            }
            Err(err) => self.fail(err),
        }
    }

    fn device(&self) -> WalletResult<&HardwareChannel> {
        self.channel.as_hardware().ok_or_else(|| {
            WalletError::DeviceUnavailable("Channel is not a hardware wallet".to_string())
        })
    }

    fn fail(&mut self, err: WalletError) {
        log::warn!("Hardware wallet: {}", err);
        self.error = Some(err.to_string());
        self.state = PagerState::Error;
    }
}
