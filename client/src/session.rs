//! The wallet session: one active signer channel, the persisted connection, and the
//! redirect continuation that carries a connect or sign attempt across a page load.
//!
//! Every public operation is a best-effort state transition. Transport and decode
//! failures are logged and leave the session as it was; only a rejected token
//! exchange reaches the user, as a [`SessionEvent::Notice`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::api::types::ConnectionRequest;
use crate::api::TokenExchange;
use crate::channel::redirect::{decode_login_return, decode_signed_return, strip_return_parameters};
use crate::channel::{
    ChannelFactory, ChannelReply, Navigator, SignerChannel, WalletBridge, WalletKind,
};
use crate::config_store::WalletProvidersConfig;
use crate::errors::{WalletError, WalletResult};
use crate::events::{EventBus, ExternalWalletEvent, SessionEvent};
use crate::redirect_state::{Continuation, PendingTransactionBatch, RedirectStateMachine};
use crate::storage::keys::{
    ACCESS_TOKEN, ACCOUNT_TOKEN, EXTENSION_ADDRESS, PAIRING_PREFIXES, SESSION_KEYS,
    WALLET_CONNECT_PREFIXES, WALLET_KIND,
};
use crate::storage::{SessionStore, StorageScope, StoreExt};
use crate::submission::{SubmissionReceipt, TransactionSubmissionPipeline};
use crate::tokens::{AccessToken, AccountToken, AuthToken};
use crate::transaction::{SignedTransaction, TransactionRequest};
use crate::validation::{normalize_title, validate_account_token};

pub const ACCESS_TOKEN_NOTICE: &str = "Access token could not be generated";

/// Collaborators a session is assembled from.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn SessionStore>,
    pub bridge: Arc<dyn WalletBridge>,
    pub navigator: Arc<dyn Navigator>,
    pub backend: Arc<dyn TokenExchange>,
    pub pipeline: TransactionSubmissionPipeline,
    pub providers: WalletProvidersConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    Submitted(SubmissionReceipt),
    /// The user declined in the wallet; nothing was broadcast.
    Canceled,
    /// The page is leaving for the signer; the result is handled after the reload.
    Redirected,
    /// The attempt failed before anything was broadcast.
    Abandoned,
}

/// What [`WalletSession::resume_if_needed`] found waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    Idle,
    Login { connected: bool },
    Signing(SignOutcome),
}

#[derive(Default)]
struct SessionState {
    channel: Option<Arc<SignerChannel>>,
    auth_token: Option<AuthToken>,
}

pub struct WalletSession {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    backend: Arc<dyn TokenExchange>,
    pipeline: TransactionSubmissionPipeline,
    factory: ChannelFactory,
    redirect: RedirectStateMachine,
    events: EventBus,
    state: Mutex<SessionState>,
}

impl WalletSession {
    /// Restores the channel recorded by a previous page load. Without one, wallet-connect
    /// records left by an unfinished pairing are removed; the extension's paired address
    /// is kept so the next connect can re-attach to it.
    pub fn new(deps: SessionDeps) -> Self {
        let factory = ChannelFactory::new(deps.bridge, deps.navigator.clone(), deps.providers);
        let session = Self {
            redirect: RedirectStateMachine::new(deps.store.clone()),
            store: deps.store,
            navigator: deps.navigator,
            backend: deps.backend,
            pipeline: deps.pipeline,
            factory,
            events: EventBus::new(),
            state: Mutex::new(SessionState::default()),
        };

        match session.stored_kind() {
            Some(kind) => {
                log::debug!("Restoring {} wallet channel", kind);
                session.state.lock().channel = Some(Arc::new(session.factory.build(kind)));
            }
            None => session.remove_pairing_artifacts(WALLET_CONNECT_PREFIXES),
        }
        session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn channel_factory(&self) -> &ChannelFactory {
        &self.factory
    }

    /// Re-attaches the restored channel after a page load and picks up a pending
    /// redirect round trip for the kinds that can have one.
    pub async fn initialize(&self) -> ResumeOutcome {
        let Some(channel) = self.active_channel() else {
            return ResumeOutcome::Idle;
        };

        let prior = self.prior_address_for(channel.kind());
        if let Err(err) = channel.initialize(prior.as_deref()).await {
            log::warn!("Failed to initialize {} wallet: {}", channel.kind(), err);
            return ResumeOutcome::Idle;
        }

        if channel.kind().resumes_on_initialize() {
            self.resume_if_needed().await
        } else {
            ResumeOutcome::Idle
        }
    }

    /// Starts a connection through a fresh channel of `kind`, replacing any attempt
    /// still in flight.
    pub async fn connect(&self, kind: WalletKind) {
        let channel = Arc::new(self.factory.build(kind));
        let auth_token = AuthToken::random();
        self.install(channel.clone(), auth_token.clone());

        let prior = self.prior_address_for(kind);
        if let Err(err) = channel.initialize(prior.as_deref()).await {
            log::warn!("Failed to initialize {} wallet: {}", kind, err);
            return;
        }
        self.authenticate_with(channel, auth_token).await;
    }

    /// Connects through a channel the caller already initialized, such as a hardware
    /// device with a selected address.
    pub async fn connect_with_channel(&self, channel: Arc<SignerChannel>, auth_token: AuthToken) {
        self.install(channel.clone(), auth_token.clone());
        self.authenticate_with(channel, auth_token).await;
    }

    /// Consumes the redirect continuation, if one is pending. The return parameters are
    /// stripped from the page URL once the result has been handled, and the stashed
    /// records go last.
    pub async fn resume_if_needed(&self) -> ResumeOutcome {
        let Some(ticket) = self.redirect.take() else {
            return ResumeOutcome::Idle;
        };
        let current = self.navigator.current_url();

        let outcome = match ticket.continuation() {
            Continuation::Login { auth_token } => {
                let account = decode_login_return(&current).unwrap_or_else(|err| {
                    log::warn!("Unreadable login return URL: {}", err);
                    None
                });
                self.state.lock().auth_token = auth_token.clone();
                self.validate(account).await;
                ResumeOutcome::Login {
                    connected: self.is_connected(),
                }
            }
            Continuation::SignedTransactions { batch } => {
                ResumeOutcome::Signing(self.resume_signing(&current, batch.as_ref()).await)
            }
        };

        self.navigator.replace_url(&strip_return_parameters(&current));
        drop(ticket);
        outcome
    }

    /// Exchanges a wallet-issued account token for an access token.
    pub async fn validate(&self, account_token: Option<AccountToken>) {
        let auth_token = self.state.lock().auth_token.take();

        if self.is_connected() {
            log::debug!("Session already connected; skipping validation");
            return;
        }
        let Some(account) = account_token else {
            log::debug!("No account token to validate");
            return;
        };
        if let Err(err) = validate_account_token(&account) {
            log::warn!("Rejecting account token: {}", err);
            return;
        }

        let request = ConnectionRequest {
            account_token: account.clone(),
            auth_token: auth_token.map(|token| token.as_str().to_string()),
        };
        let access = match self.backend.verify(&request).await {
            Ok(access) => access,
            Err(err) => {
                log::warn!("Token exchange failed: {}", err);
                self.events
                    .publish(SessionEvent::Notice(ACCESS_TOKEN_NOTICE.to_string()));
                return;
            }
        };

        if let Err(err) = self.persist_connection(&access, &account) {
            log::warn!("Failed to persist connection: {}", err);
            return;
        }
        log::info!("Wallet {} connected", account.address);
        self.events.publish(SessionEvent::Connected {
            address: account.address,
        });
    }

    pub async fn sign_transaction(
        &self,
        request: &TransactionRequest,
        title: &str,
    ) -> WalletResult<SignOutcome> {
        let Some((channel, title)) = self.prepare_signing(title) else {
            return Ok(SignOutcome::Abandoned);
        };
        if channel.kind().is_redirect() {
            return Ok(self
                .sign_by_redirect(&channel, vec![request.clone()], title)
                .await);
        }

        match channel.sign(request).await {
            Ok(ChannelReply::Completed(signed)) => Ok(SignOutcome::Submitted(
                self.pipeline.submit(&signed, &title).await?,
            )),
            Ok(reply) => Ok(self.settle_unsigned(&channel, reply).await),
            Err(err) => {
                log::warn!("Signing with {} wallet failed: {}", channel.kind(), err);
                Ok(SignOutcome::Abandoned)
            }
        }
    }

    pub async fn sign_transactions(
        &self,
        requests: &[TransactionRequest],
        title: &str,
    ) -> WalletResult<SignOutcome> {
        if requests.is_empty() {
            log::warn!("Ignoring empty transaction batch");
            return Ok(SignOutcome::Abandoned);
        }
        let Some((channel, title)) = self.prepare_signing(title) else {
            return Ok(SignOutcome::Abandoned);
        };
        if channel.kind().is_redirect() {
            return Ok(self
                .sign_by_redirect(&channel, requests.to_vec(), title)
                .await);
        }

        match channel.sign_batch(requests).await {
            Ok(ChannelReply::Completed(signed)) => Ok(SignOutcome::Submitted(
                self.pipeline.submit_batch(&signed, &title).await?,
            )),
            Ok(reply) => Ok(self.settle_unsigned(&channel, reply).await),
            Err(err) => {
                log::warn!("Batch signing with {} wallet failed: {}", channel.kind(), err);
                Ok(SignOutcome::Abandoned)
            }
        }
    }

    /// Logs out of the wallet, best effort, and forgets the session.
    pub async fn disconnect(&self) {
        if let Some(channel) = self.active_channel() {
            if let Err(err) = channel.logout().await {
                log::warn!("Logout from {} wallet failed: {}", channel.kind(), err);
            }
        }
        self.wallet_disconnected();
    }

    /// Forgets the session without talking to the wallet, for when the wallet itself
    /// ended it.
    pub fn wallet_disconnected(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(StorageScope::Session, key) {
                log::warn!("Failed to remove {}: {}", key, err);
            }
        }
        self.remove_pairing_artifacts(PAIRING_PREFIXES);

        {
            let mut state = self.state.lock();
            state.channel = None;
            state.auth_token = None;
        }
        log::info!("Wallet disconnected");
        self.events.publish(SessionEvent::Disconnected);
    }

    pub async fn handle_external_event(&self, event: ExternalWalletEvent) {
        match event {
            ExternalWalletEvent::Connected(raw) => match serde_json::from_str::<AccountToken>(&raw) {
                Ok(account) => self.validate(Some(account)).await,
                Err(err) => log::warn!("Ignoring unreadable wallet login event: {}", err),
            },
            ExternalWalletEvent::Disconnected => self.wallet_disconnected(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    pub fn address(&self) -> Option<String> {
        self.store
            .get_item::<AccountToken>(StorageScope::Session, ACCOUNT_TOKEN)
            .ok()
            .map(|token| token.address)
            .filter(|address| !address.is_empty())
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.store
            .get_string(StorageScope::Session, ACCESS_TOKEN)
            .ok()
            .filter(|token| !token.is_empty())
            .map(AccessToken::new)
    }

    pub fn active_kind(&self) -> Option<WalletKind> {
        self.active_channel()
            .map(|channel| channel.kind())
            .or_else(|| self.stored_kind())
    }

    pub fn active_channel(&self) -> Option<Arc<SignerChannel>> {
        self.state.lock().channel.clone()
    }

    fn install(&self, channel: Arc<SignerChannel>, auth_token: AuthToken) {
        let mut state = self.state.lock();
        if let Some(previous) = state.channel.as_ref() {
            log::debug!("Replacing active {} wallet channel", previous.kind());
        }
        state.channel = Some(channel);
        state.auth_token = Some(auth_token);
    }

    fn is_current(&self, channel: &Arc<SignerChannel>) -> bool {
        self.state
            .lock()
            .channel
            .as_ref()
            .map_or(false, |active| Arc::ptr_eq(active, channel))
    }

    async fn authenticate_with(&self, channel: Arc<SignerChannel>, auth_token: AuthToken) {
        let kind = channel.kind();
        if kind.is_redirect() {
            let stashed = self
                .store
                .set_string(StorageScope::Session, WALLET_KIND, kind.label())
                .and_then(|_| self.redirect.begin_login(&auth_token));
            if let Err(err) = stashed {
                log::warn!("Failed to record pending {} login: {}", kind, err);
                self.redirect.abandon();
                return;
            }
        }

        match channel.authenticate(&auth_token).await {
            Ok(ChannelReply::Completed(account)) => {
                if !self.is_current(&channel) {
                    log::debug!("Discarding login from superseded {} channel", kind);
                    return;
                }
                self.validate(Some(account)).await;
            }
            Ok(ChannelReply::Canceled) => {
                log::info!("Login canceled in {} wallet", kind);
                if self.is_current(&channel) {
                    self.state.lock().auth_token = None;
                }
            }
            Ok(ChannelReply::Redirected) => {
                log::debug!("Continuing {} login after redirect", kind);
            }
            Err(err) => {
                log::warn!("Login with {} wallet failed: {}", kind, err);
                if kind.is_redirect() {
                    self.redirect.abandon();
                }
            }
        }
    }

    fn prepare_signing(&self, title: &str) -> Option<(Arc<SignerChannel>, String)> {
        let Some(channel) = self.active_channel() else {
            log::warn!("Signing refused: {}", WalletError::NotConnected);
            return None;
        };
        match normalize_title(title) {
            Ok(title) => Some((channel, title)),
            Err(err) => {
                log::warn!("Rejecting transaction title: {}", err);
                None
            }
        }
    }

    async fn sign_by_redirect(
        &self,
        channel: &SignerChannel,
        requests: Vec<TransactionRequest>,
        title: String,
    ) -> SignOutcome {
        let batch = PendingTransactionBatch { title, requests };
        if let Err(err) = self.redirect.begin_signing(&batch) {
            log::warn!("Failed to record pending transactions: {}", err);
            self.redirect.abandon();
            return SignOutcome::Abandoned;
        }

        let navigated = match batch.requests.as_slice() {
            [single] => channel
                .sign(single)
                .await
                .map(|reply| matches!(reply, ChannelReply::Redirected)),
            requests => channel
                .sign_batch(requests)
                .await
                .map(|reply| matches!(reply, ChannelReply::Redirected)),
        };
        match navigated {
            Ok(true) => SignOutcome::Redirected,
            Ok(false) => {
                log::warn!("{} wallet answered without leaving the page", channel.kind());
                self.redirect.abandon();
                SignOutcome::Abandoned
            }
            Err(err) => {
                log::warn!("Signing with {} wallet failed: {}", channel.kind(), err);
                self.redirect.abandon();
                SignOutcome::Abandoned
            }
        }
    }

    async fn settle_unsigned<T>(&self, channel: &SignerChannel, reply: ChannelReply<T>) -> SignOutcome {
        match reply {
            ChannelReply::Canceled => {
                if let Err(err) = channel.notify_cancellation().await {
                    log::warn!("Cancellation notice to {} wallet failed: {}", channel.kind(), err);
                }
                SignOutcome::Canceled
            }
            ChannelReply::Redirected => SignOutcome::Redirected,
            ChannelReply::Completed(_) => SignOutcome::Abandoned,
        }
    }

    async fn notify_cancellation(&self) {
        if let Some(channel) = self.active_channel() {
            if let Err(err) = channel.notify_cancellation().await {
                log::warn!("Cancellation notice to {} wallet failed: {}", channel.kind(), err);
            }
        }
    }

    async fn resume_signing(
        &self,
        current: &str,
        batch: Option<&PendingTransactionBatch>,
    ) -> SignOutcome {
        let reply = match decode_signed_return(current) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("Unreadable signing return URL: {}", err);
                return SignOutcome::Abandoned;
            }
        };
        match (reply, batch) {
            (ChannelReply::Canceled, _) => {
                self.notify_cancellation().await;
                SignOutcome::Canceled
            }
            (ChannelReply::Completed(signed), Some(batch)) => {
                self.submit_resumed(&signed, batch).await
            }
            (ChannelReply::Completed(_), None) => {
                log::warn!("Signed transactions returned without a pending batch");
                SignOutcome::Abandoned
            }
            (ChannelReply::Redirected, _) => SignOutcome::Abandoned,
        }
    }

    async fn submit_resumed(
        &self,
        signed: &[SignedTransaction],
        batch: &PendingTransactionBatch,
    ) -> SignOutcome {
        if signed.len() != batch.requests.len() {
            log::warn!(
                "Signer returned {} of {} transactions for {}",
                signed.len(),
                batch.requests.len(),
                batch.title
            );
        }
        match self.pipeline.submit_batch(signed, &batch.title).await {
            Ok(receipt) => SignOutcome::Submitted(receipt),
            Err(err) => {
                log::warn!("Broadcast of {} failed: {}", batch.title, err);
                SignOutcome::Abandoned
            }
        }
    }

    fn persist_connection(&self, access: &AccessToken, account: &AccountToken) -> WalletResult<()> {
        self.store
            .set_string(StorageScope::Session, ACCESS_TOKEN, access.expose())?;
        self.store
            .set_item(StorageScope::Session, ACCOUNT_TOKEN, account)?;

        if let Some(kind) = self.active_channel().map(|channel| channel.kind()) {
            self.store
                .set_string(StorageScope::Session, WALLET_KIND, kind.label())?;
            if kind == WalletKind::ExtensionInjected {
                self.store
                    .set_string(StorageScope::Durable, EXTENSION_ADDRESS, &account.address)?;
            }
        }
        Ok(())
    }

    fn stored_kind(&self) -> Option<WalletKind> {
        let label = self.store.get_string(StorageScope::Session, WALLET_KIND).ok()?;
        WalletKind::from_label(&label)
    }

    /// Address the extension already paired with, so it can resume without prompting.
    fn prior_address_for(&self, kind: WalletKind) -> Option<String> {
        if kind != WalletKind::ExtensionInjected {
            return None;
        }
        self.store
            .get_string(StorageScope::Durable, EXTENSION_ADDRESS)
            .ok()
            .filter(|address| !address.is_empty())
            .or_else(|| self.address())
    }

    fn remove_pairing_artifacts(&self, prefixes: &[&str]) {
        for prefix in prefixes {
            match self.store.remove_prefixed(StorageScope::Durable, prefix) {
                Ok(0) => {}
                Ok(removed) => log::debug!("Removed {} pairing entries under {}", removed, prefix),
                Err(err) => log::warn!("Failed to remove pairing entries {}: {}", prefix, err),
            }
        }
    }
}
