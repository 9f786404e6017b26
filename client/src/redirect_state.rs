//! Durable continuation for redirect-based wallets.
//!
//! A redirect tears down the page, so nothing in memory survives it. Before navigating
//! away the session writes what it needs to pick the flow back up (the flow state plus
//! either the stashed auth token or the pending batch) and the freshly loaded page
//! consumes that record exactly once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::WalletResult;
use crate::storage::keys::{AUTH_TOKEN, PENDING_BATCH, REDIRECT_STATE};
use crate::storage::{SessionStore, StorageScope, StoreExt};
use crate::tokens::AuthToken;
use crate::transaction::TransactionRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectFlowState {
    #[default]
    Idle,
    AwaitingLoginCallback,
    AwaitingSignedTransactions,
}

/// Requests waiting for a redirect signer to send back signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransactionBatch {
    pub title: String,
    pub requests: Vec<TransactionRequest>,
}

#[derive(Debug, Clone)]
pub enum Continuation {
    Login {
        auth_token: Option<AuthToken>,
    },
    SignedTransactions {
        batch: Option<PendingTransactionBatch>,
    },
}

/// A consumed continuation. The flow state is already back to `Idle`; the stashed
/// auth token and pending batch are removed when the ticket is dropped, whatever the
/// outcome of the resumed flow was.
pub struct ResumeTicket {
    store: Arc<dyn SessionStore>,
    continuation: Continuation,
}

impl ResumeTicket {
    pub fn continuation(&self) -> &Continuation {
        &self.continuation
    }
}

impl Drop for ResumeTicket {
    fn drop(&mut self) {
        clear_records(self.store.as_ref());
    }
}

#[derive(Clone)]
pub struct RedirectStateMachine {
    store: Arc<dyn SessionStore>,
}

impl RedirectStateMachine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn state(&self) -> RedirectFlowState {
        self.store
            .get_item(StorageScope::Session, REDIRECT_STATE)
            .unwrap_or_default()
    }

    /// Records a pending login. Must complete before navigation starts.
    pub fn begin_login(&self, auth_token: &AuthToken) -> WalletResult<()> {
        self.store
            .set_string(StorageScope::Session, AUTH_TOKEN, auth_token.as_str())?;
        self.set_state(RedirectFlowState::AwaitingLoginCallback)
    }

    /// Records a pending signing round trip. Must complete before navigation starts.
    pub fn begin_signing(&self, batch: &PendingTransactionBatch) -> WalletResult<()> {
        self.store
            .set_item(StorageScope::Session, PENDING_BATCH, batch)?;
        self.set_state(RedirectFlowState::AwaitingSignedTransactions)
    }

    /// Consumes the continuation, if any. A second call returns `None` until a new
    /// flow begins.
    pub fn take(&self) -> Option<ResumeTicket> {
        let state = match self
            .store
            .get_item::<RedirectFlowState>(StorageScope::Session, REDIRECT_STATE)
        {
            Ok(state) => state,
            Err(err) => {
                log::warn!("Discarding unreadable redirect state: {}", err);
                self.abandon();
                return None;
            }
        };

        let continuation = match state {
            RedirectFlowState::Idle => return None,
            RedirectFlowState::AwaitingLoginCallback => Continuation::Login {
                auth_token: self
                    .store
                    .get_string(StorageScope::Session, AUTH_TOKEN)
                    .ok()
                    .and_then(AuthToken::restore),
            },
            RedirectFlowState::AwaitingSignedTransactions => Continuation::SignedTransactions {
                batch: self
                    .store
                    .get_item::<Option<PendingTransactionBatch>>(
                        StorageScope::Session,
                        PENDING_BATCH,
                    )
                    .unwrap_or_else(|err| {
                        log::warn!("Pending transaction batch is unreadable: {}", err);
                        None
                    }),
            },
        };

        if let Err(err) = self.set_state(RedirectFlowState::Idle) {
            log::warn!("Failed to reset redirect state: {}", err);
        }

        Some(ResumeTicket {
            store: self.store.clone(),
            continuation,
        })
    }

    /// Drops any pending flow without resuming it.
    pub fn abandon(&self) {
        if let Err(err) = self.store.remove(StorageScope::Session, REDIRECT_STATE) {
            log::warn!("Failed to clear redirect state: {}", err);
        }
        clear_records(self.store.as_ref());
    }

    fn set_state(&self, state: RedirectFlowState) -> WalletResult<()> {
        self.store
            .set_item(StorageScope::Session, REDIRECT_STATE, &state)
    }
}

fn clear_records(store: &dyn SessionStore) {
    for key in [AUTH_TOKEN, PENDING_BATCH] {
        if let Err(err) = store.remove(StorageScope::Session, key) {
            log::warn!("Failed to clear {}: {}", key, err);
        }
    }
}
