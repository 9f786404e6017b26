//! Polls the network until every transaction of a recorded batch has settled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::blockchain_client::NetworkClient;
use crate::config_store::NetworkConfig;
use crate::errors::WalletResult;
use crate::ledger::{TransactionBatch, TransactionLedger, TransactionStatus};

/// Stops a running [`TransactionTracker::track`]. Dropping the handle cancels too.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

impl CancelSignal {
    pub fn is_canceled(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    async fn canceled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Completed,
    Canceled,
}

pub struct TransactionTracker {
    network: Arc<dyn NetworkClient>,
    ledger: Arc<dyn TransactionLedger>,
    poll_interval: Duration,
    max_polls: u32,
}

impl TransactionTracker {
    pub fn new(
        network: Arc<dyn NetworkClient>,
        ledger: Arc<dyn TransactionLedger>,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            network,
            ledger,
            poll_interval,
            max_polls: max_polls.max(1),
        }
    }

    pub fn from_config(
        network: Arc<dyn NetworkClient>,
        ledger: Arc<dyn TransactionLedger>,
        config: &NetworkConfig,
    ) -> Self {
        Self::new(
            network,
            ledger,
            Duration::from_millis(config.tx_check_interval_ms),
            config.tx_check_max_polls,
        )
    }

    /// Settles the batch's pending transactions one after another, writing each final
    /// status to the ledger. The batch is marked executed only when every transaction
    /// was visited.
    pub async fn track(
        &self,
        batch: &TransactionBatch,
        mut cancel: CancelSignal,
    ) -> WalletResult<TrackOutcome> {
        for tx in batch.transactions.iter().filter(|tx| !tx.status.is_final()) {
            let status = match self.settle(&tx.hash, &mut cancel).await {
                Some(status) => status,
                None => {
                    log::debug!("Tracking of '{}' canceled at {}", batch.title, tx.hash);
                    return Ok(TrackOutcome::Canceled);
                }
            };
            self.ledger.update_status(&tx.hash, status)?;
        }

        self.ledger.mark_executed(&batch.hashes())?;
        log::info!("Transactions of '{}' settled", batch.title);
        Ok(TrackOutcome::Completed)
    }

    async fn settle(&self, hash: &str, cancel: &mut CancelSignal) -> Option<TransactionStatus> {
        for attempt in 1..=self.max_polls {
            if cancel.is_canceled() {
                return None;
            }
            match self.network.poll_status(hash).await {
                Ok(status) if status.is_final() => return Some(status),
                Ok(_) => {}
                Err(err) => {
                    log::warn!("Status check for {} failed: {}", hash, err);
                    return Some(TransactionStatus::Exception);
                }
            }
            if attempt == self.max_polls {
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.canceled() => return None,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        log::warn!("{} still pending after {} checks", hash, self.max_polls);
        Some(TransactionStatus::Fail)
    }
}
