use std::sync::Arc;

use uuid::Uuid;

use crate::blockchain_client::NetworkClient;
use crate::errors::{WalletError, WalletResult};
use crate::ledger::TransactionLedger;
use crate::transaction::SignedTransaction;

/// What a successful broadcast left in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub batch_id: Uuid,
    pub hashes: Vec<String>,
}

/// Broadcasts signed transactions and records the result as one ledger batch.
#[derive(Clone)]
pub struct TransactionSubmissionPipeline {
    network: Arc<dyn NetworkClient>,
    ledger: Arc<dyn TransactionLedger>,
}

impl TransactionSubmissionPipeline {
    pub fn new(network: Arc<dyn NetworkClient>, ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { network, ledger }
    }

    pub async fn submit(
        &self,
        signed: &SignedTransaction,
        title: &str,
    ) -> WalletResult<SubmissionReceipt> {
        let hash = self.network.submit(signed).await?;
        log::info!("Broadcast transaction {} ({})", hash, title);
        self.record(title, vec![hash])
    }

    pub async fn submit_batch(
        &self,
        signed: &[SignedTransaction],
        title: &str,
    ) -> WalletResult<SubmissionReceipt> {
        if signed.is_empty() {
            return Err(WalletError::ValidationError(
                "Cannot submit an empty transaction batch".to_string(),
            ));
        }

        let hashes = self.network.submit_batch(signed).await?;
        if hashes.len() != signed.len() {
            log::warn!(
                "Gateway accepted {} of {} transactions for {}",
                hashes.len(),
                signed.len(),
                title
            );
        }
        log::info!("Broadcast {} transactions ({})", hashes.len(), title);
        self.record(title, hashes)
    }

    fn record(&self, title: &str, hashes: Vec<String>) -> WalletResult<SubmissionReceipt> {
        let batch_id = self.ledger.record(title, &hashes)?;
        Ok(SubmissionReceipt { batch_id, hashes })
    }
}
