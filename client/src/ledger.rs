//! Record of submitted transactions, grouped the way they were signed.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{WalletError, WalletResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Fail,
    Invalid,
    Exception,
}

impl TransactionStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Maps a gateway status string. Anything the gateway has not settled yet reads
    /// as pending.
    pub fn from_gateway(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "success" | "successful" | "executed" => TransactionStatus::Success,
            "fail" | "failed" => TransactionStatus::Fail,
            "invalid" => TransactionStatus::Invalid,
            _ => TransactionStatus::Pending,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Fail => "fail",
            TransactionStatus::Invalid => "invalid",
            TransactionStatus::Exception => "exception",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTransaction {
    pub hash: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBatch {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub transactions: Vec<TrackedTransaction>,
    pub executed: bool,
}

impl TransactionBatch {
    pub fn hashes(&self) -> Vec<String> {
        self.transactions.iter().map(|tx| tx.hash.clone()).collect()
    }

    pub fn is_settled(&self) -> bool {
        self.transactions.iter().all(|tx| tx.status.is_final())
    }
}

/// Where submitted transactions are recorded for later status tracking.
pub trait TransactionLedger {
    fn record(&self, title: &str, hashes: &[String]) -> WalletResult<Uuid>;
    fn update_status(&self, hash: &str, status: TransactionStatus) -> WalletResult<()>;
    fn mark_executed(&self, hashes: &[String]) -> WalletResult<()>;
}

/// In-memory ledger backing the transactions panel.
#[derive(Debug, Default)]
pub struct TransactionsContainer {
    batches: RwLock<Vec<TransactionBatch>>,
}

impl TransactionsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<TransactionBatch> {
        self.batches.read().clone()
    }

    pub fn batch(&self, id: Uuid) -> Option<TransactionBatch> {
        self.batches.read().iter().find(|b| b.id == id).cloned()
    }

    /// Removes a batch from the panel. Returns whether it existed.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut batches = self.batches.write();
        let before = batches.len();
        batches.retain(|b| b.id != id);
        batches.len() != before
    }

    pub fn len(&self) -> usize {
        self.batches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.read().is_empty()
    }
}

impl TransactionLedger for TransactionsContainer {
    fn record(&self, title: &str, hashes: &[String]) -> WalletResult<Uuid> {
        let batch = TransactionBatch {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now(),
            transactions: hashes
                .iter()
                .map(|hash| TrackedTransaction {
                    hash: hash.clone(),
                    status: TransactionStatus::Pending,
                })
                .collect(),
            executed: false,
        };
        let id = batch.id;
        self.batches.write().push(batch);
        Ok(id)
    }

    fn update_status(&self, hash: &str, status: TransactionStatus) -> WalletResult<()> {
        let mut batches = self.batches.write();
        let tracked = batches
            .iter_mut()
            .flat_map(|b| b.transactions.iter_mut())
            .find(|tx| tx.hash == hash)
            .ok_or_else(|| WalletError::ValidationError(format!("Unknown transaction {}", hash)))?;
        tracked.status = status;
        Ok(())
    }

    fn mark_executed(&self, hashes: &[String]) -> WalletResult<()> {
        let mut batches = self.batches.write();
        for batch in batches
            .iter_mut()
            .filter(|b| b.transactions.iter().any(|tx| hashes.contains(&tx.hash)))
        {
            batch.executed = true;
        }
        Ok(())
    }
}
