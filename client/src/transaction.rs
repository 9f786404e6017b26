//! Transaction payloads are opaque to the session: requests go to a wallet provider,
//! signed results go to the network, and neither is inspected on the way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unsigned transaction as prepared by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRequest(pub Value);

/// A transaction after the wallet provider signed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedTransaction(pub Value);

impl From<Value> for TransactionRequest {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Value> for SignedTransaction {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
