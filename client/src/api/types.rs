use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tokens::AccountToken;

/// Body of `POST /connection/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub account_token: AccountToken,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionToken {
    pub access_token: String,
}

/// Error payload the backend returns with a 4xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Gateway envelope: `{ "data": ..., "error": "", "code": "successful" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionData {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMultipleData {
    #[serde(default)]
    pub num_of_sent_txs: usize,
    /// Keyed by the position of the transaction in the submitted array.
    #[serde(default)]
    pub txs_hashes: BTreeMap<String, String>,
}

impl SendMultipleData {
    /// Hashes in submission order. Positions that were not accepted are skipped.
    pub fn ordered_hashes(&self) -> Vec<String> {
        let mut indexed: Vec<(usize, &String)> = self
            .txs_hashes
            .iter()
            .filter_map(|(index, hash)| index.parse().ok().map(|i| (i, hash)))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, hash)| hash.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusData {
    pub status: String,
}
