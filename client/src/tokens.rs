//! Credentials exchanged during a wallet connection.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use crate::validation::validate_account_token;

const AUTH_TOKEN_BYTES: usize = 32;

/// Wallet-issued proof that the user controls `address`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountToken {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub signature: String,
    /// Provider specific fields passed through untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl AccountToken {
    pub fn new(address: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            signature: signature.into(),
            metadata: Map::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        validate_account_token(self).is_ok()
    }
}

/// Single-use anti-replay nonce for one connect or sign attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(Zeroizing<String>);

impl AuthToken {
    pub fn random() -> Self {
        let mut bytes = [0u8; AUTH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(hex::encode(bytes)))
    }

    /// Rebuilds a token stashed across a redirect round trip.
    pub fn restore(value: String) -> Option<Self> {
        if value.is_empty() {
            None
        } else {
            Some(Self(Zeroizing::new(value)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Backend-issued session credential.
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
