use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletError {
    // Channel errors
    TransportFailure(String),
    MalformedResult(String),
    DeviceUnavailable(String),

    // Session errors
    VerificationFailed(String),
    NotConnected,

    // Network errors
    NetworkError(String),
    InvalidResponse(String),

    // Storage errors
    StorageError(String),

    // Configuration and input errors
    ConfigError(String),
    ValidationError(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::TransportFailure(msg) => write!(f, "Wallet transport failure: {}", msg),
            WalletError::MalformedResult(msg) => write!(f, "Malformed wallet result: {}", msg),
            WalletError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),

            WalletError::VerificationFailed(msg) => write!(f, "Verification failed: {}", msg),
            WalletError::NotConnected => write!(f, "Wallet not connected"),

            WalletError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            WalletError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            WalletError::StorageError(msg) => write!(f, "Storage error: {}", msg),

            WalletError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::StorageError(error.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::MalformedResult(format!("JSON error: {}", error))
    }
}

impl From<url::ParseError> for WalletError {
    fn from(error: url::ParseError) -> Self {
        WalletError::MalformedResult(format!("URL error: {}", error))
    }
}
