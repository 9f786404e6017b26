//! Storage keys shared by the session, the redirect continuation and the browser host.

// Session scope
pub const ACCESS_TOKEN: &str = "accessToken";
pub const ACCOUNT_TOKEN: &str = "accountToken";
pub const WALLET_KIND: &str = "walletType";
pub const REDIRECT_STATE: &str = "webWalletState";
pub const AUTH_TOKEN: &str = "authToken";
pub const PENDING_BATCH: &str = "pendingTransactions";

/// Every session-scoped key the wallet session owns.
pub const SESSION_KEYS: &[&str] = &[
    ACCESS_TOKEN,
    ACCOUNT_TOKEN,
    WALLET_KIND,
    REDIRECT_STATE,
    AUTH_TOKEN,
    PENDING_BATCH,
];

// Durable scope
pub const EXTENSION_ADDRESS: &str = "pairing.extension.address";

/// Wallet-connect relay records. Without an active session these are leftovers of an
/// unfinished pairing.
pub const WALLET_CONNECT_PREFIXES: &[&str] = &["wc@2:", "walletconnect"];

/// Every durable prefix holding provider pairing artifacts. All of them go on disconnect.
pub const PAIRING_PREFIXES: &[&str] = &["pairing.", "wc@2:", "walletconnect"];
