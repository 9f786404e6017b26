// lib.rs - Core library structure for the dApp wallet session client

pub mod api;
pub mod app_state;
pub mod blockchain_client;
pub mod channel;
pub mod config_store;
pub mod errors;
pub mod events;
pub mod hardware_pager;
pub mod ledger;
pub mod redirect_state;
pub mod session;
pub mod storage;
pub mod submission;
pub mod tokens;
pub mod tracker;
pub mod transaction;
pub mod validation;

// Re-export common types
pub use api::types::{ConnectionRequest, ConnectionToken};
pub use api::{HttpTokenExchange, TokenExchange};
pub use app_state::{DappContext, HostAdapters};
pub use blockchain_client::{GatewayClient, NetworkClient};
pub use channel::{ChannelReply, Navigator, SignerChannel, WalletBridge, WalletKind};
pub use config_store::{ClientConfig, ConfigStore, WalletProvidersConfig};
pub use errors::{WalletError, WalletResult};
pub use events::{ExternalWalletEvent, SessionEvent};
pub use hardware_pager::{HardwareAddressPage, HardwareAddressPager, PagerState};
pub use ledger::{TransactionBatch, TransactionLedger, TransactionStatus, TransactionsContainer};
pub use redirect_state::{PendingTransactionBatch, RedirectFlowState, RedirectStateMachine};
pub use session::{ResumeOutcome, SessionDeps, SignOutcome, WalletSession};
pub use storage::{FileStore, MemoryStore, SessionStore, StorageScope, StoreExt};
pub use submission::{SubmissionReceipt, TransactionSubmissionPipeline};
pub use tokens::{AccessToken, AccountToken, AuthToken};
pub use tracker::{cancel_pair, CancelHandle, CancelSignal, TrackOutcome, TransactionTracker};
pub use transaction::{SignedTransaction, TransactionRequest};
