use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::api::{HttpTokenExchange, TokenExchange};
use crate::blockchain_client::{GatewayClient, NetworkClient};
use crate::channel::{Navigator, WalletBridge};
use crate::config_store::{ClientConfig, ConfigStore};
use crate::errors::{WalletError, WalletResult};
use crate::hardware_pager::HardwareAddressPager;
use crate::ledger::TransactionsContainer;
use crate::session::{SessionDeps, WalletSession};
use crate::storage::SessionStore;
use crate::submission::TransactionSubmissionPipeline;
use crate::tracker::{CancelSignal, TrackOutcome, TransactionTracker};

/// What the hosting page provides.
#[derive(Clone)]
pub struct HostAdapters {
    pub store: Arc<dyn SessionStore>,
    pub bridge: Arc<dyn WalletBridge>,
    pub navigator: Arc<dyn Navigator>,
}

/// Everything a dApp page needs, wired from one configuration.
pub struct DappContext {
    config: ClientConfig,
    session: Arc<WalletSession>,
    ledger: Arc<TransactionsContainer>,
    tracker: TransactionTracker,
}

impl DappContext {
    /// Loads the on-disk configuration, applies `DAPP_*` overrides and wires the HTTP
    /// backend and gateway clients.
    pub fn load(config_path: impl AsRef<Path>, host: HostAdapters) -> WalletResult<Self> {
        let environment = std::env::var("DAPP_ENV").unwrap_or_else(|_| "development".to_string());
        let mut config = ConfigStore::new(config_path).load_or_default(environment)?;
        config.apply_env_overrides();
        Self::new(config, host)
    }

    pub fn new(config: ClientConfig, host: HostAdapters) -> WalletResult<Self> {
        config.validate()?;
        let backend = Arc::new(HttpTokenExchange::new(&config.backend)?);
        let network = Arc::new(GatewayClient::from_config(&config.network)?);
        Self::with_services(config, host, backend, network)
    }

    /// Wires the context around caller-provided backend and network clients.
    pub fn with_services(
        config: ClientConfig,
        host: HostAdapters,
        backend: Arc<dyn TokenExchange>,
        network: Arc<dyn NetworkClient>,
    ) -> WalletResult<Self> {
        config.validate()?;
        let ledger = Arc::new(TransactionsContainer::new());
        let pipeline = TransactionSubmissionPipeline::new(network.clone(), ledger.clone());
        let session = WalletSession::new(SessionDeps {
            store: host.store,
            bridge: host.bridge,
            navigator: host.navigator,
            backend,
            pipeline,
            providers: config.wallets.clone(),
        });
        let tracker = TransactionTracker::from_config(network, ledger.clone(), &config.network);

        log::info!("dApp context ready ({})", config.environment);
        Ok(Self {
            config,
            session: Arc::new(session),
            ledger,
            tracker,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn ledger(&self) -> &Arc<TransactionsContainer> {
        &self.ledger
    }

    pub fn hardware_pager(&self) -> HardwareAddressPager {
        HardwareAddressPager::new(self.session.channel_factory())
    }

    /// Tracks a recorded batch until it settles or `cancel` fires.
    pub async fn track_batch(&self, id: Uuid, cancel: CancelSignal) -> WalletResult<TrackOutcome> {
        let batch = self
            .ledger
            .batch(id)
            .ok_or_else(|| WalletError::ValidationError(format!("Unknown batch {}", id)))?;
        self.tracker.track(&batch, cancel).await
    }
}
