use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use blake3::Hasher as Blake3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{WalletError, WalletResult};

const CONFIG_VERSION: u16 = 1;

const KEY_BACKEND_URL: &str = "DAPP_BACKEND_URL";
const KEY_GATEWAY_URL: &str = "DAPP_GATEWAY_URL";
const KEY_REDIRECT_V1_URL: &str = "DAPP_REDIRECT_V1_URL";
const KEY_REDIRECT_V2_URL: &str = "DAPP_REDIRECT_V2_URL";
const KEY_TX_CHECK_INTERVAL_MS: &str = "DAPP_TX_CHECK_INTERVAL_MS";
const KEY_HARDWARE_PAGE_SIZE: &str = "DAPP_HARDWARE_PAGE_SIZE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub verify_path: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            verify_path: "/connection/verify".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub gateway_url: String,
    pub tx_check_interval_ms: u64,
    pub tx_check_max_polls: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://devnet-gateway.multiversx.com".to_string(),
            tx_check_interval_ms: 6_000,
            tx_check_max_polls: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalletProvidersConfig {
    pub redirect_v1_url: String,
    pub redirect_v2_url: String,
    pub hardware_page_size: usize,
}

impl Default for WalletProvidersConfig {
    fn default() -> Self {
        Self {
            redirect_v1_url: "https://devnet-wallet.multiversx.com".to_string(),
            redirect_v2_url: "https://devnet2-wallet.multiversx.com".to_string(),
            hardware_page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wallets: WalletProvidersConfig,
    pub environment: String,
    pub last_updated: DateTime<Utc>,
    pub version: u16,
}

impl ClientConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::default(),
            network: NetworkConfig::default(),
            wallets: WalletProvidersConfig::default(),
            environment: environment.into(),
            last_updated: Utc::now(),
            version: CONFIG_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Applies `DAPP_*` environment overrides. Empty or unparsable values are skipped
    /// with a warning rather than failing startup.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| -> Option<String> {
            let value = lookup(key)?;
            if value.trim().is_empty() {
                log::warn!("Environment variable {} is empty", key);
                return None;
            }
            log::debug!("Applying configuration override from {}", key);
            Some(value.trim().to_string())
        };

        if let Some(url) = read(KEY_BACKEND_URL) {
            self.backend.base_url = url;
        }
        if let Some(url) = read(KEY_GATEWAY_URL) {
            self.network.gateway_url = url;
        }
        if let Some(url) = read(KEY_REDIRECT_V1_URL) {
            self.wallets.redirect_v1_url = url;
        }
        if let Some(url) = read(KEY_REDIRECT_V2_URL) {
            self.wallets.redirect_v2_url = url;
        }
        if let Some(raw) = read(KEY_TX_CHECK_INTERVAL_MS) {
            match raw.parse() {
                Ok(interval) => self.network.tx_check_interval_ms = interval,
                Err(_) => log::warn!("Ignoring non-numeric {}={}", KEY_TX_CHECK_INTERVAL_MS, raw),
            }
        }
        if let Some(raw) = read(KEY_HARDWARE_PAGE_SIZE) {
            match raw.parse() {
                Ok(size) => self.wallets.hardware_page_size = size,
                Err(_) => log::warn!("Ignoring non-numeric {}={}", KEY_HARDWARE_PAGE_SIZE, raw),
            }
        }
    }

    pub fn validate(&self) -> WalletResult<()> {
        for (name, value) in [
            ("backend.base_url", &self.backend.base_url),
            ("network.gateway_url", &self.network.gateway_url),
            ("wallets.redirect_v1_url", &self.wallets.redirect_v1_url),
            ("wallets.redirect_v2_url", &self.wallets.redirect_v2_url),
        ] {
            Url::parse(value)
                .map_err(|e| WalletError::ConfigError(format!("{} is not a URL: {}", name, e)))?;
        }

        if self.wallets.hardware_page_size == 0 {
            return Err(WalletError::ConfigError(
                "wallets.hardware_page_size must be positive".to_string(),
            ));
        }
        if self.network.tx_check_interval_ms == 0 || self.network.tx_check_max_polls == 0 {
            return Err(WalletError::ConfigError(
                "network transaction checks need a positive interval and poll count".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u16,
    checksum: [u8; 32],
    payload: ClientConfig,
    modified_at_unix: i64,
}

/// Handles persistence of client configuration with integrity checks.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load_or_default(&self, environment: impl Into<String>) -> WalletResult<ClientConfig> {
        if !self.path.exists() {
            let config = ClientConfig::new(environment);
            self.save(&config)?;
            return Ok(config);
        }

        let bytes = fs::read(&self.path)?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::ConfigError(format!("Unreadable config: {}", e)))?;
        if envelope.version != CONFIG_VERSION {
            return Err(WalletError::ConfigError(format!(
                "Unsupported config version {}",
                envelope.version
            )));
        }

        let checksum = checksum(&envelope.payload)?;
        if checksum != envelope.checksum {
            return Err(WalletError::ConfigError(
                "Config integrity verification failed".to_string(),
            ));
        }

        Ok(envelope.payload)
    }

    pub fn save(&self, config: &ClientConfig) -> WalletResult<()> {
        let mut payload = config.clone();
        payload.touch();

        let envelope = ConfigEnvelope {
            version: CONFIG_VERSION,
            checksum: checksum(&payload)?,
            modified_at_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_err(|e| WalletError::StorageError(e.to_string()))?
                .as_secs() as i64,
            payload,
        };

        let serialized = serde_json::to_vec_pretty(&envelope)?;
        let tmp_path = self.path.with_extension("new");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn update<F>(
        &self,
        environment: impl Into<String>,
        updater: F,
    ) -> WalletResult<ClientConfig>
    where
        F: FnOnce(&mut ClientConfig) -> WalletResult<()>,
    {
        let mut config = self.load_or_default(environment)?;
        updater(&mut config)?;
        config.validate()?;
        config.touch();
        self.save(&config)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn checksum(config: &ClientConfig) -> WalletResult<[u8; 32]> {
    let mut hasher = Blake3::new();
    let encoded = serde_json::to_vec(config)?;
    hasher.update(&encoded);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    Ok(output)
}
