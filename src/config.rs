//! Operator configuration
//!
//! Loaded once at startup from a JSON file (same keys as the operator's
//! `config.json`) and then overridden by environment variables, with a `.env`
//! file read first when present. The result is passed explicitly to every
//! constructor; nothing reads configuration after startup.

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::confirmation::{PollPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::redact::Redacted;

/// Proxy binding row: `fromProxy` on `fromChainId` maps to `toProxy` on `toChainId`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindProxy {
    pub from_chain_id: u64,
    pub from_proxy: String,
    pub to_chain_id: u64,
    pub to_proxy: String,
}

/// Asset binding row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindAsset {
    pub from_chain_id: u64,
    pub from_asset: String,
    pub to_chain_id: u64,
    pub to_asset: String,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// This chain's id in the cross-chain registry
    #[serde(default)]
    pub neo_chain_id: u64,
    #[serde(default)]
    pub neo_url: String,
    /// WIF-encoded signing key
    #[serde(default)]
    pub neo_wif: Option<Redacted<String>>,
    /// Encrypted wallet file; decryption is handled outside this tool
    #[serde(default)]
    pub neo_wallet: Option<String>,
    #[serde(default)]
    pub neo_wallet_pwd: Option<Redacted<String>>,
    /// Default lock proxy contract for CLI commands
    #[serde(default)]
    pub neo_lock_proxy: Option<String>,
    /// Default wrapper contract for lock / extractFee
    #[serde(default)]
    pub neo_wrapper: Option<String>,
    #[serde(default)]
    pub proxy_to_bind: Vec<BindProxy>,
    #[serde(default)]
    pub asset_to_bind: Vec<BindAsset>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// 0 waits until included
    #[serde(default = "default_max_attempts")]
    pub confirm_max_attempts: u32,
}

/// Custom Debug that keeps key material out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("neo_chain_id", &self.neo_chain_id)
            .field("neo_url", &self.neo_url)
            .field("neo_wif", &self.neo_wif)
            .field("neo_wallet", &self.neo_wallet)
            .field("neo_wallet_pwd", &self.neo_wallet_pwd)
            .field("neo_lock_proxy", &self.neo_lock_proxy)
            .field("neo_wrapper", &self.neo_wrapper)
            .field("proxy_to_bind", &self.proxy_to_bind.len())
            .field("asset_to_bind", &self.asset_to_bind.len())
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("confirm_max_attempts", &self.confirm_max_attempts)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neo_chain_id: 0,
            neo_url: String::new(),
            neo_wif: None,
            neo_wallet: None,
            neo_wallet_pwd: None,
            neo_lock_proxy: None,
            neo_wrapper: None,
            proxy_to_bind: Vec::new(),
            asset_to_bind: Vec::new(),
            poll_interval_ms: default_poll_interval(),
            confirm_max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Config {
    /// Load from an optional JSON file, then `.env`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if Path::new(".env").exists() {
            dotenvy::from_filename(".env").wrap_err("Failed to load .env file")?;
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&data)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| eyre!("Invalid config JSON: {}", e))
    }

    /// Environment variables take precedence over file values
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("NEO_RPC_URL") {
            self.neo_url = url;
        }
        if let Ok(id) = env::var("NEO_CHAIN_ID") {
            self.neo_chain_id = id.parse().wrap_err("NEO_CHAIN_ID must be a valid u64")?;
        }
        if let Ok(wif) = env::var("NEO_WIF") {
            self.neo_wif = Some(Redacted(wif));
        }
        if let Ok(proxy) = env::var("NEO_LOCK_PROXY") {
            self.neo_lock_proxy = Some(proxy);
        }
        if let Ok(wrapper) = env::var("NEO_WRAPPER") {
            self.neo_wrapper = Some(wrapper);
        }
        if let Ok(ms) = env::var("POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms.parse().wrap_err("POLL_INTERVAL_MS must be a valid u64")?;
        }
        if let Ok(max) = env::var("CONFIRM_MAX_ATTEMPTS") {
            self.confirm_max_attempts = max
                .parse()
                .wrap_err("CONFIRM_MAX_ATTEMPTS must be a valid u32")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.neo_url.trim().is_empty() {
            return Err(eyre!(
                "NEO RPC URL is required (neoUrl in config or NEO_RPC_URL)"
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(eyre!("Poll interval must be greater than zero"));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: match self.confirm_max_attempts {
                0 => None,
                n => Some(n),
            },
        }
    }

    /// WIF for the signer, if one is configured
    pub fn signer_wif(&self) -> Result<Option<&str>> {
        let wif = self
            .neo_wif
            .as_ref()
            .map(|w| w.expose().trim())
            .filter(|w| !w.is_empty());

        match (wif, &self.neo_wallet) {
            (Some(wif), _) => Ok(Some(wif)),
            (None, Some(wallet)) => Err(eyre!(
                "Wallet file {} is configured but encrypted wallets are not opened by this tool; set neoWif or NEO_WIF",
                wallet
            )),
            (None, None) => Ok(None),
        }
    }

    /// Proxy rows originating on this chain
    pub fn local_proxy_bindings(&self) -> impl Iterator<Item = &BindProxy> {
        self.proxy_to_bind
            .iter()
            .filter(move |b| b.from_chain_id == self.neo_chain_id)
    }

    /// Asset rows originating on this chain
    pub fn local_asset_bindings(&self) -> impl Iterator<Item = &BindAsset> {
        self.asset_to_bind
            .iter()
            .filter(move |b| b.from_chain_id == self.neo_chain_id)
    }
}
