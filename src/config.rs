//! Client configuration.
//!
//! Loaded from an optional TOML file with environment overrides on top:
//! `VAULT_ADDRESS` supplies the vault contract and `RPC_URL_<NETWORK>`
//! (e.g. `RPC_URL_POLYGON`) supplies per-network endpoints. Configuration
//! is optional and defaults to a read-only setup; a missing vault address
//! disables all write actions rather than failing startup.

use crate::gate::ApprovalPolicy;
use crate::network::Network;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Decimal precision assumed for the underlying token when the on-chain
/// `decimals()` query is unavailable.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Complete client configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub vault: VaultConfig,
    pub polling: PollingConfig,
    pub rpc: RpcConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    /// If the file exists but is malformed, returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Load configuration from `CONFIG_FILE` (default `omnivault.toml`),
    /// then apply environment overrides.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "omnivault.toml".to_string());
        let mut config = Self::from_file(config_path)?;

        if let Ok(raw) = std::env::var("VAULT_ADDRESS") {
            match raw.trim().parse::<Address>() {
                Ok(address) => config.vault.address = Some(address),
                Err(e) => {
                    tracing::warn!(error = %e, "VAULT_ADDRESS is not a valid address; ignoring")
                }
            }
        }

        for network in Network::variants() {
            let var = format!("RPC_URL_{}", network.to_string().to_uppercase());
            if let Ok(raw) = std::env::var(&var) {
                match raw.trim().parse::<Url>() {
                    Ok(url) => {
                        config.rpc.endpoints.insert(network.to_string(), url);
                    }
                    Err(e) => tracing::warn!(var, error = %e, "invalid RPC URL; ignoring"),
                }
            }
        }

        Ok(config)
    }

    /// Apply a user-entered vault address when no configured default exists.
    ///
    /// Returns `false` (leaving the configuration untouched) when the text
    /// does not parse as an address.
    pub fn with_vault_override(&mut self, text: &str) -> bool {
        match text.trim().parse::<Address>() {
            Ok(address) => {
                self.vault.address = Some(address);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "vault address override rejected");
                false
            }
        }
    }

    /// RPC endpoint for the given network, if configured.
    pub fn rpc_url_for(&self, network: Network) -> Option<&Url> {
        self.rpc.endpoints.get(&network.to_string())
    }
}

/// Vault contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault contract address; the same address on every supported network.
    /// Absent means all write actions are disabled.
    pub address: Option<Address>,
    /// Declared decimal precision of the underlying token.
    pub token_decimals: u8,
    /// Whether approvals request the exact amount or an unbounded allowance.
    pub approval_policy: ApprovalPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: None,
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            approval_policy: ApprovalPolicy::default(),
        }
    }
}

/// Refresh cadences and remote-call timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Cadence for account balances and allowances, in seconds.
    /// Gating data refreshes faster than aggregate statistics.
    pub account_poll_secs: u64,
    /// Cadence for aggregate vault statistics, in seconds.
    pub stats_poll_secs: u64,
    /// How long a fee quote stays usable before it must be re-queried.
    pub quote_max_age_secs: u64,
    /// Timeout for waiting on a transaction receipt.
    pub receipt_timeout_secs: u64,
    /// Timeout for individual RPC requests.
    pub rpc_timeout_secs: u64,
    /// HTTP connection establishment timeout.
    pub connect_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            account_poll_secs: 5,
            stats_poll_secs: 15,
            quote_max_age_secs: 15,
            receipt_timeout_secs: 120,
            rpc_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl PollingConfig {
    pub fn account_poll(&self) -> Duration {
        Duration::from_secs(self.account_poll_secs)
    }

    pub fn stats_poll(&self) -> Duration {
        Duration::from_secs(self.stats_poll_secs)
    }

    pub fn quote_max_age(&self) -> Duration {
        Duration::from_secs(self.quote_max_age_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Per-network RPC endpoints, keyed by network name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    pub endpoints: HashMap<String, Url>,
}
