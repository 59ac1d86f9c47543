//! Per-network chain client cache.
//!
//! Built once at startup from configuration; networks without an RPC
//! endpoint are skipped with a warning so the rest of the registry keeps
//! working. Startup fails only when no network is reachable at all.

use crate::chain::evm::EvmVaultClient;
use crate::chain::{ChainError, VaultChainOps};
use crate::config::AppConfig;
use crate::network::Network;
use alloy::network::EthereumWallet;
use dashmap::DashMap;
use std::sync::Arc;

/// Holds one [`VaultChainOps`] client per configured network.
pub struct ProviderCache {
    clients: DashMap<Network, Arc<dyn VaultChainOps>>,
}

impl ProviderCache {
    /// Build clients for every registry network with a configured RPC
    /// endpoint.
    ///
    /// # Errors
    /// [`ChainError::NoEndpoints`] when no network has an endpoint, or the
    /// first construction failure for an endpoint that was configured.
    pub async fn from_config(
        config: &AppConfig,
        wallet: Option<EthereumWallet>,
    ) -> Result<Self, ChainError> {
        let clients: DashMap<Network, Arc<dyn VaultChainOps>> = DashMap::new();

        for network in Network::variants() {
            let Some(rpc_url) = config.rpc_url_for(*network) else {
                tracing::warn!(network = %network, "no RPC endpoint configured; network skipped");
                continue;
            };
            let client = EvmVaultClient::try_new(
                *network,
                rpc_url,
                config.vault.address,
                wallet.clone(),
                config.vault.token_decimals,
                &config.polling,
            )
            .await?;
            clients.insert(*network, Arc::new(client));
        }

        if clients.is_empty() {
            return Err(ChainError::NoEndpoints);
        }
        Ok(Self { clients })
    }

    /// Build a cache from pre-constructed clients. Used when embedding the
    /// core with a custom chain layer, and by tests.
    pub fn from_clients(clients: Vec<Arc<dyn VaultChainOps>>) -> Self {
        let map = DashMap::new();
        for client in clients {
            map.insert(client.network(), client);
        }
        Self { clients: map }
    }

    /// Client for one network, if configured.
    pub fn client(&self, network: Network) -> Option<Arc<dyn VaultChainOps>> {
        self.clients.get(&network).map(|entry| Arc::clone(&entry))
    }

    /// All configured clients, in registry order.
    pub fn all(&self) -> Vec<Arc<dyn VaultChainOps>> {
        Network::variants()
            .iter()
            .filter_map(|network| self.client(*network))
            .collect()
    }

    /// Networks with a configured client, in registry order.
    pub fn networks(&self) -> Vec<Network> {
        Network::variants()
            .iter()
            .copied()
            .filter(|network| self.clients.contains_key(network))
            .collect()
    }
}
