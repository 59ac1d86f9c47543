//! Wallet session: connected account and active network.
//!
//! The session is the client's view of the wallet. A signer sourced from
//! `PRIVATE_KEY` means connected; absence means the flow starts in its
//! disconnected state and the primary action is delegated to the external
//! wallet-connection collaborator. The active network always tracks the
//! wallet's chain, falling back to the designated default when the
//! wallet's chain is not in the registry.

use crate::network::Network;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::sync::RwLock;

pub struct WalletSession {
    wallet: Option<EthereumWallet>,
    account: Option<Address>,
    active: RwLock<Network>,
}

impl WalletSession {
    /// Build a session from the `PRIVATE_KEY` environment variable; a
    /// missing or invalid key starts the session disconnected.
    pub fn from_env() -> Self {
        match std::env::var("PRIVATE_KEY") {
            Ok(raw) => match raw.trim().parse::<PrivateKeySigner>() {
                Ok(signer) => Self::connected(signer),
                Err(e) => {
                    tracing::warn!(error = %e, "PRIVATE_KEY is not a valid key; starting disconnected");
                    Self::disconnected()
                }
            },
            Err(_) => Self::disconnected(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            wallet: None,
            account: None,
            active: RwLock::new(Network::DEFAULT),
        }
    }

    pub fn connected(signer: PrivateKeySigner) -> Self {
        let account = signer.address();
        Self {
            wallet: Some(EthereumWallet::from(signer)),
            account: Some(account),
            active: RwLock::new(Network::DEFAULT),
        }
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn wallet(&self) -> Option<&EthereumWallet> {
        self.wallet.as_ref()
    }

    /// The currently selected network. Always a registry member.
    pub fn active_network(&self) -> Network {
        *self.active.read().unwrap()
    }

    /// Track the wallet's reported chain. Unsupported chains fall back to
    /// the default network.
    pub fn set_active_chain(&self, chain_id: u64) -> Network {
        let network = Network::from_chain_id(chain_id).unwrap_or_else(|| {
            tracing::warn!(chain_id, fallback = %Network::DEFAULT, "wallet chain not supported; falling back");
            Network::DEFAULT
        });
        self.set_active(network);
        network
    }

    pub(crate) fn set_active(&self, network: Network) {
        *self.active.write().unwrap() = network;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_session_has_no_account() {
        let session = WalletSession::disconnected();
        assert!(!session.is_connected());
        assert_eq!(session.account(), None);
        assert_eq!(session.active_network(), Network::DEFAULT);
    }

    #[test]
    fn connected_session_exposes_signer_address() {
        let signer = PrivateKeySigner::random();
        let expected = signer.address();
        let session = WalletSession::connected(signer);
        assert!(session.is_connected());
        assert_eq!(session.account(), Some(expected));
        assert!(session.wallet().is_some());
    }

    #[test]
    fn unsupported_chain_falls_back_to_default() {
        let session = WalletSession::disconnected();
        assert_eq!(session.set_active_chain(42161), Network::Arbitrum);
        assert_eq!(session.active_network(), Network::Arbitrum);

        // Mainnet Ethereum is not in the registry.
        assert_eq!(session.set_active_chain(1), Network::DEFAULT);
        assert_eq!(session.active_network(), Network::DEFAULT);
    }
}
