//! Chain switch coordination.
//!
//! Requests a network switch on the wallet session and exposes a pending
//! flag that the flow controller folds into its busy projection, so no
//! write can race a switch. Only registry networks with a configured
//! client are switchable.

use crate::chain::ChainError;
use crate::network::Network;
use crate::provider_cache::ProviderCache;
use crate::wallet::WalletSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("a network switch is already pending")]
    AlreadyPending,
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub struct ChainSwitchCoordinator {
    session: Arc<WalletSession>,
    providers: Arc<ProviderCache>,
    pending: AtomicBool,
}

impl ChainSwitchCoordinator {
    pub fn new(session: Arc<WalletSession>, providers: Arc<ProviderCache>) -> Self {
        Self {
            session,
            providers,
            pending: AtomicBool::new(false),
        }
    }

    /// Whether a switch request is still in flight.
    pub fn switch_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Request the wallet change its active network.
    ///
    /// Conflicting actions stay disabled (via [`switch_pending`]) until
    /// the request resolves.
    ///
    /// [`switch_pending`]: ChainSwitchCoordinator::switch_pending
    pub async fn switch_to(&self, network: Network) -> Result<(), SwitchError> {
        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(SwitchError::AlreadyPending);
        }
        let result = self.request_switch(network).await;
        self.pending.store(false, Ordering::SeqCst);
        result
    }

    async fn request_switch(&self, network: Network) -> Result<(), SwitchError> {
        if self.providers.client(network).is_none() {
            return Err(ChainError::MissingRpc(network).into());
        }
        self.session.set_active(network);
        tracing::info!(network = %network, chain_id = network.chain_id(), "active network switched");
        Ok(())
    }
}
