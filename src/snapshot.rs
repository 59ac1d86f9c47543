//! Per-network snapshots and the sequence-guarded store.
//!
//! The reader is the only writer; every other component reads. Each
//! network's statistics and account state are replaced wholesale per
//! refresh cycle and guarded by a monotonic sequence number so a
//! late-arriving stale response can never overwrite a fresher one.
//! Missing reads are coerced to zero for display but stay
//! distinguishable from confirmed zeros internally.

use crate::chain::{RawAccountState, RawVaultStats};
use crate::network::Network;
use alloy::primitives::U256;
use std::collections::HashMap;
use std::sync::RwLock;

/// Provenance of a read cell's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    /// Observed on-chain.
    Confirmed,
    /// The call failed or was never made; the value is a display default.
    Missing,
}

/// One observed integer value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCell {
    pub value: U256,
    pub origin: ReadOrigin,
}

impl ReadCell {
    pub fn confirmed(value: U256) -> Self {
        Self {
            value,
            origin: ReadOrigin::Confirmed,
        }
    }

    /// Zero because missing, not because observed.
    pub fn missing() -> Self {
        Self {
            value: U256::ZERO,
            origin: ReadOrigin::Missing,
        }
    }

    pub fn from_read(value: Option<U256>) -> Self {
        match value {
            Some(value) => Self::confirmed(value),
            None => Self::missing(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.origin == ReadOrigin::Confirmed
    }
}

impl Default for ReadCell {
    fn default() -> Self {
        Self::missing()
    }
}

/// Aggregate vault statistics for one network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultStats {
    pub total_supply: ReadCell,
    pub local_assets: ReadCell,
    pub local_shares: ReadCell,
}

impl From<RawVaultStats> for VaultStats {
    fn from(raw: RawVaultStats) -> Self {
        Self {
            total_supply: ReadCell::from_read(raw.total_supply),
            local_assets: ReadCell::from_read(raw.local_assets),
            local_shares: ReadCell::from_read(raw.local_shares),
        }
    }
}

/// Connected-account state for one network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub token_balance: ReadCell,
    pub allowance: ReadCell,
    pub share_balance: ReadCell,
}

impl From<RawAccountState> for AccountState {
    fn from(raw: RawAccountState) -> Self {
        Self {
            token_balance: ReadCell::from_read(raw.token_balance),
            allowance: ReadCell::from_read(raw.allowance),
            share_balance: ReadCell::from_read(raw.share_balance),
        }
    }
}

/// The latest applied state for one network, with the sequence numbers of
/// the refresh cycles that produced it. Statistics and account state poll
/// on different cadences and are guarded independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkSnapshot {
    pub stats_seq: u64,
    pub account_seq: u64,
    pub stats: VaultStats,
    pub account: AccountState,
}

/// One network's share holding, for the per-chain holdings listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareHolding {
    pub network: Network,
    pub shares: U256,
}

/// One network's vault statistics, for the aggregate display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStats {
    pub network: Network,
    pub local_shares: U256,
    pub local_assets: U256,
}

/// Snapshot store shared between the reader and all consumers.
///
/// Written only by the reader; every apply replaces a network's record
/// atomically, so consumers never observe a mix of two refresh cycles for
/// the same network.
#[derive(Default)]
pub struct SnapshotStore {
    inner: RwLock<HashMap<Network, NetworkSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a statistics refresh for `network`, unless a newer cycle has
    /// already been applied. Returns whether the update was taken.
    pub fn apply_stats(&self, network: Network, seq: u64, raw: RawVaultStats) -> bool {
        let mut inner = self.inner.write().unwrap();
        let entry = inner.entry(network).or_default();
        if seq <= entry.stats_seq {
            return false;
        }
        entry.stats_seq = seq;
        entry.stats = raw.into();
        true
    }

    /// Apply an account-state refresh for `network`, unless a newer cycle
    /// has already been applied. Returns whether the update was taken.
    pub fn apply_account(&self, network: Network, seq: u64, raw: RawAccountState) -> bool {
        let mut inner = self.inner.write().unwrap();
        let entry = inner.entry(network).or_default();
        if seq <= entry.account_seq {
            return false;
        }
        entry.account_seq = seq;
        entry.account = raw.into();
        true
    }

    /// Latest snapshot for one network; zeros if never refreshed.
    pub fn get(&self, network: Network) -> NetworkSnapshot {
        self.inner
            .read()
            .unwrap()
            .get(&network)
            .copied()
            .unwrap_or_default()
    }

    /// Currently observed allowance granted to the vault on `network`.
    pub fn allowance(&self, network: Network) -> U256 {
        self.get(network).account.allowance.value
    }

    /// Mark a network's allowance stale after a write so it must be
    /// re-fetched rather than assumed. The displayed value is retained.
    pub fn mark_allowance_stale(&self, network: Network) {
        let mut inner = self.inner.write().unwrap();
        let entry = inner.entry(network).or_default();
        entry.account.allowance.origin = ReadOrigin::Missing;
    }

    /// Per-network share holdings of the connected account, zero balances
    /// filtered, largest first.
    pub fn share_holdings(&self) -> Vec<ShareHolding> {
        let inner = self.inner.read().unwrap();
        let mut holdings: Vec<ShareHolding> = inner
            .iter()
            .filter(|(_, snapshot)| !snapshot.account.share_balance.value.is_zero())
            .map(|(network, snapshot)| ShareHolding {
                network: *network,
                shares: snapshot.account.share_balance.value,
            })
            .collect();
        holdings.sort_by(|a, b| b.shares.cmp(&a.shares));
        holdings
    }

    /// Per-network vault statistics, entries with neither shares nor
    /// assets filtered out.
    pub fn stats_by_chain(&self) -> Vec<ChainStats> {
        let inner = self.inner.read().unwrap();
        let mut stats: Vec<ChainStats> = inner
            .iter()
            .map(|(network, snapshot)| ChainStats {
                network: *network,
                local_shares: snapshot.stats.local_shares.value,
                local_assets: snapshot.stats.local_assets.value,
            })
            .filter(|s| !s.local_shares.is_zero() || !s.local_assets.is_zero())
            .collect();
        stats.sort_by_key(|s| s.network.chain_id());
        stats
    }
}
