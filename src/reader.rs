//! Multi-chain reader.
//!
//! Issues one batched read per supported network in parallel and applies
//! the results to the snapshot store under a per-cycle sequence number.
//! A failed network degrades to zeros without blocking the others, and a
//! late response for an already-superseded cycle is discarded by the
//! store's guard. There is no per-call retry; the next scheduled poll is
//! the retry mechanism. Account data (balances, allowances) polls faster
//! than aggregate vault statistics.

use crate::chain::{RawAccountState, RawVaultStats};
use crate::config::PollingConfig;
use crate::network::Network;
use crate::provider_cache::ProviderCache;
use crate::snapshot::SnapshotStore;
use crate::wallet::WalletSession;
use alloy::primitives::Address;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub struct MultiChainReader {
    providers: Arc<ProviderCache>,
    store: SnapshotStore,
    polling: PollingConfig,
    /// Monotonic refresh-cycle counter; one value per poll, shared by all
    /// networks in that poll so a snapshot is from a single logical refresh.
    cycle: AtomicU64,
    /// Reads that gate correctness (forced allowance re-fetches); counted
    /// into the flow controller's busy projection.
    gating_reads: AtomicUsize,
    refresh: Notify,
}

impl MultiChainReader {
    pub fn new(providers: Arc<ProviderCache>, polling: PollingConfig) -> Self {
        Self {
            providers,
            store: SnapshotStore::new(),
            polling,
            cycle: AtomicU64::new(0),
            gating_reads: AtomicUsize::new(0),
            refresh: Notify::new(),
        }
    }

    /// The snapshot store this reader writes to. Read-only to callers.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Whether a correctness-gating read is currently in flight.
    pub fn gating_read_in_flight(&self) -> bool {
        self.gating_reads.load(Ordering::SeqCst) > 0
    }

    /// Ask the poll loop for an immediate refresh, e.g. after an amount
    /// edit or a network switch.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    fn next_seq(&self) -> u64 {
        self.cycle.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// One statistics refresh cycle across all configured networks.
    pub async fn poll_stats(&self) {
        let seq = self.next_seq();
        let reads = self.providers.all().into_iter().map(|client| async move {
            let network = client.network();
            let raw = client.read_vault_stats().await.unwrap_or_else(|e| {
                tracing::warn!(network = %network, error = %e, "vault stats read failed; degrading to zeros");
                RawVaultStats::default()
            });
            (network, raw)
        });

        for (network, raw) in futures::future::join_all(reads).await {
            if !self.store.apply_stats(network, seq, raw) {
                tracing::debug!(network = %network, seq, "stale stats response discarded");
            }
        }
    }

    /// One account-state refresh cycle across all configured networks.
    /// A disconnected session has nothing to read.
    pub async fn poll_account(&self, account: Option<Address>) {
        let Some(account) = account else { return };
        let seq = self.next_seq();
        let reads = self.providers.all().into_iter().map(|client| async move {
            let network = client.network();
            let raw = client.read_account_state(account).await.unwrap_or_else(|e| {
                tracing::warn!(network = %network, error = %e, "account read failed; degrading to zeros");
                RawAccountState::default()
            });
            (network, raw)
        });

        for (network, raw) in futures::future::join_all(reads).await {
            if !self.store.apply_account(network, seq, raw) {
                tracing::debug!(network = %network, seq, "stale account response discarded");
            }
        }
    }

    /// Forced re-fetch of one network's account state after a write, so a
    /// just-approved allowance is observed before the next action is
    /// offered. Counts as a gating read for the busy projection.
    pub async fn refresh_account(&self, network: Network, account: Address) {
        let Some(client) = self.providers.client(network) else {
            return;
        };
        self.gating_reads.fetch_add(1, Ordering::SeqCst);
        let seq = self.next_seq();
        let raw = client.read_account_state(account).await.unwrap_or_else(|e| {
            tracing::warn!(network = %network, error = %e, "gating account read failed");
            RawAccountState::default()
        });
        if !self.store.apply_account(network, seq, raw) {
            tracing::debug!(network = %network, seq, "stale gating response discarded");
        }
        self.gating_reads.fetch_sub(1, Ordering::SeqCst);
    }

    /// Polling loop. Runs until cancelled; ticks immediately on start.
    pub async fn run(self: Arc<Self>, session: Arc<WalletSession>, cancel: CancellationToken) {
        let mut account_tick = tokio::time::interval(self.polling.account_poll());
        let mut stats_tick = tokio::time::interval(self.polling.stats_poll());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("stopping multi-chain reader");
                    break;
                }
                _ = account_tick.tick() => {
                    self.poll_account(session.account()).await;
                }
                _ = stats_tick.tick() => {
                    self.poll_stats().await;
                }
                _ = self.refresh.notified() => {
                    self.poll_account(session.account()).await;
                    self.poll_stats().await;
                }
            }
        }
    }
}
