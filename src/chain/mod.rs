//! Chain access layer.
//!
//! [`VaultChainOps`] is the seam between the client core and one network's
//! vault/token contracts. The production implementation lives in
//! [`evm`]; tests substitute mocks. Read results carry `Option` per call
//! so a single failed item degrades to an absent value instead of failing
//! the whole batch.

pub mod evm;

use crate::network::Network;
use crate::quote::FeeQuote;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

/// Errors local to one network's chain access.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// No RPC endpoint configured for the network.
    #[error("no RPC endpoint configured for {0}")]
    MissingRpc(Network),
    /// No RPC endpoint configured for any supported network.
    #[error("no RPC endpoint configured for any supported network")]
    NoEndpoints,
    /// Writes require a configured vault address.
    #[error("no vault address configured; write actions are disabled")]
    MissingVaultAddress,
    /// The underlying token has no known deployment on the network.
    #[error("no token deployment for {0}")]
    MissingToken(Network),
    /// Writes require a signer.
    #[error("no signer available for write operations")]
    NoSigner,
    /// A read call or batch failed at the transport or contract level.
    #[error("contract call failed on {network}: {reason}")]
    ContractCall { network: Network, reason: String },
    /// A write was rejected or reverted on-chain.
    #[error("transaction rejected or reverted on {network}: {reason}")]
    WriteFailed { network: Network, reason: String },
    /// The receipt did not arrive within the configured window.
    #[error("timed out waiting for receipt of {tx} on {network}")]
    ReceiptTimeout { network: Network, tx: TxHash },
    /// Client construction failed.
    #[error("failed to initialize provider for {network}: {reason}")]
    Setup { network: Network, reason: String },
}

/// Raw result of one batched vault-statistics read against a network.
///
/// `None` marks a call that failed or returned nothing; the reader
/// coerces absence to zero when building the snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawVaultStats {
    /// Vault share token total supply.
    pub total_supply: Option<U256>,
    /// Underlying assets held locally by this network's vault.
    pub local_assets: Option<U256>,
    /// Shares outstanding locally on this network.
    pub local_shares: Option<U256>,
}

/// Raw result of one batched account-state read against a network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawAccountState {
    /// Underlying-token balance of the connected account.
    pub token_balance: Option<U256>,
    /// Allowance granted by the account to the vault.
    pub allowance: Option<U256>,
    /// Vault share balance of the account.
    pub share_balance: Option<U256>,
}

/// Read and write operations against one network's vault and token.
#[async_trait]
pub trait VaultChainOps: Send + Sync {
    /// The network this client talks to.
    fn network(&self) -> Network;

    /// Effective token decimals, validated on-chain once at construction.
    fn decimals(&self) -> u8;

    /// Whether a vault address is resolvable on this network.
    fn has_vault(&self) -> bool;

    /// One batched read of the vault's aggregate statistics.
    async fn read_vault_stats(&self) -> Result<RawVaultStats, ChainError>;

    /// One batched read of the account's balances and allowance.
    async fn read_account_state(&self, account: Address) -> Result<RawAccountState, ChainError>;

    /// Native fee required for a cross-network deposit or redeem.
    async fn quote_deposit(&self) -> Result<FeeQuote, ChainError>;

    /// Submit a token approval for the vault.
    async fn approve(&self, amount: U256) -> Result<TxHash, ChainError>;

    /// Submit a vault deposit, payable with the quoted native fee.
    async fn deposit(
        &self,
        amount: U256,
        receiver: Address,
        native_fee: U256,
    ) -> Result<TxHash, ChainError>;

    /// Submit a vault share redemption, payable with the quoted native fee.
    async fn redeem(
        &self,
        shares: U256,
        owner: Address,
        receiver: Address,
        native_fee: U256,
    ) -> Result<TxHash, ChainError>;

    /// Wait until the transaction is confirmed; an unsuccessful receipt is
    /// an error.
    async fn confirm(&self, tx: TxHash) -> Result<(), ChainError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Configurable in-memory [`VaultChainOps`] for scenario tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    pub struct MockChainOps {
        network: Network,
        decimals: u8,
        has_vault: bool,
        stats: Mutex<Option<RawVaultStats>>,
        account: Mutex<Option<RawAccountState>>,
        quote: Mutex<Option<FeeQuote>>,
        fail_writes: AtomicBool,
        fail_confirm: AtomicBool,
        call_delay: Mutex<Option<Duration>>,
        pub account_reads: AtomicUsize,
        pub approvals: Mutex<Vec<U256>>,
        pub deposits: Mutex<Vec<(U256, Address, U256)>>,
        pub redeems: Mutex<Vec<(U256, Address, Address, U256)>>,
    }

    impl MockChainOps {
        pub fn new(network: Network) -> Self {
            Self {
                network,
                decimals: 6,
                has_vault: true,
                stats: Mutex::new(Some(RawVaultStats::default())),
                account: Mutex::new(Some(RawAccountState::default())),
                quote: Mutex::new(None),
                fail_writes: AtomicBool::new(false),
                fail_confirm: AtomicBool::new(false),
                call_delay: Mutex::new(None),
                account_reads: AtomicUsize::new(0),
                approvals: Mutex::new(Vec::new()),
                deposits: Mutex::new(Vec::new()),
                redeems: Mutex::new(Vec::new()),
            }
        }

        pub fn with_stats(self, stats: RawVaultStats) -> Self {
            *self.stats.lock().unwrap() = Some(stats);
            self
        }

        pub fn with_account(self, account: RawAccountState) -> Self {
            *self.account.lock().unwrap() = Some(account);
            self
        }

        pub fn with_quote(self, quote: FeeQuote) -> Self {
            *self.quote.lock().unwrap() = Some(quote);
            self
        }

        pub fn without_vault(mut self) -> Self {
            self.has_vault = false;
            self
        }

        /// All subsequent reads fail at the batch level.
        pub fn failing_reads(self) -> Self {
            *self.stats.lock().unwrap() = None;
            *self.account.lock().unwrap() = None;
            self
        }

        pub fn failing_writes(self) -> Self {
            self.fail_writes.store(true, Ordering::SeqCst);
            self
        }

        pub fn reverting_confirm(self) -> Self {
            self.fail_confirm.store(true, Ordering::SeqCst);
            self
        }

        /// Delay every remote call (reads and quotes) by `delay`.
        pub fn with_call_delay(self, delay: Duration) -> Self {
            *self.call_delay.lock().unwrap() = Some(delay);
            self
        }

        pub fn set_account_state(&self, account: RawAccountState) {
            *self.account.lock().unwrap() = Some(account);
        }

        fn call_error(&self) -> ChainError {
            ChainError::ContractCall {
                network: self.network,
                reason: "mock read failure".into(),
            }
        }

        async fn maybe_delay(&self) {
            let delay = *self.call_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl VaultChainOps for MockChainOps {
        fn network(&self) -> Network {
            self.network
        }

        fn decimals(&self) -> u8 {
            self.decimals
        }

        fn has_vault(&self) -> bool {
            self.has_vault
        }

        async fn read_vault_stats(&self) -> Result<RawVaultStats, ChainError> {
            self.maybe_delay().await;
            self.stats.lock().unwrap().ok_or_else(|| self.call_error())
        }

        async fn read_account_state(
            &self,
            _account: Address,
        ) -> Result<RawAccountState, ChainError> {
            self.maybe_delay().await;
            self.account_reads.fetch_add(1, Ordering::SeqCst);
            self.account
                .lock()
                .unwrap()
                .ok_or_else(|| self.call_error())
        }

        async fn quote_deposit(&self) -> Result<FeeQuote, ChainError> {
            self.maybe_delay().await;
            self.quote.lock().unwrap().ok_or_else(|| self.call_error())
        }

        async fn approve(&self, amount: U256) -> Result<TxHash, ChainError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ChainError::WriteFailed {
                    network: self.network,
                    reason: "mock rejection".into(),
                });
            }
            self.approvals.lock().unwrap().push(amount);
            Ok(TxHash::with_last_byte(1))
        }

        async fn deposit(
            &self,
            amount: U256,
            receiver: Address,
            native_fee: U256,
        ) -> Result<TxHash, ChainError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ChainError::WriteFailed {
                    network: self.network,
                    reason: "mock rejection".into(),
                });
            }
            self.deposits.lock().unwrap().push((amount, receiver, native_fee));
            Ok(TxHash::with_last_byte(2))
        }

        async fn redeem(
            &self,
            shares: U256,
            owner: Address,
            receiver: Address,
            native_fee: U256,
        ) -> Result<TxHash, ChainError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ChainError::WriteFailed {
                    network: self.network,
                    reason: "mock rejection".into(),
                });
            }
            self.redeems
                .lock()
                .unwrap()
                .push((shares, owner, receiver, native_fee));
            Ok(TxHash::with_last_byte(3))
        }

        async fn confirm(&self, tx: TxHash) -> Result<(), ChainError> {
            if self.fail_confirm.load(Ordering::SeqCst) {
                return Err(ChainError::WriteFailed {
                    network: self.network,
                    reason: format!("mock revert of {tx}"),
                });
            }
            Ok(())
        }
    }
}
