//! EVM chain access for the vault and its underlying token.
//!
//! One [`EvmVaultClient`] per network, each wrapping an Alloy provider.
//! Reads are batched through Multicall3 so a whole per-network refresh is
//! one RPC round-trip; each item in the batch may independently fail and
//! is coerced to an absent value. Writes (approve, deposit, redeem) are
//! chain-scoped against the vault/token addresses resolved for this
//! network and require a signer-backed provider.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::sol;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;
use url::Url;

use crate::chain::{ChainError, RawAccountState, RawVaultStats, VaultChainOps};
use crate::config::PollingConfig;
use crate::network::{usdc_deployment, Network};
use crate::quote::FeeQuote;

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function decimals() external view returns (uint8);
    }
}

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IOmniVault {
        struct MessagingFee {
            uint256 nativeFee;
            uint256 lzTokenFee;
        }

        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function stats() external view returns (uint256 localAssets, uint256 localShares);
        function quoteDeposit(bytes extraOptions) external view returns (MessagingFee fee);
        function deposit(uint256 amount, address receiver, bytes extraOptions) external payable;
        function redeem(uint256 shares, address owner, address receiver, bytes extraOptions) external payable;
    }
}

/// The vault's write calls take an extensibility payload; it is currently
/// always empty.
fn extra_options() -> Bytes {
    Bytes::new()
}

/// Alloy-backed [`VaultChainOps`] implementation for one EVM network.
pub struct EvmVaultClient {
    network: Network,
    provider: DynProvider,
    token: Address,
    vault: Option<Address>,
    /// Effective token decimals after one-time on-chain validation.
    decimals: u8,
    /// Whether the provider carries a signer; writes are refused otherwise.
    can_write: bool,
    receipt_timeout: Duration,
}

impl EvmVaultClient {
    /// Build a client for `network` against a single RPC endpoint.
    ///
    /// The token address comes from the registry; the vault address is the
    /// configured one (absent disables writes and vault reads for this
    /// network). Token decimals are validated once against the on-chain
    /// `decimals()`; on mismatch the on-chain value wins for this network,
    /// and on read failure the configured value stands.
    pub async fn try_new(
        network: Network,
        rpc_url: &Url,
        vault: Option<Address>,
        wallet: Option<EthereumWallet>,
        configured_decimals: u8,
        polling: &PollingConfig,
    ) -> Result<Self, ChainError> {
        let token = usdc_deployment(network)
            .ok_or(ChainError::MissingToken(network))?
            .address;

        let http_client = alloy::transports::http::reqwest::Client::builder()
            .connect_timeout(polling.connect_timeout())
            .timeout(polling.rpc_timeout())
            .build()
            .map_err(|e| ChainError::Setup {
                network,
                reason: format!("failed to build HTTP client for {rpc_url}: {e}"),
            })?;
        let transport = alloy::transports::http::Http::with_client(http_client, rpc_url.clone());
        let client = RpcClient::new(transport, false);

        let can_write = wallet.is_some();
        let provider = match wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet)
                .connect_client(client)
                .erased(),
            None => ProviderBuilder::new().connect_client(client).erased(),
        };

        let decimals =
            Self::validate_decimals(&provider, network, token, configured_decimals).await;

        tracing::info!(
            network = %network,
            rpc = %rpc_url,
            %token,
            vault = ?vault,
            decimals,
            writable = can_write,
            "Initialized provider"
        );

        Ok(Self {
            network,
            provider,
            token,
            vault,
            decimals,
            can_write,
            receipt_timeout: polling.receipt_timeout(),
        })
    }

    /// One-time per-network decimals check against the token contract.
    async fn validate_decimals(
        provider: &DynProvider,
        network: Network,
        token: Address,
        configured: u8,
    ) -> u8 {
        let erc20 = IERC20::new(token, provider.clone());
        match erc20.decimals().call().await {
            Ok(on_chain) if on_chain == configured => configured,
            Ok(on_chain) => {
                tracing::warn!(
                    network = %network,
                    configured,
                    on_chain,
                    "token decimals differ from configuration; using on-chain value"
                );
                on_chain
            }
            Err(e) => {
                tracing::debug!(
                    network = %network,
                    error = %e,
                    "decimals query failed; keeping configured value"
                );
                configured
            }
        }
    }

    fn token_contract(&self) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(self.token, self.provider.clone())
    }

    fn vault_contract(&self) -> Result<IOmniVault::IOmniVaultInstance<DynProvider>, ChainError> {
        let vault = self.vault.ok_or(ChainError::MissingVaultAddress)?;
        Ok(IOmniVault::new(vault, self.provider.clone()))
    }

    fn require_signer(&self) -> Result<(), ChainError> {
        if self.can_write {
            Ok(())
        } else {
            Err(ChainError::NoSigner)
        }
    }

    fn call_error(&self, what: &str, e: impl Display) -> ChainError {
        ChainError::ContractCall {
            network: self.network,
            reason: format!("{what}: {e}"),
        }
    }

    fn write_error(&self, what: &str, e: impl Display) -> ChainError {
        ChainError::WriteFailed {
            network: self.network,
            reason: format!("{what}: {e}"),
        }
    }

    /// Collapse one multicall item to an absent value on failure.
    fn item<T>(&self, what: &'static str, result: Result<T, impl Display>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(network = %self.network, error = %e, "{what} unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl VaultChainOps for EvmVaultClient {
    fn network(&self) -> Network {
        self.network
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn has_vault(&self) -> bool {
        self.vault.is_some()
    }

    async fn read_vault_stats(&self) -> Result<RawVaultStats, ChainError> {
        let vault = match self.vault_contract() {
            Ok(vault) => vault,
            // Without a vault address there is nothing to read; every cell
            // stays absent rather than erroring the refresh.
            Err(_) => return Ok(RawVaultStats::default()),
        };

        let (total_supply, stats) = self
            .provider
            .multicall()
            .add(vault.totalSupply())
            .add(vault.stats())
            .aggregate3()
            .await
            .map_err(|e| self.call_error("vault stats multicall", e))?;

        let stats = self.item("vault stats", stats);
        Ok(RawVaultStats {
            total_supply: self.item("vault total supply", total_supply),
            local_assets: stats.as_ref().map(|s| s.localAssets),
            local_shares: stats.as_ref().map(|s| s.localShares),
        })
    }

    async fn read_account_state(&self, account: Address) -> Result<RawAccountState, ChainError> {
        let token = self.token_contract();

        let Ok(vault) = self.vault_contract() else {
            // Allowance and share balance need a spender; only the token
            // balance is readable.
            let balance = token
                .balanceOf(account)
                .call()
                .await
                .map_err(|e| self.call_error("token balance", e))?;
            return Ok(RawAccountState {
                token_balance: Some(balance),
                ..RawAccountState::default()
            });
        };
        let vault_address = *vault.address();

        let (token_balance, allowance, share_balance) = self
            .provider
            .multicall()
            .add(token.balanceOf(account))
            .add(token.allowance(account, vault_address))
            .add(vault.balanceOf(account))
            .aggregate3()
            .await
            .map_err(|e| self.call_error("account state multicall", e))?;

        Ok(RawAccountState {
            token_balance: self.item("token balance", token_balance),
            allowance: self.item("token allowance", allowance),
            share_balance: self.item("share balance", share_balance),
        })
    }

    async fn quote_deposit(&self) -> Result<FeeQuote, ChainError> {
        let vault = self.vault_contract()?;
        let fee = vault
            .quoteDeposit(extra_options())
            .call()
            .await
            .map_err(|e| self.call_error("fee quote", e))?;
        Ok(FeeQuote {
            native_fee: fee.nativeFee,
        })
    }

    async fn approve(&self, amount: U256) -> Result<TxHash, ChainError> {
        self.require_signer()?;
        let spender = self.vault.ok_or(ChainError::MissingVaultAddress)?;
        let pending = self
            .token_contract()
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| self.write_error("approve", e))?;
        let tx = *pending.tx_hash();
        tracing::info!(network = %self.network, %tx, %amount, "approval submitted");
        Ok(tx)
    }

    async fn deposit(
        &self,
        amount: U256,
        receiver: Address,
        native_fee: U256,
    ) -> Result<TxHash, ChainError> {
        self.require_signer()?;
        let vault = self.vault_contract()?;
        let pending = vault
            .deposit(amount, receiver, extra_options())
            .value(native_fee)
            .send()
            .await
            .map_err(|e| self.write_error("deposit", e))?;
        let tx = *pending.tx_hash();
        tracing::info!(network = %self.network, %tx, %amount, %native_fee, "deposit submitted");
        Ok(tx)
    }

    async fn redeem(
        &self,
        shares: U256,
        owner: Address,
        receiver: Address,
        native_fee: U256,
    ) -> Result<TxHash, ChainError> {
        self.require_signer()?;
        let vault = self.vault_contract()?;
        let pending = vault
            .redeem(shares, owner, receiver, extra_options())
            .value(native_fee)
            .send()
            .await
            .map_err(|e| self.write_error("redeem", e))?;
        let tx = *pending.tx_hash();
        tracing::info!(network = %self.network, %tx, %shares, %native_fee, "redeem submitted");
        Ok(tx)
    }

    async fn confirm(&self, tx: TxHash) -> Result<(), ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|_| ChainError::ReceiptTimeout {
                network: self.network,
                tx,
            })?;

        if receipt.status() {
            tracing::info!(network = %self.network, %tx, "transaction confirmed");
            Ok(())
        } else {
            Err(ChainError::WriteFailed {
                network: self.network,
                reason: format!("transaction {tx} reverted"),
            })
        }
    }
}
