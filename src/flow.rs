//! Transaction flow controller.
//!
//! Owns the lifecycle of the primary user action: connect, approve,
//! deposit, withdraw. The controller is a projection over the wallet
//! session, the snapshot store, the fee quoter and the switch
//! coordinator; it never writes to the snapshot itself. One write may be
//! in flight at a time, a rejected or reverted write returns the flow to
//! its previous state with no automatic retry, and a confirmed write
//! forces a gating account refresh before the next action is offered.

use crate::amount::parse_amount;
use crate::chain::{ChainError, VaultChainOps};
use crate::config::DEFAULT_TOKEN_DECIMALS;
use crate::gate::{needs_approval, ApprovalPolicy};
use crate::network::Network;
use crate::provider_cache::ProviderCache;
use crate::quote::FeeQuoter;
use crate::reader::MultiChainReader;
use crate::switcher::{ChainSwitchCoordinator, SwitchError};
use crate::wallet::WalletSession;
use alloy::primitives::{Address, TxHash, U256};
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

/// Direction of the primary action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowMode {
    #[default]
    Deposit,
    Redeem,
}

/// The write currently in flight, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Approve,
    Deposit,
    Redeem,
}

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    kind: WriteKind,
    /// `None` until the wallet accepts and a hash exists.
    tx: Option<TxHash>,
}

/// Observable state of the flow, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No account connected; the only action is connecting.
    Disconnected,
    /// An approval must precede the deposit.
    NeedsApproval,
    /// The primary action can be submitted.
    ReadyToAct,
    /// A write is being prepared or awaits wallet acceptance.
    Submitting,
    /// A hash exists; waiting on the receipt.
    AwaitingConfirmation,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("no valid amount entered")]
    NoAmount,
    #[error("no account connected")]
    Disconnected,
    #[error("no vault deployed on the active network")]
    MissingVault,
    #[error("no messaging fee quote available")]
    NoFeeQuote,
    #[error("another action is already in flight")]
    Busy,
    #[error("a network switch is pending")]
    SwitchPending,
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub struct FlowController {
    providers: Arc<ProviderCache>,
    reader: Arc<MultiChainReader>,
    session: Arc<WalletSession>,
    switcher: Arc<ChainSwitchCoordinator>,
    quoter: FeeQuoter,
    policy: ApprovalPolicy,
    mode: RwLock<FlowMode>,
    amount_input: RwLock<String>,
    pending: Mutex<Option<PendingWrite>>,
}

impl FlowController {
    pub fn new(
        providers: Arc<ProviderCache>,
        reader: Arc<MultiChainReader>,
        session: Arc<WalletSession>,
        switcher: Arc<ChainSwitchCoordinator>,
        quoter: FeeQuoter,
        policy: ApprovalPolicy,
    ) -> Self {
        Self {
            providers,
            reader,
            session,
            switcher,
            quoter,
            policy,
            mode: RwLock::new(FlowMode::default()),
            amount_input: RwLock::new(String::new()),
            pending: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> FlowMode {
        *self.mode.read().unwrap()
    }

    /// Switch between deposit and withdraw. The entered amount carries
    /// over; it re-parses against the same token decimals either way.
    pub fn set_mode(&self, mode: FlowMode) {
        *self.mode.write().unwrap() = mode;
    }

    pub fn amount_input(&self) -> String {
        self.amount_input.read().unwrap().clone()
    }

    /// Record the user's amount text and ask for a prompt re-read so the
    /// allowance gate works against fresh data.
    pub fn set_amount(&self, input: impl Into<String>) {
        *self.amount_input.write().unwrap() = input.into();
        self.reader.request_refresh();
    }

    /// The entered amount in base units of the active network's token, or
    /// `None` while the input is empty or invalid.
    pub fn parsed_amount(&self) -> Option<U256> {
        let decimals = self
            .providers
            .client(self.session.active_network())
            .map(|client| client.decimals())
            .unwrap_or(DEFAULT_TOKEN_DECIMALS);
        parse_amount(&self.amount_input.read().unwrap(), decimals)
    }

    fn pending_write(&self) -> Option<PendingWrite> {
        *self.pending.lock().unwrap()
    }

    /// Whether any conflicting work is in flight: a network switch, a
    /// submitted write, or a correctness-gating read.
    pub fn busy(&self) -> bool {
        self.switcher.switch_pending()
            || self.pending_write().is_some()
            || self.reader.gating_read_in_flight()
    }

    /// Current flow state, derived from the session, the pending write and
    /// the observed allowance.
    pub fn state(&self) -> FlowState {
        if !self.session.is_connected() {
            return FlowState::Disconnected;
        }
        if let Some(pending) = self.pending_write() {
            return match pending.tx {
                None => FlowState::Submitting,
                Some(_) => FlowState::AwaitingConfirmation,
            };
        }
        if self.mode() == FlowMode::Deposit {
            let allowance = self.reader.store().allowance(self.session.active_network());
            if needs_approval(allowance, self.parsed_amount()) {
                return FlowState::NeedsApproval;
            }
        }
        FlowState::ReadyToAct
    }

    /// Label for the primary action button.
    pub fn primary_action_label(&self) -> &'static str {
        if !self.session.is_connected() {
            return "Connect wallet";
        }
        if self.busy() {
            return match self.pending_write().map(|p| p.kind) {
                Some(WriteKind::Approve) => "Approving…",
                _ => "Processing…",
            };
        }
        match self.state() {
            FlowState::NeedsApproval => self.policy.label(),
            _ => match self.mode() {
                FlowMode::Deposit => "Deposit",
                FlowMode::Redeem => "Withdraw",
            },
        }
    }

    /// Change the active network. Drops the cached fee quote and asks for
    /// an immediate re-read of the new network.
    pub async fn switch_network(&self, network: Network) -> Result<(), SwitchError> {
        self.switcher.switch_to(network).await?;
        self.quoter.invalidate();
        self.reader.request_refresh();
        Ok(())
    }

    /// Submit the primary action for the current mode.
    ///
    /// When a deposit is gated by an insufficient allowance, this submits
    /// the approval instead; the deposit is offered again once the
    /// refreshed allowance clears the gate. Exactly one write per call,
    /// never an approve-then-deposit chain.
    pub async fn submit_primary(&self) -> Result<TxHash, FlowError> {
        if self.switcher.switch_pending() {
            return Err(FlowError::SwitchPending);
        }
        if self.reader.gating_read_in_flight() {
            return Err(FlowError::Busy);
        }
        let account = self.session.account().ok_or(FlowError::Disconnected)?;
        let network = self.session.active_network();
        let client = self
            .providers
            .client(network)
            .ok_or(ChainError::MissingRpc(network))?;
        if !client.has_vault() {
            return Err(FlowError::MissingVault);
        }
        let amount = self.parsed_amount().ok_or(FlowError::NoAmount)?;
        let mode = self.mode();

        let kind = if mode == FlowMode::Deposit
            && needs_approval(self.reader.store().allowance(network), Some(amount))
        {
            WriteKind::Approve
        } else {
            match mode {
                FlowMode::Deposit => WriteKind::Deposit,
                FlowMode::Redeem => WriteKind::Redeem,
            }
        };

        // Reserve the single in-flight slot before anything is awaited, so
        // a concurrent submit cannot dispatch while the fee quote resolves.
        {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_some() {
                return Err(FlowError::Busy);
            }
            *pending = Some(PendingWrite { kind, tx: None });
        }

        if kind == WriteKind::Approve {
            let approval = self.policy.approval_amount(amount);
            return self
                .run_write(&*client, kind, account, client.approve(approval))
                .await;
        }

        // Hard precondition: no resolved fee quote, no send.
        let quote = match self.quoter.latest(network) {
            Some(quote) => Some(quote),
            None => self.quoter.refresh(&*client).await.ok(),
        };
        let Some(quote) = quote else {
            *self.pending.lock().unwrap() = None;
            return Err(FlowError::NoFeeQuote);
        };

        match kind {
            WriteKind::Redeem => {
                self.run_write(
                    &*client,
                    kind,
                    account,
                    client.redeem(amount, account, account, quote.native_fee),
                )
                .await
            }
            _ => {
                self.run_write(
                    &*client,
                    kind,
                    account,
                    client.deposit(amount, account, quote.native_fee),
                )
                .await
            }
        }
    }

    /// Drive one write through submission and confirmation. The pending
    /// slot must already be reserved by the caller. A rejection or revert
    /// clears the pending marker and surfaces the error; nothing is
    /// retried. A confirmed write invalidates the observed allowance and
    /// forces a gating account refresh before returning.
    async fn run_write<F>(
        &self,
        client: &dyn VaultChainOps,
        kind: WriteKind,
        account: Address,
        submit: F,
    ) -> Result<TxHash, FlowError>
    where
        F: Future<Output = Result<TxHash, ChainError>>,
    {
        let network = client.network();

        let tx = match submit.await {
            Ok(tx) => tx,
            Err(e) => {
                *self.pending.lock().unwrap() = None;
                tracing::warn!(network = %network, kind = ?kind, error = %e, "write rejected");
                return Err(e.into());
            }
        };
        *self.pending.lock().unwrap() = Some(PendingWrite { kind, tx: Some(tx) });

        let confirmed = client.confirm(tx).await;
        *self.pending.lock().unwrap() = None;
        if let Err(e) = confirmed {
            tracing::warn!(network = %network, tx = %tx, error = %e, "write did not confirm");
            return Err(e.into());
        }

        tracing::info!(network = %network, kind = ?kind, tx = %tx, "write confirmed");
        if matches!(kind, WriteKind::Approve | WriteKind::Deposit) {
            self.reader.store().mark_allowance_stale(network);
        }
        self.reader.refresh_account(network, account).await;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChainOps;
    use crate::chain::RawAccountState;
    use crate::config::PollingConfig;
    use crate::quote::FeeQuote;
    use alloy::signers::local::PrivateKeySigner;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        flow: FlowController,
        mock: Arc<MockChainOps>,
        reader: Arc<MultiChainReader>,
        session: Arc<WalletSession>,
    }

    fn harness(mock: MockChainOps, connected: bool) -> Harness {
        harness_with_policy(mock, connected, ApprovalPolicy::Exact)
    }

    fn harness_with_policy(
        mock: MockChainOps,
        connected: bool,
        policy: ApprovalPolicy,
    ) -> Harness {
        let mock = Arc::new(mock);
        let providers = Arc::new(ProviderCache::from_clients(vec![mock.clone() as _]));
        let reader = Arc::new(MultiChainReader::new(
            providers.clone(),
            PollingConfig::default(),
        ));
        let session = Arc::new(if connected {
            WalletSession::connected(PrivateKeySigner::random())
        } else {
            WalletSession::disconnected()
        });
        let switcher = Arc::new(ChainSwitchCoordinator::new(
            session.clone(),
            providers.clone(),
        ));
        let flow = FlowController::new(
            providers,
            reader.clone(),
            session.clone(),
            switcher,
            FeeQuoter::new(Duration::from_secs(15)),
            policy,
        );
        Harness {
            flow,
            mock,
            reader,
            session,
        }
    }

    fn account_with_allowance(allowance: u64) -> RawAccountState {
        RawAccountState {
            token_balance: Some(U256::from(1_000_000_000u64)),
            allowance: Some(U256::from(allowance)),
            share_balance: Some(U256::from(500_000_000u64)),
        }
    }

    fn quoted_mock(allowance: u64) -> MockChainOps {
        MockChainOps::new(Network::Polygon)
            .with_account(account_with_allowance(allowance))
            .with_quote(FeeQuote {
                native_fee: U256::from(777u64),
            })
    }

    async fn seed_account(h: &Harness) {
        h.reader.poll_account(h.session.account()).await;
    }

    #[tokio::test]
    async fn disconnected_flow_offers_connect_only() {
        let h = harness(quoted_mock(0), false);
        assert_eq!(h.flow.state(), FlowState::Disconnected);
        assert_eq!(h.flow.primary_action_label(), "Connect wallet");

        h.flow.set_amount("10");
        assert!(matches!(
            h.flow.submit_primary().await,
            Err(FlowError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn insufficient_allowance_gates_deposit_behind_approval() {
        let h = harness(quoted_mock(5_000_000), true);
        seed_account(&h).await;
        h.flow.set_amount("10"); // 10_000_000 base units at 6 decimals

        assert_eq!(h.flow.state(), FlowState::NeedsApproval);
        assert_eq!(h.flow.primary_action_label(), "Approve");

        // One press submits the approval only, never a chained deposit.
        h.flow.submit_primary().await.unwrap();
        assert_eq!(
            h.mock.approvals.lock().unwrap().as_slice(),
            &[U256::from(10_000_000u64)]
        );
        assert!(h.mock.deposits.lock().unwrap().is_empty());

        // The gating refresh re-read the account; with the mock's allowance
        // unchanged the gate still holds.
        assert!(h.mock.account_reads.load(Ordering::SeqCst) >= 2);
        assert_eq!(h.flow.state(), FlowState::NeedsApproval);
    }

    #[tokio::test]
    async fn sufficient_allowance_deposits_with_the_quoted_fee() {
        let h = harness(quoted_mock(50_000_000), true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        assert_eq!(h.flow.state(), FlowState::ReadyToAct);
        assert_eq!(h.flow.primary_action_label(), "Deposit");

        h.flow.submit_primary().await.unwrap();
        let deposits = h.mock.deposits.lock().unwrap();
        assert_eq!(deposits.len(), 1);
        let (amount, receiver, fee) = deposits[0];
        assert_eq!(amount, U256::from(10_000_000u64));
        assert_eq!(receiver, h.session.account().unwrap());
        assert_eq!(fee, U256::from(777u64));
    }

    #[tokio::test]
    async fn approval_clears_after_allowance_refresh_observes_the_grant() {
        let h = harness(quoted_mock(0), true);
        seed_account(&h).await;
        h.flow.set_amount("10");
        assert_eq!(h.flow.state(), FlowState::NeedsApproval);

        // The chain reflects the grant before the gating refresh lands.
        h.mock.set_account_state(account_with_allowance(10_000_000));
        h.flow.submit_primary().await.unwrap();

        assert_eq!(h.flow.state(), FlowState::ReadyToAct);
        assert_eq!(h.flow.primary_action_label(), "Deposit");
    }

    #[tokio::test]
    async fn unlimited_policy_approves_max_and_says_so() {
        let h = harness_with_policy(quoted_mock(0), true, ApprovalPolicy::Unlimited);
        seed_account(&h).await;
        h.flow.set_amount("10");

        assert_eq!(h.flow.primary_action_label(), "Approve unlimited");
        h.flow.submit_primary().await.unwrap();
        assert_eq!(h.mock.approvals.lock().unwrap().as_slice(), &[U256::MAX]);
    }

    #[tokio::test]
    async fn empty_or_invalid_amount_never_needs_approval_but_blocks_submit() {
        let h = harness(quoted_mock(0), true);
        seed_account(&h).await;

        for input in ["", "abc", "0", "-5"] {
            h.flow.set_amount(input);
            assert_eq!(h.flow.state(), FlowState::ReadyToAct, "input {input:?}");
            assert!(matches!(
                h.flow.submit_primary().await,
                Err(FlowError::NoAmount)
            ));
        }
        assert!(h.mock.approvals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deposit_is_hard_blocked_without_a_fee_quote() {
        let mock = MockChainOps::new(Network::Polygon).with_account(account_with_allowance(50_000_000));
        let h = harness(mock, true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        assert!(matches!(
            h.flow.submit_primary().await,
            Err(FlowError::NoFeeQuote)
        ));
        assert!(h.mock.deposits.lock().unwrap().is_empty());
        assert!(!h.flow.busy());
    }

    #[tokio::test]
    async fn withdraw_never_consults_the_allowance() {
        let h = harness(quoted_mock(0), true);
        seed_account(&h).await;
        h.flow.set_mode(FlowMode::Redeem);
        h.flow.set_amount("10");

        assert_eq!(h.flow.state(), FlowState::ReadyToAct);
        assert_eq!(h.flow.primary_action_label(), "Withdraw");

        h.flow.submit_primary().await.unwrap();
        let redeems = h.mock.redeems.lock().unwrap();
        assert_eq!(redeems.len(), 1);
        let (shares, owner, receiver, fee) = redeems[0];
        assert_eq!(shares, U256::from(10_000_000u64));
        assert_eq!(owner, h.session.account().unwrap());
        assert_eq!(receiver, owner);
        assert_eq!(fee, U256::from(777u64));
        assert!(h.mock.approvals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_write_returns_the_flow_to_ready_without_retry() {
        let h = harness(quoted_mock(50_000_000).failing_writes(), true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        let err = h.flow.submit_primary().await.unwrap_err();
        assert!(matches!(err, FlowError::Chain(ChainError::WriteFailed { .. })));
        assert!(!h.flow.busy());
        assert_eq!(h.flow.state(), FlowState::ReadyToAct);
        assert!(h.mock.deposits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reverted_confirmation_clears_the_pending_write() {
        let h = harness(quoted_mock(50_000_000).reverting_confirm(), true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        let err = h.flow.submit_primary().await.unwrap_err();
        assert!(matches!(err, FlowError::Chain(ChainError::WriteFailed { .. })));
        assert!(!h.flow.busy());
    }

    #[tokio::test]
    async fn vaultless_network_disables_writes() {
        let h = harness(quoted_mock(50_000_000).without_vault(), true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        assert!(matches!(
            h.flow.submit_primary().await,
            Err(FlowError::MissingVault)
        ));
    }

    #[tokio::test]
    async fn quote_fetch_holds_the_flow_busy_against_concurrent_submits() {
        let mock = quoted_mock(50_000_000).with_call_delay(Duration::from_millis(50));
        let h = harness(mock, true);
        seed_account(&h).await;
        h.flow.set_amount("10");

        let first = h.flow.submit_primary();
        let second = async {
            // Land mid-fetch, before the first submit has a quote.
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(h.flow.busy());
            assert_eq!(h.flow.state(), FlowState::Submitting);
            h.flow.submit_primary().await
        };
        let (first, second) = tokio::join!(first, second);

        first.unwrap();
        assert!(matches!(second, Err(FlowError::Busy)));
        assert_eq!(h.mock.deposits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gating_read_in_flight_reports_busy() {
        let mock = quoted_mock(50_000_000).with_call_delay(Duration::from_millis(50));
        let h = harness(mock, true);
        let account = h.session.account().unwrap();
        h.flow.set_amount("10");

        let refresh = {
            let reader = h.reader.clone();
            tokio::spawn(async move { reader.refresh_account(Network::Polygon, account).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.flow.busy());
        assert_eq!(h.flow.primary_action_label(), "Processing…");
        assert!(matches!(h.flow.submit_primary().await, Err(FlowError::Busy)));
        refresh.await.unwrap();
        assert!(!h.flow.busy());
    }

    #[tokio::test]
    async fn switching_networks_drops_the_fee_quote() {
        let polygon = Arc::new(quoted_mock(50_000_000));
        let arbitrum = Arc::new(
            MockChainOps::new(Network::Arbitrum)
                .with_account(account_with_allowance(50_000_000))
                .with_quote(FeeQuote {
                    native_fee: U256::from(999u64),
                }),
        );
        let providers = Arc::new(ProviderCache::from_clients(vec![
            polygon.clone() as _,
            arbitrum.clone() as _,
        ]));
        let reader = Arc::new(MultiChainReader::new(
            providers.clone(),
            PollingConfig::default(),
        ));
        let session = Arc::new(WalletSession::connected(PrivateKeySigner::random()));
        let switcher = Arc::new(ChainSwitchCoordinator::new(
            session.clone(),
            providers.clone(),
        ));
        let flow = FlowController::new(
            providers,
            reader.clone(),
            session.clone(),
            switcher,
            FeeQuoter::new(Duration::from_secs(15)),
            ApprovalPolicy::Exact,
        );
        reader.poll_account(session.account()).await;
        flow.set_amount("10");

        // Deposit on Polygon caches its quote; the switch must not let it
        // leak into Arbitrum's deposit.
        flow.submit_primary().await.unwrap();
        flow.switch_network(Network::Arbitrum).await.unwrap();
        reader.poll_account(session.account()).await;
        flow.submit_primary().await.unwrap();

        assert_eq!(polygon.deposits.lock().unwrap()[0].2, U256::from(777u64));
        assert_eq!(arbitrum.deposits.lock().unwrap()[0].2, U256::from(999u64));
    }

    #[tokio::test]
    async fn wallet_driven_chain_change_never_reuses_the_previous_quote() {
        let polygon = Arc::new(quoted_mock(50_000_000));
        let avalanche = Arc::new(
            MockChainOps::new(Network::Avalanche)
                .with_account(account_with_allowance(50_000_000))
                .with_quote(FeeQuote {
                    native_fee: U256::from(555u64),
                }),
        );
        let providers = Arc::new(ProviderCache::from_clients(vec![
            polygon.clone() as _,
            avalanche.clone() as _,
        ]));
        let reader = Arc::new(MultiChainReader::new(
            providers.clone(),
            PollingConfig::default(),
        ));
        let session = Arc::new(WalletSession::connected(PrivateKeySigner::random()));
        let switcher = Arc::new(ChainSwitchCoordinator::new(
            session.clone(),
            providers.clone(),
        ));
        let flow = FlowController::new(
            providers,
            reader.clone(),
            session.clone(),
            switcher,
            FeeQuoter::new(Duration::from_secs(15)),
            ApprovalPolicy::Exact,
        );
        reader.poll_account(session.account()).await;
        flow.set_amount("10");
        flow.submit_primary().await.unwrap();

        // The wallet reports a new chain directly; no coordinator involved,
        // so nothing invalidated the quoter. The Polygon quote is still
        // within its age window but must not accompany the Avalanche write.
        session.set_active_chain(43114);
        reader.poll_account(session.account()).await;
        flow.submit_primary().await.unwrap();

        assert_eq!(polygon.deposits.lock().unwrap()[0].2, U256::from(777u64));
        assert_eq!(avalanche.deposits.lock().unwrap()[0].2, U256::from(555u64));
    }
}
