//! Headless multi-chain vault client.
//!
//! Startup:
//! - Loads `.env` variables.
//! - Initializes tracing.
//! - Loads configuration (TOML file plus env overrides).
//! - Connects to providers for every configured network.
//! - Runs the multi-chain reader until SIGTERM/SIGINT, periodically
//!   logging the aggregate vault view and the account's holdings.

use dotenvy::dotenv;
use omnivault_client::config::AppConfig;
use omnivault_client::flow::FlowController;
use omnivault_client::gate::ApprovalPolicy;
use omnivault_client::provider_cache::ProviderCache;
use omnivault_client::quote::FeeQuoter;
use omnivault_client::reader::MultiChainReader;
use omnivault_client::sig_down::SigDown;
use omnivault_client::switcher::ChainSwitchCoordinator;
use omnivault_client::telemetry::Telemetry;
use omnivault_client::wallet::WalletSession;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let _telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let app_config = match AppConfig::from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            tracing::info!("Using default configuration");
            AppConfig::default()
        }
    };
    if app_config.vault.address.is_none() {
        tracing::warn!("No vault address configured; write actions are disabled");
    }

    let session = Arc::new(WalletSession::from_env());
    match session.account() {
        Some(account) => tracing::info!(account = %account, "wallet connected"),
        None => tracing::info!("no wallet configured; starting disconnected"),
    }

    // Abort if we can't initialise chain providers early
    let providers = match ProviderCache::from_config(&app_config, session.wallet().cloned()).await {
        Ok(providers) => Arc::new(providers),
        Err(e) => {
            tracing::error!("Failed to create chain providers: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(networks = ?providers.networks(), "chain providers ready");

    let reader = Arc::new(MultiChainReader::new(
        providers.clone(),
        app_config.polling.clone(),
    ));
    let switcher = Arc::new(ChainSwitchCoordinator::new(
        session.clone(),
        providers.clone(),
    ));
    let policy: ApprovalPolicy = app_config.vault.approval_policy;
    let flow = FlowController::new(
        providers.clone(),
        reader.clone(),
        session.clone(),
        switcher,
        FeeQuoter::new(app_config.polling.quote_max_age()),
        policy,
    );

    let sig_down = SigDown::try_new()?;

    let reader_cancellation_token = sig_down.cancellation_token();
    tokio::spawn({
        let reader = reader.clone();
        let session = session.clone();
        async move { reader.run(session, reader_cancellation_token).await }
    });

    let view_cancellation_token = sig_down.cancellation_token();
    let mut view_interval = tokio::time::interval(app_config.polling.stats_poll());
    loop {
        tokio::select! {
            _ = view_interval.tick() => {
                for stats in reader.store().stats_by_chain() {
                    tracing::info!(
                        network = %stats.network,
                        local_shares = %stats.local_shares,
                        local_assets = %stats.local_assets,
                        "vault stats"
                    );
                }
                for holding in reader.store().share_holdings() {
                    tracing::info!(network = %holding.network, shares = %holding.shares, "share holding");
                }
                tracing::debug!(
                    state = ?flow.state(),
                    label = flow.primary_action_label(),
                    busy = flow.busy(),
                    "flow status"
                );
            }
            _ = view_cancellation_token.cancelled() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
