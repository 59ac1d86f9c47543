//! Cross-network messaging fee quotes.
//!
//! Deposits and redeems carry a native-currency fee for the vault's
//! cross-network messaging. The quote is keyed by the fixed options
//! payload and scoped to the network it was taken on; a quote from one
//! network never accompanies a write on another, however the active
//! network changed. It is re-queried on demand rather than cached
//! indefinitely. Until a quote resolves there is no quote — the write
//! action is hard-blocked, not defaulted to zero.

use crate::chain::{ChainError, VaultChainOps};
use crate::network::Network;
use alloy::primitives::U256;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Native-currency fee for one cross-network vault operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub native_fee: U256,
}

/// Obtains and ages fee quotes.
pub struct FeeQuoter {
    max_age: Duration,
    cache: Mutex<Option<(Network, FeeQuote, Instant)>>,
}

impl FeeQuoter {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            cache: Mutex::new(None),
        }
    }

    /// The latest usable quote for `network`, or `None` when absent, taken
    /// on a different network, or older than the polling window.
    pub fn latest(&self, network: Network) -> Option<FeeQuote> {
        let cache = self.cache.lock().unwrap();
        match *cache {
            Some((quoted_on, quote, taken_at))
                if quoted_on == network && taken_at.elapsed() < self.max_age =>
            {
                Some(quote)
            }
            _ => None,
        }
    }

    /// Re-query the fee against the given network's vault.
    pub async fn refresh(&self, ops: &dyn VaultChainOps) -> Result<FeeQuote, ChainError> {
        let quote = ops.quote_deposit().await?;
        tracing::debug!(network = %ops.network(), native_fee = %quote.native_fee, "fee quote refreshed");
        *self.cache.lock().unwrap() = Some((ops.network(), quote, Instant::now()));
        Ok(quote)
    }

    /// Drop the cached quote, e.g. after a network switch.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }
}
