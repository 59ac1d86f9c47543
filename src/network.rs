//! Supported networks and known token deployments.
//!
//! The vault operates identically on every network listed here; the
//! registry is consulted by the reader for fan-out and by the flow
//! controller for address resolution. Networks outside this set are not
//! representable through the client.

use crate::config::DEFAULT_TOKEN_DECIMALS;
use alloy::primitives::{address, Address};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Supported blockchain networks.
///
/// One variant per network the vault is deployed on. Each has a canonical
/// EIP-155 chain ID accessible via [`Network::chain_id()`].
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Polygon mainnet (chain ID 137).
    #[serde(rename = "polygon")]
    Polygon,
    /// Optimism mainnet (chain ID 10).
    #[serde(rename = "optimism")]
    Optimism,
    /// Arbitrum One (chain ID 42161).
    #[serde(rename = "arbitrum")]
    Arbitrum,
    /// Avalanche C-Chain (chain ID 43114).
    #[serde(rename = "avalanche")]
    Avalanche,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Polygon => write!(f, "polygon"),
            Network::Optimism => write!(f, "optimism"),
            Network::Arbitrum => write!(f, "arbitrum"),
            Network::Avalanche => write!(f, "avalanche"),
        }
    }
}

impl Network {
    /// The network selected when the wallet's chain is not in the registry.
    pub const DEFAULT: Network = Network::Polygon;

    /// Return all supported [`Network`] variants, in display order.
    pub fn variants() -> &'static [Network] {
        &[
            Network::Polygon,
            Network::Optimism,
            Network::Arbitrum,
            Network::Avalanche,
        ]
    }

    /// Returns the EIP-155 chain ID for this network.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Polygon => 137,
            Network::Optimism => 10,
            Network::Arbitrum => 42161,
            Network::Avalanche => 43114,
        }
    }

    /// Human-readable network name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Polygon => "Polygon",
            Network::Optimism => "Optimism",
            Network::Arbitrum => "Arbitrum",
            Network::Avalanche => "Avalanche",
        }
    }

    /// Icon reference for display layers.
    pub fn icon(&self) -> &'static str {
        match self {
            Network::Polygon => "icons/polygon.svg",
            Network::Optimism => "icons/optimism.svg",
            Network::Arbitrum => "icons/arbitrum.svg",
            Network::Avalanche => "icons/avalanche.svg",
        }
    }

    /// Attempts to resolve a Network from an EIP-155 chain ID.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            137 => Some(Network::Polygon),
            10 => Some(Network::Optimism),
            42161 => Some(Network::Arbitrum),
            43114 => Some(Network::Avalanche),
            _ => None,
        }
    }
}

/// Error when resolving an unsupported chain ID.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown chain ID: {0}")]
pub struct UnknownChainIdError(pub u64);

impl TryFrom<u64> for Network {
    type Error = UnknownChainIdError;

    fn try_from(chain_id: u64) -> Result<Self, Self::Error> {
        Network::from_chain_id(chain_id).ok_or(UnknownChainIdError(chain_id))
    }
}

/// A deployment of the underlying token on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeployment {
    /// Contract address of the token on [`TokenDeployment::network`].
    pub address: Address,
    /// Network this deployment lives on.
    pub network: Network,
    /// Declared decimal precision, validated on-chain once per network.
    pub decimals: u8,
}

/// Native USDC on Polygon.
static USDC_POLYGON: Lazy<TokenDeployment> = Lazy::new(|| TokenDeployment {
    address: address!("0x3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
    network: Network::Polygon,
    decimals: DEFAULT_TOKEN_DECIMALS,
});

/// Native USDC on Optimism.
static USDC_OPTIMISM: Lazy<TokenDeployment> = Lazy::new(|| TokenDeployment {
    address: address!("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
    network: Network::Optimism,
    decimals: DEFAULT_TOKEN_DECIMALS,
});

/// Native USDC on Arbitrum One.
static USDC_ARBITRUM: Lazy<TokenDeployment> = Lazy::new(|| TokenDeployment {
    address: address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
    network: Network::Arbitrum,
    decimals: DEFAULT_TOKEN_DECIMALS,
});

/// Native USDC on the Avalanche C-Chain.
static USDC_AVALANCHE: Lazy<TokenDeployment> = Lazy::new(|| TokenDeployment {
    address: address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    network: Network::Avalanche,
    decimals: DEFAULT_TOKEN_DECIMALS,
});

/// Known deployment of the underlying token on the given network.
///
/// Returns `None` for networks without a deployment; callers degrade by
/// disabling token-gated actions rather than erroring.
pub fn usdc_deployment(network: Network) -> Option<&'static TokenDeployment> {
    match network {
        Network::Polygon => Some(&USDC_POLYGON),
        Network::Optimism => Some(&USDC_OPTIMISM),
        Network::Arbitrum => Some(&USDC_ARBITRUM),
        Network::Avalanche => Some(&USDC_AVALANCHE),
    }
}
