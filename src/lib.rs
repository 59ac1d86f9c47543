//! Client core for an omnichain share-based vault.
//!
//! The vault is replicated in address and behavior across several EVM
//! networks. This crate implements the part of the client with real state
//! and ordering concerns:
//!
//! - a multi-chain reader that polls every supported network in parallel
//!   and keeps per-network balances, allowances, and vault statistics in a
//!   sequence-guarded snapshot store,
//! - a fee quoter for the native-currency cost of cross-network vault
//!   operations,
//! - the transaction-flow controller that decides which on-chain action is
//!   currently valid (connect, approve, deposit, redeem), gates it behind
//!   the token-approval precondition, and tracks submission and receipt
//!   confirmation,
//! - a chain switch coordinator that blocks writes while the wallet is
//!   changing networks.
//!
//! Rendering and wallet-connection chrome are external collaborators; the
//! `omnivault` binary drives this library as a headless daemon.

pub mod amount;
pub mod chain;
pub mod config;
pub mod flow;
pub mod gate;
pub mod network;
pub mod provider_cache;
pub mod quote;
pub mod reader;
pub mod sig_down;
pub mod snapshot;
pub mod switcher;
pub mod telemetry;
pub mod wallet;
