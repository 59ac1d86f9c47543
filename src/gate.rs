//! Allowance gating for deposits.
//!
//! A pure function of the currently observed allowance and the parsed
//! amount; it never triggers a re-fetch itself. The approval policy is an
//! explicit configuration decision: exact approvals limit authorization to
//! the current transaction, unbounded approvals amortize future ones but
//! grant standing authorization and are labelled accordingly.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Whether an approval step must precede the deposit.
///
/// Absent amounts never require approval: there is nothing to act on, so
/// the answer is `false`, not "unknown".
pub fn needs_approval(allowance: U256, parsed_amount: Option<U256>) -> bool {
    match parsed_amount {
        None => false,
        Some(amount) => allowance < amount,
    }
}

/// How much allowance an approval transaction requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPolicy {
    /// Approve exactly the parsed amount.
    #[default]
    Exact,
    /// Approve the maximum representable amount.
    Unlimited,
}

impl ApprovalPolicy {
    /// The allowance value an approval submits for the given amount.
    pub fn approval_amount(&self, parsed_amount: U256) -> U256 {
        match self {
            ApprovalPolicy::Exact => parsed_amount,
            ApprovalPolicy::Unlimited => U256::MAX,
        }
    }

    /// User-facing label for the approval action. The unbounded grant must
    /// be visible to the user.
    pub fn label(&self) -> &'static str {
        match self {
            ApprovalPolicy::Exact => "Approve",
            ApprovalPolicy::Unlimited => "Approve unlimited",
        }
    }
}
