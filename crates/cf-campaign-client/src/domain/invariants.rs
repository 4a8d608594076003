//! # Domain Invariants
//!
//! Rules the ledger data must obey between two observations of the same
//! campaign. The client never repairs a violation; the repository logs it and
//! installs the ledger's answer as-is.

use super::entities::{Campaign, CampaignEntry};
use super::value_objects::Amount;

/// Sepolia chain id, the network the contract is deployed on by default.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Decimals of the native currency (wei per ETH = 10^18).
pub const NATIVE_DECIMALS: u8 = 18;

/// Invariant: `finalized` is one-way.
pub fn invariant_finalized_one_way(previous: &Campaign, next: &Campaign) -> Result<(), String> {
    if previous.finalized && !next.finalized {
        return Err(format!("campaign {} became un-finalized", next.id));
    }
    Ok(())
}

/// Invariant: raised never decreases before finalization.
pub fn invariant_raised_non_decreasing(
    previous: &Campaign,
    next: &Campaign,
) -> Result<(), String> {
    if !previous.finalized && next.raised < previous.raised {
        return Err(format!(
            "campaign {} raised dropped from {} to {}",
            next.id, previous.raised, next.raised
        ));
    }
    Ok(())
}

/// Invariant: a contribution only shrinks through a refund, which requires a
/// failed, finalized campaign, and then drops to zero.
pub fn invariant_contribution_monotonic(
    previous: &CampaignEntry,
    next: &CampaignEntry,
) -> Result<(), String> {
    if next.contribution >= previous.contribution {
        return Ok(());
    }
    let refunded = next.campaign.finalized
        && !next.campaign.successful
        && next.contribution == Amount::zero();
    if refunded {
        Ok(())
    } else {
        Err(format!(
            "contribution to campaign {} dropped from {} to {} without a refund",
            next.campaign.id, previous.contribution, next.contribution
        ))
    }
}

/// Run every pairwise invariant; returns the violations found.
pub fn check_entry_transition(previous: &CampaignEntry, next: &CampaignEntry) -> Vec<String> {
    [
        invariant_finalized_one_way(&previous.campaign, &next.campaign),
        invariant_raised_non_decreasing(&previous.campaign, &next.campaign),
        invariant_contribution_monotonic(previous, next),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}
