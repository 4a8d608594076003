//! # Domain Value Objects
//!
//! Immutable value types: campaign ordinals, phases, action keys and the
//! handles returned by the write surface.

use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identity on the ledger (20-byte address).
pub type Address = H160;

/// Transaction hash returned by the write surface.
pub type TxHash = H256;

/// Amount in the smallest denomination (wei for ETH).
pub type Amount = U256;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Ordinal index assigned by the ledger at creation time (dense, zero-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignId(pub u64);

impl CampaignId {
    /// Raw ordinal.
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for CampaignId {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

/// Derived lifecycle stage of a campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting contributions.
    Active,
    /// Deadline passed, not yet finalized.
    AwaitingFinalization,
    /// Finalized and goal reached.
    FinalizedSuccessful,
    /// Finalized and goal missed; contributors may claim refunds.
    FinalizedFailed,
}

impl Phase {
    /// Whether the campaign has been finalized on the ledger.
    pub fn is_finalized(self) -> bool {
        matches!(self, Phase::FinalizedSuccessful | Phase::FinalizedFailed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Active => "active",
            Phase::AwaitingFinalization => "awaiting finalization",
            Phase::FinalizedSuccessful => "finalized (successful)",
            Phase::FinalizedFailed => "finalized (failed)",
        };
        f.write_str(label)
    }
}

/// Kind of state-changing action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Send funds to an active campaign.
    Contribute,
    /// Close a campaign whose deadline has passed.
    Finalize,
    /// Withdraw a contribution from a failed campaign.
    ClaimRefund,
    /// Create a new campaign.
    CreateCampaign,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Contribute => "contribute",
            ActionKind::Finalize => "finalize",
            ActionKind::ClaimRefund => "claim-refund",
            ActionKind::CreateCampaign => "create-campaign",
        };
        f.write_str(label)
    }
}

/// What an action is keyed on: an existing campaign, or the synthetic
/// creation slot (no index exists before the ledger assigns one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionSlot {
    /// Existing campaign.
    Campaign(CampaignId),
    /// Campaign creation.
    Creation,
}

impl fmt::Display for ActionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSlot::Campaign(id) => write!(f, "campaign {}", id),
            ActionSlot::Creation => f.write_str("creation"),
        }
    }
}

/// ActionLock key: at most one in-flight action per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    /// Target slot.
    pub slot: ActionSlot,
    /// Action kind.
    pub kind: ActionKind,
}

impl ActionKey {
    /// Key for an action on an existing campaign.
    pub fn campaign(id: CampaignId, kind: ActionKind) -> Self {
        Self {
            slot: ActionSlot::Campaign(id),
            kind,
        }
    }

    /// Key for campaign creation.
    pub fn creation() -> Self {
        Self {
            slot: ActionSlot::Creation,
            kind: ActionKind::CreateCampaign,
        }
    }

    /// Campaign targeted by this key, if any.
    pub fn campaign_id(&self) -> Option<CampaignId> {
        match self.slot {
            ActionSlot::Campaign(id) => Some(id),
            ActionSlot::Creation => None,
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.kind, self.slot)
    }
}

/// Orchestrator state for one action key.
///
/// ```text
/// Idle -> Submitting -> AwaitingSettlement -> (Succeeded | Failed) -> Idle
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPhase {
    /// No action in flight.
    Idle,
    /// Validating inputs and handing the write to the gateway.
    Submitting,
    /// Accepted by the gateway, waiting for confirmation. Not cancellable.
    AwaitingSettlement,
    /// Settled; repository refreshed.
    Succeeded,
    /// Validation, submission or settlement failed.
    Failed,
}

impl ActionPhase {
    /// Terminal phases release the lock.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionPhase::Succeeded | ActionPhase::Failed)
    }
}

/// Set of actions the lifecycle table allows right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermittedActions {
    /// Contribute allowed.
    pub contribute: bool,
    /// Finalize allowed.
    pub finalize: bool,
    /// Claim refund allowed.
    pub claim_refund: bool,
}

impl PermittedActions {
    /// Nothing permitted.
    pub const NONE: PermittedActions = PermittedActions {
        contribute: false,
        finalize: false,
        claim_refund: false,
    };

    /// Whether `kind` is in the set. Creation is never campaign-scoped.
    pub fn allows(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Contribute => self.contribute,
            ActionKind::Finalize => self.finalize,
            ActionKind::ClaimRefund => self.claim_refund,
            ActionKind::CreateCampaign => false,
        }
    }

    /// Permitted kinds, in table order.
    pub fn kinds(&self) -> Vec<ActionKind> {
        [
            ActionKind::Contribute,
            ActionKind::Finalize,
            ActionKind::ClaimRefund,
        ]
        .into_iter()
        .filter(|k| self.allows(*k))
        .collect()
    }

    /// True when no action is permitted.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Handle for a write accepted by the gateway but not yet settled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWrite {
    /// Ledger transaction hash.
    pub tx_hash: TxHash,
    /// Action that produced it.
    pub kind: ActionKind,
}

/// Confirmation of a settled write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Ledger transaction hash.
    pub tx_hash: TxHash,
    /// Block that included the write, when the gateway reports it.
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_key_display() {
        let key = ActionKey::campaign(CampaignId(3), ActionKind::Contribute);
        assert_eq!(key.to_string(), "contribute on campaign #3");
        assert_eq!(ActionKey::creation().to_string(), "create-campaign on creation");
    }

    #[test]
    fn test_action_key_distinguishes_kind() {
        let a = ActionKey::campaign(CampaignId(1), ActionKind::Contribute);
        let b = ActionKey::campaign(CampaignId(1), ActionKind::Finalize);
        assert_ne!(a, b);
        assert_eq!(a.campaign_id(), Some(CampaignId(1)));
        assert_eq!(ActionKey::creation().campaign_id(), None);
    }

    #[test]
    fn test_permitted_actions_kinds() {
        let permitted = PermittedActions {
            finalize: true,
            ..PermittedActions::NONE
        };
        assert_eq!(permitted.kinds(), vec![ActionKind::Finalize]);
        assert!(!permitted.allows(ActionKind::CreateCampaign));
        assert!(PermittedActions::default().is_empty());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(ActionPhase::Succeeded.is_terminal());
        assert!(ActionPhase::Failed.is_terminal());
        assert!(!ActionPhase::AwaitingSettlement.is_terminal());
    }
}
