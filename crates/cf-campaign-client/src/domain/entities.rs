//! # Domain Entities
//!
//! Ledger-owned records as observed by the client. Nothing here is mutated in
//! place: a refresh builds a new [`CampaignSnapshot`] and swaps it in whole.

use super::value_objects::{
    ActionKey, ActionPhase, Address, Amount, CampaignId, Settlement, Timestamp, TxHash,
};
use serde::{Deserialize, Serialize};

/// Campaign as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Ledger-assigned ordinal.
    pub id: CampaignId,
    /// Account that created the campaign.
    pub creator: Address,
    /// Free-text title.
    pub title: String,
    /// Funding goal in the smallest denomination.
    pub goal: Amount,
    /// Absolute deadline (Unix seconds).
    pub deadline: Timestamp,
    /// Amount raised so far.
    pub raised: Amount,
    /// One-way flag set by finalize.
    pub finalized: bool,
    /// Goal reached. Only meaningful once `finalized` is set.
    pub successful: bool,
}

impl Campaign {
    /// Create an unfinalized campaign with nothing raised.
    pub fn new(
        id: CampaignId,
        creator: Address,
        title: impl Into<String>,
        goal: Amount,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            creator,
            title: title.into(),
            goal,
            deadline,
            raised: Amount::zero(),
            finalized: false,
            successful: false,
        }
    }

    /// Whether the raised amount meets the goal.
    pub fn goal_reached(&self) -> bool {
        self.raised >= self.goal
    }
}

/// One campaign together with the caller's contribution to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignEntry {
    /// Campaign record.
    pub campaign: Campaign,
    /// Contribution of the snapshot's identity.
    pub contribution: Amount,
}

/// Immutable, complete view of the ledger built by one refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    /// Identity the contributions were read for.
    pub identity: Option<Address>,
    /// Entries ordered by campaign index.
    pub entries: Vec<CampaignEntry>,
    /// Refresh ticket that produced this snapshot (0 = never refreshed).
    pub generation: u64,
    /// Client wall-clock time the refresh started.
    pub fetched_at: Timestamp,
}

impl CampaignSnapshot {
    /// Snapshot installed before the first refresh.
    pub fn empty() -> Self {
        Self {
            identity: None,
            entries: Vec::new(),
            generation: 0,
            fetched_at: 0,
        }
    }

    /// Look up an entry by campaign index.
    ///
    /// Indices are dense, so the entry for `id` sits at position `id`.
    pub fn get(&self, id: CampaignId) -> Option<&CampaignEntry> {
        usize::try_from(id.index())
            .ok()
            .and_then(|pos| self.entries.get(pos))
            .filter(|entry| entry.campaign.id == id)
    }

    /// Number of campaigns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the ledger reported no campaigns (or nothing was fetched).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &CampaignEntry> {
        self.entries.iter()
    }

    /// Build a successor snapshot with one entry re-fetched.
    ///
    /// Returns `None` when the entry's index is not part of this snapshot.
    pub fn with_entry(
        &self,
        entry: CampaignEntry,
        generation: u64,
        fetched_at: Timestamp,
    ) -> Option<Self> {
        let pos = usize::try_from(entry.campaign.id.index()).ok()?;
        if pos >= self.entries.len() {
            return None;
        }
        let mut entries = self.entries.clone();
        entries[pos] = entry;
        Some(Self {
            identity: self.identity,
            entries,
            generation,
            fetched_at,
        })
    }
}

impl Default for CampaignSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of `connect()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connected account.
    pub identity: Address,
    /// Chain id reported by the provider.
    pub network_id: u64,
    /// Chain id the client was configured for.
    pub expected_network_id: u64,
    /// Whether the two match.
    pub on_expected_network: bool,
}

/// ERC-20 balance with display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
    /// Balance in base units.
    pub amount: Amount,
}

/// Balances of the connected identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Account the balances belong to.
    pub identity: Address,
    /// Native currency balance.
    pub native: Amount,
    /// Configured token, if any.
    pub token: Option<TokenBalance>,
}

/// Successful end of an orchestrated action.
///
/// The write settled. `refresh_error` is set when the follow-up refresh
/// failed, in which case the cached snapshot predates the write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Action that settled.
    pub key: ActionKey,
    /// Settlement reported by the gateway.
    pub settlement: Settlement,
    /// Error text of a failed follow-up refresh.
    pub refresh_error: Option<String>,
}

impl ActionOutcome {
    /// True when the snapshot reflects the write.
    pub fn is_fresh(&self) -> bool {
        self.refresh_error.is_none()
    }
}

/// Phase transition published by the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Action the event belongs to.
    pub key: ActionKey,
    /// Phase entered.
    pub phase: ActionPhase,
    /// Transaction, once submitted.
    pub tx_hash: Option<TxHash>,
    /// Failure text for `Failed`.
    pub error: Option<String>,
}
