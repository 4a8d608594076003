//! # Campaign View Models
//!
//! Per-campaign objects handed to the presentation layer, addressed by
//! campaign index. Built from a snapshot and one wall-clock reading so every
//! view in a render agrees on the time.

use crate::algorithms::{permitted_in_phase, phase_of, time_left};
use crate::domain::{
    Address, Amount, CampaignEntry, CampaignId, CampaignSnapshot, Phase, PermittedActions,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// Render-ready campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignView {
    /// Campaign index.
    pub id: CampaignId,
    /// Title.
    pub title: String,
    /// Creator.
    pub creator: Address,
    /// Goal in base units.
    pub goal: Amount,
    /// Raised so far in base units.
    pub raised: Amount,
    /// Deadline (Unix seconds).
    pub deadline: Timestamp,
    /// Seconds until the deadline, zero once passed.
    pub time_left: u64,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Actions the connected identity may take.
    pub permitted: PermittedActions,
    /// Contribution of the connected identity.
    pub contribution: Amount,
    /// Whether the connected identity created the campaign.
    pub is_creator: bool,
}

impl CampaignView {
    /// Build the view for one snapshot entry.
    pub fn from_entry(entry: &CampaignEntry, identity: Option<Address>, now: Timestamp) -> Self {
        let campaign = &entry.campaign;
        let phase = phase_of(campaign, now);
        Self {
            id: campaign.id,
            title: campaign.title.clone(),
            creator: campaign.creator,
            goal: campaign.goal,
            raised: campaign.raised,
            deadline: campaign.deadline,
            time_left: time_left(campaign, now),
            phase,
            permitted: permitted_in_phase(phase, entry.contribution),
            contribution: entry.contribution,
            is_creator: identity == Some(campaign.creator),
        }
    }

    /// Raised amount as a percentage of the goal, capped at 100.
    pub fn progress_percent(&self) -> u8 {
        if self.goal.is_zero() {
            return 100;
        }
        let percent = self.raised.saturating_mul(Amount::from(100)) / self.goal;
        percent.min(Amount::from(100)).low_u32() as u8
    }
}

/// Views for every entry in `snapshot`, in index order.
pub fn build_views(snapshot: &CampaignSnapshot, now: Timestamp) -> Vec<CampaignView> {
    snapshot
        .iter()
        .map(|entry| CampaignView::from_entry(entry, snapshot.identity, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKind, Campaign};

    const NOW: Timestamp = 5_000;

    fn entry(index: u64, deadline: Timestamp, raised: u64, contribution: u64) -> CampaignEntry {
        let mut campaign = Campaign::new(
            CampaignId(index),
            Address::repeat_byte(0x01),
            "Library",
            Amount::from(10),
            deadline,
        );
        campaign.raised = Amount::from(raised);
        CampaignEntry {
            campaign,
            contribution: Amount::from(contribution),
        }
    }

    #[test]
    fn test_views_are_addressed_by_index() {
        let snapshot = CampaignSnapshot {
            identity: Some(Address::repeat_byte(0x01)),
            entries: vec![entry(0, NOW + 30, 0, 0), entry(1, NOW - 1, 5, 2)],
            generation: 1,
            fetched_at: NOW,
        };
        let views = build_views(&snapshot, NOW);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, CampaignId(0));
        assert_eq!(views[0].phase, Phase::Active);
        assert_eq!(views[0].time_left, 30);
        assert_eq!(views[1].phase, Phase::AwaitingFinalization);
        assert_eq!(views[1].permitted.kinds(), vec![ActionKind::Finalize]);
        assert_eq!(views[1].contribution, Amount::from(2));
        assert!(views[1].is_creator);
    }

    #[test]
    fn test_progress_percent() {
        let view = CampaignView::from_entry(&entry(0, NOW, 5, 0), None, NOW);
        assert_eq!(view.progress_percent(), 50);
        let over = CampaignView::from_entry(&entry(0, NOW, 25, 0), None, NOW);
        assert_eq!(over.progress_percent(), 100);
        assert!(!over.is_creator);
    }
}
