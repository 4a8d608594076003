//! # Inbound Ports
//!
//! API trait defining what the campaign client offers a presentation adapter.

use crate::application::CampaignView;
use crate::domain::{
    ActionEvent, ActionKey, ActionOutcome, ActionPhase, Balances, CampaignClientError,
    CampaignId, CampaignSnapshot, ConnectionInfo,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Campaign client API - inbound port.
///
/// Amount, title and duration arguments are the raw strings the user typed;
/// they are validated here, never upstream.
#[async_trait]
pub trait CampaignClientApi: Send + Sync {
    /// Query identity and network. A network mismatch is reported, not raised.
    async fn connect(&self) -> Result<ConnectionInfo, CampaignClientError>;

    /// Rebuild the campaign snapshot from the ledger.
    async fn refresh(&self) -> Result<Arc<CampaignSnapshot>, CampaignClientError>;

    /// Current snapshot.
    fn snapshot(&self) -> Arc<CampaignSnapshot>;

    /// Per-campaign view models for the current snapshot at the current time.
    fn views(&self) -> Vec<CampaignView>;

    /// Contribute `amount` (decimal ETH) to `id`.
    async fn contribute(
        &self,
        id: CampaignId,
        amount: &str,
    ) -> Result<ActionOutcome, CampaignClientError>;

    /// Finalize `id` once its deadline has passed.
    async fn finalize(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError>;

    /// Reclaim the caller's contribution to a failed campaign.
    async fn claim_refund(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError>;

    /// Create a campaign. `goal` is decimal ETH, `duration_minutes` may be
    /// fractional.
    async fn create_campaign(
        &self,
        title: &str,
        goal: &str,
        duration_minutes: &str,
    ) -> Result<ActionOutcome, CampaignClientError>;

    /// Balances of the connected identity.
    async fn balances(&self) -> Result<Balances, CampaignClientError>;

    /// Phase of an action key (`Idle` when nothing is in flight).
    fn action_phase(&self, key: ActionKey) -> ActionPhase;

    /// Subscribe to action phase transitions.
    fn subscribe(&self) -> broadcast::Receiver<ActionEvent>;
}
