//! # Campaign Client Service
//!
//! Application service wiring the repository, lifecycle engine and
//! orchestrator behind [`CampaignClientApi`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::orchestrator::ActionOrchestrator;
use super::repository::CampaignRepository;
use super::view_model::{build_views, CampaignView};
use crate::config::{CampaignClientConfig, ConfigError};
use crate::domain::{
    ActionEvent, ActionKey, ActionOutcome, ActionPhase, Balances, CampaignClientError,
    CampaignId, CampaignSnapshot, ConnectionInfo,
};
use crate::ports::{BalanceReader, CampaignClientApi, Clock, LedgerGateway};

/// Campaign client - the single entry point for a presentation adapter.
pub struct CampaignClient<G: LedgerGateway + BalanceReader + ?Sized> {
    /// Configuration.
    config: CampaignClientConfig,
    /// Ledger gateway.
    gateway: Arc<G>,
    /// Wall clock.
    clock: Arc<dyn Clock>,
    /// Snapshot cache.
    repository: Arc<CampaignRepository<G>>,
    /// Action state machine.
    orchestrator: ActionOrchestrator<G>,
}

impl<G: LedgerGateway + BalanceReader + ?Sized + 'static> CampaignClient<G> {
    /// Create a client. Validates the configuration.
    pub fn new(
        config: CampaignClientConfig,
        gateway: Arc<G>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let repository = Arc::new(CampaignRepository::new(
            Arc::clone(&gateway),
            Arc::clone(&clock),
        ));
        let orchestrator = ActionOrchestrator::new(
            Arc::clone(&gateway),
            Arc::clone(&repository),
            Arc::clone(&clock),
            config.refresh_strategy,
            config.native_decimals,
            config.event_channel_capacity,
        );

        Ok(Self {
            config,
            gateway,
            clock,
            repository,
            orchestrator,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &CampaignClientConfig {
        &self.config
    }

    /// Snapshot cache.
    pub fn repository(&self) -> &CampaignRepository<G> {
        &self.repository
    }

    /// Action state machine.
    pub fn orchestrator(&self) -> &ActionOrchestrator<G> {
        &self.orchestrator
    }

    /// View of a single campaign.
    pub fn view(&self, id: CampaignId) -> Option<CampaignView> {
        let snapshot = self.repository.snapshot();
        snapshot
            .get(id)
            .map(|entry| CampaignView::from_entry(entry, snapshot.identity, self.clock.now()))
    }
}

#[async_trait]
impl<G: LedgerGateway + BalanceReader + ?Sized + 'static> CampaignClientApi for CampaignClient<G> {
    async fn connect(&self) -> Result<ConnectionInfo, CampaignClientError> {
        let identity = self
            .gateway
            .current_identity()
            .await?
            .ok_or(CampaignClientError::NotConnected)?;
        let network_id = self.gateway.current_network_id().await?;

        let info = ConnectionInfo {
            identity,
            network_id,
            expected_network_id: self.config.expected_network_id,
            on_expected_network: network_id == self.config.expected_network_id,
        };

        if info.on_expected_network {
            info!(identity = ?identity, network_id, "Connected");
        } else {
            warn!(
                identity = ?identity,
                network_id,
                expected = self.config.expected_network_id,
                "Connected to an unexpected network"
            );
        }
        Ok(info)
    }

    async fn refresh(&self) -> Result<Arc<CampaignSnapshot>, CampaignClientError> {
        Ok(self.repository.refresh().await?)
    }

    fn snapshot(&self) -> Arc<CampaignSnapshot> {
        self.repository.snapshot()
    }

    fn views(&self) -> Vec<CampaignView> {
        build_views(&self.repository.snapshot(), self.clock.now())
    }

    async fn contribute(
        &self,
        id: CampaignId,
        amount: &str,
    ) -> Result<ActionOutcome, CampaignClientError> {
        self.orchestrator.contribute(id, amount).await
    }

    async fn finalize(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError> {
        self.orchestrator.finalize(id).await
    }

    async fn claim_refund(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError> {
        self.orchestrator.claim_refund(id).await
    }

    async fn create_campaign(
        &self,
        title: &str,
        goal: &str,
        duration_minutes: &str,
    ) -> Result<ActionOutcome, CampaignClientError> {
        self.orchestrator
            .create_campaign(title, goal, duration_minutes)
            .await
    }

    async fn balances(&self) -> Result<Balances, CampaignClientError> {
        let identity = self
            .gateway
            .current_identity()
            .await?
            .ok_or(CampaignClientError::NotConnected)?;
        let native = self.gateway.native_balance(identity).await?;
        let token = self.gateway.token_balance(identity).await?;
        Ok(Balances {
            identity,
            native,
            token,
        })
    }

    fn action_phase(&self, key: ActionKey) -> ActionPhase {
        self.orchestrator.phase(key)
    }

    fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.orchestrator.subscribe()
    }
}
