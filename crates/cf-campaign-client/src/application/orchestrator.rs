//! # Action Orchestrator
//!
//! Drives one state-changing action end to end:
//!
//! ```text
//! Idle -> Submitting -> AwaitingSettlement -> (Succeeded | Failed) -> Idle
//! ```
//!
//! 1. Take the lock for the action key (`ActionAlreadyInFlight` otherwise).
//! 2. Require an identity (`NotConnected`).
//! 3. Validate raw input and the lifecycle table against the cached snapshot.
//! 4. Submit the write.
//! 5. Await settlement in a spawned task that owns the lock guard. Dropping the
//!    caller's future does not cancel it.
//! 6. On success refresh the repository, then release.
//!
//! Failures release the lock and are returned verbatim without a refresh.

use super::locks::{ActionLockGuard, ActionLocks};
use super::repository::CampaignRepository;
use crate::algorithms::{
    check_action, parse_duration_minutes, parse_positive_units, parse_units, phase_of,
};
use crate::config::RefreshStrategy;
use crate::domain::{
    ActionEvent, ActionKey, ActionKind, ActionOutcome, ActionPhase, Address, Amount,
    CampaignClientError, CampaignId, PendingWrite, Phase, TxHash, ValidationError,
};
use crate::ports::{Clock, LedgerGateway};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Everything the detached settlement task needs.
struct SettlementContext<G: LedgerGateway + ?Sized> {
    gateway: Arc<G>,
    repository: Arc<CampaignRepository<G>>,
    events: broadcast::Sender<ActionEvent>,
    strategy: RefreshStrategy,
}

impl<G: LedgerGateway + ?Sized> Clone for SettlementContext<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            repository: Arc::clone(&self.repository),
            events: self.events.clone(),
            strategy: self.strategy,
        }
    }
}

fn publish(
    events: &broadcast::Sender<ActionEvent>,
    key: ActionKey,
    phase: ActionPhase,
    tx_hash: Option<TxHash>,
    error: Option<String>,
) {
    // no subscribers is fine
    let _ = events.send(ActionEvent {
        key,
        phase,
        tx_hash,
        error,
    });
}

impl<G: LedgerGateway + ?Sized + 'static> SettlementContext<G> {
    async fn settle(
        self,
        guard: ActionLockGuard,
        pending: PendingWrite,
    ) -> Result<ActionOutcome, CampaignClientError> {
        let key = guard.key();
        let tx = Some(pending.tx_hash);

        let settlement = match self.gateway.await_settlement(&pending).await {
            Ok(settlement) => settlement,
            Err(e) => {
                let error = CampaignClientError::from(e);
                warn!(action = %key, tx = ?pending.tx_hash, "Write failed: {}", error);
                guard.set_phase(ActionPhase::Failed);
                publish(&self.events, key, ActionPhase::Failed, tx, Some(error.to_string()));
                return Err(error);
            }
        };
        info!(
            action = %key,
            tx = ?settlement.tx_hash,
            block = ?settlement.block_number,
            "Write settled"
        );

        let refreshed = match (self.strategy, key.campaign_id()) {
            (RefreshStrategy::Targeted, Some(id)) => self.repository.invalidate(id).await,
            _ => self.repository.refresh().await,
        };
        let refresh_error = refreshed.err().map(|e| {
            warn!(action = %key, "Refresh after settlement failed: {}", e);
            e.to_string()
        });

        guard.set_phase(ActionPhase::Succeeded);
        publish(&self.events, key, ActionPhase::Succeeded, tx, refresh_error.clone());

        Ok(ActionOutcome {
            key,
            settlement,
            refresh_error,
        })
    }
}

/// Per-key action state machine.
pub struct ActionOrchestrator<G: LedgerGateway + ?Sized> {
    context: SettlementContext<G>,
    locks: Arc<ActionLocks>,
    clock: Arc<dyn Clock>,
    native_decimals: u8,
}

impl<G: LedgerGateway + ?Sized + 'static> ActionOrchestrator<G> {
    /// Create an orchestrator.
    pub fn new(
        gateway: Arc<G>,
        repository: Arc<CampaignRepository<G>>,
        clock: Arc<dyn Clock>,
        strategy: RefreshStrategy,
        native_decimals: u8,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            context: SettlementContext {
                gateway,
                repository,
                events,
                strategy,
            },
            locks: ActionLocks::new(),
            clock,
            native_decimals,
        }
    }

    /// Lock registry.
    pub fn locks(&self) -> &Arc<ActionLocks> {
        &self.locks
    }

    /// Current phase of `key`.
    pub fn phase(&self, key: ActionKey) -> ActionPhase {
        self.locks.phase(key)
    }

    /// Subscribe to phase transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.context.events.subscribe()
    }

    /// Contribute `amount` (decimal string in native units) to `id`.
    pub async fn contribute(
        &self,
        id: CampaignId,
        amount: &str,
    ) -> Result<ActionOutcome, CampaignClientError> {
        let guard = self.begin(ActionKey::campaign(id, ActionKind::Contribute))?;
        let submitted = self.submit_contribute(id, amount).await;
        self.finish(guard, submitted).await
    }

    /// Finalize `id`.
    pub async fn finalize(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError> {
        let guard = self.begin(ActionKey::campaign(id, ActionKind::Finalize))?;
        let submitted = self.submit_finalize(id).await;
        self.finish(guard, submitted).await
    }

    /// Claim the caller's refund from `id`.
    pub async fn claim_refund(&self, id: CampaignId) -> Result<ActionOutcome, CampaignClientError> {
        let guard = self.begin(ActionKey::campaign(id, ActionKind::ClaimRefund))?;
        let submitted = self.submit_claim_refund(id).await;
        self.finish(guard, submitted).await
    }

    /// Create a campaign. Keyed by the synthetic creation slot.
    pub async fn create_campaign(
        &self,
        title: &str,
        goal: &str,
        duration_minutes: &str,
    ) -> Result<ActionOutcome, CampaignClientError> {
        let guard = self.begin(ActionKey::creation())?;
        let submitted = self
            .submit_create_campaign(title, goal, duration_minutes)
            .await;
        self.finish(guard, submitted).await
    }

    async fn submit_contribute(
        &self,
        id: CampaignId,
        amount: &str,
    ) -> Result<PendingWrite, CampaignClientError> {
        let identity = self.require_identity().await?;
        let value = parse_positive_units(amount, self.native_decimals)?;
        self.validate(ActionKind::Contribute, id, identity).await?;
        Ok(self.context.gateway.submit_contribute(id, value).await?)
    }

    async fn submit_finalize(&self, id: CampaignId) -> Result<PendingWrite, CampaignClientError> {
        let identity = self.require_identity().await?;
        self.validate(ActionKind::Finalize, id, identity).await?;
        Ok(self.context.gateway.submit_finalize(id).await?)
    }

    async fn submit_claim_refund(
        &self,
        id: CampaignId,
    ) -> Result<PendingWrite, CampaignClientError> {
        let identity = self.require_identity().await?;
        self.validate(ActionKind::ClaimRefund, id, identity).await?;
        Ok(self.context.gateway.submit_claim_refund(id).await?)
    }

    async fn submit_create_campaign(
        &self,
        title: &str,
        goal: &str,
        duration_minutes: &str,
    ) -> Result<PendingWrite, CampaignClientError> {
        self.require_identity().await?;
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let goal = parse_units(goal, self.native_decimals)?;
        if goal.is_zero() {
            return Err(ValidationError::NonPositiveGoal.into());
        }
        let duration_secs = parse_duration_minutes(duration_minutes)?;
        Ok(self
            .context
            .gateway
            .submit_create_campaign(title, goal, duration_secs)
            .await?)
    }

    fn begin(&self, key: ActionKey) -> Result<ActionLockGuard, CampaignClientError> {
        let guard = self.locks.try_acquire(key).map_err(|e| {
            debug!(action = %key, "Rejected, already in flight");
            e
        })?;
        publish(&self.context.events, key, ActionPhase::Submitting, None, None);
        Ok(guard)
    }

    async fn require_identity(&self) -> Result<Address, CampaignClientError> {
        self.context
            .gateway
            .current_identity()
            .await?
            .ok_or(CampaignClientError::NotConnected)
    }

    /// Apply the lifecycle table to the cached campaign.
    ///
    /// The phase is decided locally first. The caller's contribution only
    /// matters for a refund from a failed campaign; it is read from the ledger
    /// in that one case when the snapshot was built for another identity.
    async fn validate(
        &self,
        kind: ActionKind,
        id: CampaignId,
        identity: Address,
    ) -> Result<(), CampaignClientError> {
        let snapshot = self.context.repository.snapshot();
        let entry = snapshot
            .get(id)
            .ok_or(ValidationError::UnknownCampaign(id))?;
        let now = self.clock.now();

        let needs_ledger_contribution = kind == ActionKind::ClaimRefund
            && phase_of(&entry.campaign, now) == Phase::FinalizedFailed
            && snapshot.identity != Some(identity);

        let contribution: Amount = if needs_ledger_contribution {
            self.context.gateway.contribution_of(id, identity).await?
        } else {
            entry.contribution
        };

        check_action(kind, &entry.campaign, contribution, now)?;
        Ok(())
    }

    async fn finish(
        &self,
        guard: ActionLockGuard,
        submitted: Result<PendingWrite, CampaignClientError>,
    ) -> Result<ActionOutcome, CampaignClientError> {
        let key = guard.key();
        let pending = match submitted {
            Ok(pending) => pending,
            Err(error) => {
                match &error {
                    CampaignClientError::Validation(_) | CampaignClientError::NotConnected => {
                        debug!(action = %key, "Not submitted: {}", error)
                    }
                    _ => warn!(action = %key, "Submission failed: {}", error),
                }
                guard.set_phase(ActionPhase::Failed);
                publish(
                    &self.context.events,
                    key,
                    ActionPhase::Failed,
                    None,
                    Some(error.to_string()),
                );
                return Err(error);
            }
        };

        info!(action = %key, tx = ?pending.tx_hash, "Awaiting settlement");
        guard.set_phase(ActionPhase::AwaitingSettlement);
        publish(
            &self.context.events,
            key,
            ActionPhase::AwaitingSettlement,
            Some(pending.tx_hash),
            None,
        );

        let task = tokio::spawn(self.context.clone().settle(guard, pending));
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(CampaignClientError::Gateway(format!(
                "Settlement task ended abnormally: {}",
                e
            ))),
        }
    }
}
