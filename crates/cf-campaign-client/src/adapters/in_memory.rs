//! In-Memory Ledger Adapter
//!
//! In-process simulation of the crowdfunding contract. Implements every
//! outbound ledger port plus [`Clock`], so a client and its ledger can share
//! one settable notion of time.
//!
//! Writes are queued at submission and executed at settlement against the
//! ledger time of that moment, which is how a real chain behaves: a write that
//! passed the client's checks can still revert.
//!
//! Settled results are kept for repeated `await_settlement` calls up to a
//! retention bound; the oldest are dropped first.

use crate::domain::{
    ActionKind, Address, Amount, Campaign, CampaignId, LedgerError, PendingWrite, Settlement,
    Timestamp, TokenBalance, TxHash, SEPOLIA_CHAIN_ID,
};
use crate::ports::{BalanceReader, Clock, IdentityProvider, LedgerReader, LedgerWriter};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

/// Call queued until settlement.
#[derive(Clone, Debug)]
enum ContractCall {
    Contribute(CampaignId, Amount),
    Finalize(CampaignId),
    ClaimRefund(CampaignId),
    CreateCampaign {
        title: String,
        goal: Amount,
        duration_secs: u64,
    },
}

#[derive(Clone, Debug)]
struct QueuedWrite {
    from: Address,
    call: ContractCall,
}

#[derive(Debug, Default)]
struct LedgerState {
    campaigns: Vec<Campaign>,
    contributions: HashMap<(CampaignId, Address), Amount>,
    balances: HashMap<Address, Amount>,
    queued: HashMap<TxHash, QueuedWrite>,
    settled: HashMap<TxHash, Result<Settlement, LedgerError>>,
    settled_order: VecDeque<TxHash>,
    next_tx: u64,
    block: u64,
}

/// In-memory crowdfunding contract.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    identity: RwLock<Option<Address>>,
    network_id: u64,
    current_time: RwLock<Timestamp>,
    settlement_delay: Option<Duration>,
    settlement_retention: usize,
}

/// Settled results kept for repeated `await_settlement` calls.
const DEFAULT_SETTLEMENT_RETENTION: usize = 1024;

impl InMemoryLedger {
    /// Create an empty ledger on Sepolia at a fixed start time.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            identity: RwLock::new(None),
            network_id: SEPOLIA_CHAIN_ID,
            current_time: RwLock::new(1_700_000_000),
            settlement_delay: None,
            settlement_retention: DEFAULT_SETTLEMENT_RETENTION,
        }
    }

    /// Pretend to be connected to another network.
    pub fn with_network_id(mut self, network_id: u64) -> Self {
        self.network_id = network_id;
        self
    }

    /// Sleep this long before executing each settlement.
    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = Some(delay);
        self
    }

    /// Keep at most `count` settled results; older handles become unknown.
    pub fn with_settlement_retention(mut self, count: usize) -> Self {
        self.settlement_retention = count.max(1);
        self
    }

    /// Switch the connected account (`None` disconnects).
    pub fn set_identity(&self, identity: Option<Address>) {
        *self.identity.write() = identity;
    }

    /// Credit native balance.
    pub fn fund(&self, account: Address, amount: Amount) {
        let mut state = self.state.write();
        let balance = state.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Native balance of `account`.
    pub fn balance_of(&self, account: Address) -> Amount {
        self.state
            .read()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Set current time for testing.
    pub fn set_time(&self, time: Timestamp) {
        *self.current_time.write() = time;
    }

    /// Advance time for testing.
    pub fn advance_time(&self, secs: u64) {
        let mut time = self.current_time.write();
        *time = time.saturating_add(secs);
    }

    /// Writes submitted but not yet settled.
    pub fn pending_writes(&self) -> usize {
        self.state.read().queued.len()
    }

    fn enqueue(&self, kind: ActionKind, call: ContractCall) -> Result<PendingWrite, LedgerError> {
        let from = (*self.identity.read())
            .ok_or_else(|| LedgerError::Rejected("No account selected".to_string()))?;

        let mut state = self.state.write();
        if let ContractCall::Contribute(_, amount) = &call {
            let balance = state.balances.get(&from).copied().unwrap_or_default();
            if balance < *amount {
                return Err(LedgerError::Rejected(
                    "insufficient funds for transfer".to_string(),
                ));
            }
        }

        state.next_tx += 1;
        let tx_hash = TxHash::from_low_u64_be(state.next_tx);
        state.queued.insert(tx_hash, QueuedWrite { from, call });

        debug!(action = %kind, tx = ?tx_hash, "Write queued");
        Ok(PendingWrite { tx_hash, kind })
    }

    fn execute(
        state: &mut LedgerState,
        now: Timestamp,
        write: QueuedWrite,
    ) -> Result<(), LedgerError> {
        let revert = |reason: &str| Err(LedgerError::Rejected(format!("execution reverted: {}", reason)));
        let from = write.from;

        match write.call {
            ContractCall::CreateCampaign {
                title,
                goal,
                duration_secs,
            } => {
                if title.trim().is_empty() {
                    return revert("Empty title");
                }
                if goal.is_zero() {
                    return revert("Goal must be > 0");
                }
                if duration_secs == 0 {
                    return revert("Duration must be > 0");
                }
                let id = CampaignId(state.campaigns.len() as u64);
                state.campaigns.push(Campaign::new(
                    id,
                    from,
                    title,
                    goal,
                    now.saturating_add(duration_secs),
                ));
                info!(campaign = %id, "Campaign created");
                Ok(())
            }
            ContractCall::Contribute(id, amount) => {
                let Some(campaign) = state.campaigns.get(id.index() as usize) else {
                    return revert("Campaign does not exist");
                };
                if campaign.finalized {
                    return revert("Already finalized");
                }
                if now >= campaign.deadline {
                    return revert("Deadline passed");
                }
                if amount.is_zero() {
                    return revert("Zero contribution");
                }
                let balance = state.balances.get(&from).copied().unwrap_or_default();
                if balance < amount {
                    return revert("Insufficient balance");
                }
                let index = id.index() as usize;
                let contributed = state
                    .contributions
                    .get(&(id, from))
                    .copied()
                    .unwrap_or_default();
                let (Some(raised), Some(contributed)) = (
                    state.campaigns[index].raised.checked_add(amount),
                    contributed.checked_add(amount),
                ) else {
                    return revert("Amount overflow");
                };
                state.balances.insert(from, balance - amount);
                state.campaigns[index].raised = raised;
                state.contributions.insert((id, from), contributed);
                Ok(())
            }
            ContractCall::Finalize(id) => {
                let Some(campaign) = state.campaigns.get_mut(id.index() as usize) else {
                    return revert("Campaign does not exist");
                };
                if campaign.finalized {
                    return revert("Already finalized");
                }
                if now < campaign.deadline {
                    return revert("Deadline not reached");
                }
                let (creator, raised, successful) =
                    (campaign.creator, campaign.raised, campaign.goal_reached());
                if successful {
                    let balance = state.balances.get(&creator).copied().unwrap_or_default();
                    let Some(paid) = balance.checked_add(raised) else {
                        return revert("Amount overflow");
                    };
                    state.balances.insert(creator, paid);
                }
                let campaign = &mut state.campaigns[id.index() as usize];
                campaign.finalized = true;
                campaign.successful = successful;
                info!(campaign = %id, successful, "Campaign finalized");
                Ok(())
            }
            ContractCall::ClaimRefund(id) => {
                let Some(campaign) = state.campaigns.get(id.index() as usize) else {
                    return revert("Campaign does not exist");
                };
                if !campaign.finalized || campaign.successful {
                    return revert("Refunds not available");
                }
                let owed = state
                    .contributions
                    .get(&(id, from))
                    .copied()
                    .unwrap_or_default();
                if owed.is_zero() {
                    return revert("Nothing to refund");
                }
                let balance = state.balances.get(&from).copied().unwrap_or_default();
                let Some(refunded) = balance.checked_add(owed) else {
                    return revert("Amount overflow");
                };
                state.contributions.insert((id, from), Amount::zero());
                state.balances.insert(from, refunded);
                Ok(())
            }
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InMemoryLedger {
    fn now(&self) -> Timestamp {
        *self.current_time.read()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryLedger {
    async fn current_identity(&self) -> Result<Option<Address>, LedgerError> {
        Ok(*self.identity.read())
    }

    async fn current_network_id(&self) -> Result<u64, LedgerError> {
        Ok(self.network_id)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn campaign_count(&self) -> Result<u64, LedgerError> {
        Ok(self.state.read().campaigns.len() as u64)
    }

    async fn campaign(&self, id: CampaignId) -> Result<Campaign, LedgerError> {
        self.state
            .read()
            .campaigns
            .get(id.index() as usize)
            .cloned()
            .ok_or_else(|| LedgerError::Gateway(format!("execution reverted: no campaign {}", id)))
    }

    async fn contribution_of(
        &self,
        id: CampaignId,
        identity: Address,
    ) -> Result<Amount, LedgerError> {
        Ok(self
            .state
            .read()
            .contributions
            .get(&(id, identity))
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn submit_contribute(
        &self,
        id: CampaignId,
        amount: Amount,
    ) -> Result<PendingWrite, LedgerError> {
        self.enqueue(ActionKind::Contribute, ContractCall::Contribute(id, amount))
    }

    async fn submit_finalize(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        self.enqueue(ActionKind::Finalize, ContractCall::Finalize(id))
    }

    async fn submit_claim_refund(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        self.enqueue(ActionKind::ClaimRefund, ContractCall::ClaimRefund(id))
    }

    async fn submit_create_campaign(
        &self,
        title: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<PendingWrite, LedgerError> {
        self.enqueue(
            ActionKind::CreateCampaign,
            ContractCall::CreateCampaign {
                title: title.to_string(),
                goal,
                duration_secs,
            },
        )
    }

    async fn await_settlement(&self, write: &PendingWrite) -> Result<Settlement, LedgerError> {
        if let Some(delay) = self.settlement_delay {
            tokio::time::sleep(delay).await;
        }

        let now = self.now();
        let mut state = self.state.write();
        if let Some(result) = state.settled.get(&write.tx_hash) {
            return result.clone();
        }
        let queued = state
            .queued
            .remove(&write.tx_hash)
            .ok_or_else(|| LedgerError::Gateway(format!("Unknown transaction {:?}", write.tx_hash)))?;

        let result = Self::execute(&mut state, now, queued).map(|()| {
            state.block += 1;
            Settlement {
                tx_hash: write.tx_hash,
                block_number: Some(state.block),
            }
        });
        state.settled.insert(write.tx_hash, result.clone());
        state.settled_order.push_back(write.tx_hash);
        while state.settled_order.len() > self.settlement_retention {
            if let Some(oldest) = state.settled_order.pop_front() {
                state.settled.remove(&oldest);
            }
        }
        result
    }
}

#[async_trait]
impl BalanceReader for InMemoryLedger {
    async fn native_balance(&self, identity: Address) -> Result<Amount, LedgerError> {
        Ok(self.balance_of(identity))
    }

    async fn token_balance(
        &self,
        _identity: Address,
    ) -> Result<Option<TokenBalance>, LedgerError> {
        Ok(None)
    }
}
