//! # Outbound Ports
//!
//! Traits for external collaborators: identity/network provider, ledger read
//! and write surfaces, balances and the wall clock.

use crate::domain::{
    ActionKind, Address, Amount, Campaign, CampaignId, LedgerError, PendingWrite, Settlement,
    Timestamp, TokenBalance, TxHash,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;

/// Identity/network provider - outbound port.
///
/// Queried before every write.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Account writes are sent from. `None` when no account is connected.
    async fn current_identity(&self) -> Result<Option<Address>, LedgerError>;

    /// Chain id of the connected network.
    async fn current_network_id(&self) -> Result<u64, LedgerError>;
}

/// Ledger read surface - outbound port.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Number of campaigns; indices `0..count` are valid.
    async fn campaign_count(&self) -> Result<u64, LedgerError>;

    /// Campaign at `id`.
    async fn campaign(&self, id: CampaignId) -> Result<Campaign, LedgerError>;

    /// Amount `identity` has contributed to `id`.
    async fn contribution_of(
        &self,
        id: CampaignId,
        identity: Address,
    ) -> Result<Amount, LedgerError>;
}

/// Ledger write surface - outbound port.
///
/// Submissions return once the ledger has accepted the write for processing;
/// [`LedgerWriter::await_settlement`] waits for confirmation for as long as
/// the gateway's own policy allows.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Send `amount` to campaign `id`.
    async fn submit_contribute(
        &self,
        id: CampaignId,
        amount: Amount,
    ) -> Result<PendingWrite, LedgerError>;

    /// Finalize campaign `id`.
    async fn submit_finalize(&self, id: CampaignId) -> Result<PendingWrite, LedgerError>;

    /// Claim the caller's refund from campaign `id`.
    async fn submit_claim_refund(&self, id: CampaignId) -> Result<PendingWrite, LedgerError>;

    /// Create a campaign running for `duration_secs` from ledger time.
    async fn submit_create_campaign(
        &self,
        title: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<PendingWrite, LedgerError>;

    /// Wait for an accepted write to settle.
    async fn await_settlement(&self, write: &PendingWrite) -> Result<Settlement, LedgerError>;
}

/// Everything the repository and orchestrator need from the ledger.
pub trait LedgerGateway: IdentityProvider + LedgerReader + LedgerWriter {}

impl<T: IdentityProvider + LedgerReader + LedgerWriter> LedgerGateway for T {}

/// Balance reader - outbound port.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    /// Native currency balance of `identity`.
    async fn native_balance(&self, identity: Address) -> Result<Amount, LedgerError>;

    /// Balance of the configured token, `None` when no token is configured.
    async fn token_balance(&self, identity: Address)
        -> Result<Option<TokenBalance>, LedgerError>;
}

/// Wall clock used for every phase decision.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Operating-system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Settable clock for tests and demos.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock frozen at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Write recorded by [`MockLedgerGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedWrite {
    /// `submit_contribute`.
    Contribute(CampaignId, Amount),
    /// `submit_finalize`.
    Finalize(CampaignId),
    /// `submit_claim_refund`.
    ClaimRefund(CampaignId),
    /// `submit_create_campaign`.
    CreateCampaign {
        /// Title as submitted.
        title: String,
        /// Goal as submitted.
        goal: Amount,
        /// Duration as submitted.
        duration_secs: u64,
    },
}

/// How [`MockLedgerGateway`] answers writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteBehavior {
    /// Accept and settle.
    Settle,
    /// Refuse at submission.
    RejectOnSubmit(String),
    /// Accept, then report a rejected settlement.
    RejectOnSettlement(String),
    /// Accept, then fail settlement with an infrastructure error.
    GatewayFailure(String),
}

/// Recording gateway stub. Holds static campaign data; writes are recorded,
/// never applied.
pub struct MockLedgerGateway {
    /// Identity returned by the provider.
    pub identity: RwLock<Option<Address>>,
    /// Chain id returned by the provider.
    pub network_id: u64,
    /// Campaigns served by the read surface.
    pub campaigns: RwLock<Vec<Campaign>>,
    /// Contributions served by the read surface.
    pub contributions: RwLock<HashMap<(CampaignId, Address), Amount>>,
    /// Reads of campaigns/contributions at or beyond this index fail.
    pub fail_reads_from: RwLock<Option<u64>>,
    /// `campaign_count` fails.
    pub fail_count: AtomicBool,
    /// Native balance served by the balance reader.
    pub native_balance: RwLock<Amount>,
    /// Behavior for every write.
    pub write_behavior: RwLock<WriteBehavior>,
    settlement_gate: RwLock<Option<Arc<Semaphore>>>,
    writes: RwLock<Vec<RecordedWrite>>,
    read_calls: AtomicUsize,
    identity_calls: AtomicUsize,
    settlement_calls: AtomicUsize,
    next_tx: AtomicU64,
}

impl MockLedgerGateway {
    /// Mock connected as `identity` on Sepolia with no campaigns.
    pub fn new(identity: Option<Address>) -> Self {
        Self {
            identity: RwLock::new(identity),
            network_id: crate::domain::SEPOLIA_CHAIN_ID,
            campaigns: RwLock::new(Vec::new()),
            contributions: RwLock::new(HashMap::new()),
            fail_reads_from: RwLock::new(None),
            fail_count: AtomicBool::new(false),
            native_balance: RwLock::new(Amount::zero()),
            write_behavior: RwLock::new(WriteBehavior::Settle),
            settlement_gate: RwLock::new(None),
            writes: RwLock::new(Vec::new()),
            read_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            settlement_calls: AtomicUsize::new(0),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Replace the served campaigns.
    pub fn with_campaigns(self, campaigns: Vec<Campaign>) -> Self {
        *self.campaigns.write() = campaigns;
        self
    }

    /// Set a contribution.
    pub fn set_contribution(&self, id: CampaignId, who: Address, amount: Amount) {
        self.contributions.write().insert((id, who), amount);
    }

    /// Change the write behavior.
    pub fn set_write_behavior(&self, behavior: WriteBehavior) {
        *self.write_behavior.write() = behavior;
    }

    /// Make reads at index `from` and above fail (`None` clears).
    pub fn set_fail_reads_from(&self, from: Option<u64>) {
        *self.fail_reads_from.write() = from;
    }

    /// Block settlements until [`MockLedgerGateway::release_settlement`].
    pub fn hold_settlements(&self) {
        *self.settlement_gate.write() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held settlement through.
    pub fn release_settlement(&self) {
        if let Some(gate) = self.settlement_gate.read().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Read-surface invocations.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Write-surface submissions.
    pub fn write_calls(&self) -> usize {
        self.writes.read().len()
    }

    /// Settlement waits started.
    pub fn settlement_calls(&self) -> usize {
        self.settlement_calls.load(Ordering::SeqCst)
    }

    /// Identity-provider invocations.
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    /// Every gateway invocation except identity lookups.
    pub fn gateway_calls(&self) -> usize {
        self.read_calls() + self.write_calls() + self.settlement_calls()
    }

    /// Writes submitted so far.
    pub fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().clone()
    }

    fn check_read(&self, id: CampaignId) -> Result<(), LedgerError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        match *self.fail_reads_from.read() {
            Some(from) if id.index() >= from => {
                Err(LedgerError::Gateway(format!("Mock read failure at {}", id)))
            }
            _ => Ok(()),
        }
    }

    fn record(&self, write: RecordedWrite, kind: ActionKind) -> Result<PendingWrite, LedgerError> {
        self.writes.write().push(write);
        if let WriteBehavior::RejectOnSubmit(reason) = &*self.write_behavior.read() {
            return Err(LedgerError::Rejected(reason.clone()));
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(PendingWrite {
            tx_hash: TxHash::from_low_u64_be(n),
            kind,
        })
    }
}

impl Default for MockLedgerGateway {
    fn default() -> Self {
        Self::new(Some(Address::repeat_byte(0x11)))
    }
}

#[async_trait]
impl IdentityProvider for MockLedgerGateway {
    async fn current_identity(&self) -> Result<Option<Address>, LedgerError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.identity.read())
    }

    async fn current_network_id(&self) -> Result<u64, LedgerError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.network_id)
    }
}

#[async_trait]
impl LedgerReader for MockLedgerGateway {
    async fn campaign_count(&self) -> Result<u64, LedgerError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(LedgerError::Gateway("Mock count failure".to_string()));
        }
        Ok(self.campaigns.read().len() as u64)
    }

    async fn campaign(&self, id: CampaignId) -> Result<Campaign, LedgerError> {
        self.check_read(id)?;
        self.campaigns
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::Gateway(format!("No campaign {}", id)))
    }

    async fn contribution_of(
        &self,
        id: CampaignId,
        identity: Address,
    ) -> Result<Amount, LedgerError> {
        self.check_read(id)?;
        Ok(self
            .contributions
            .read()
            .get(&(id, identity))
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LedgerWriter for MockLedgerGateway {
    async fn submit_contribute(
        &self,
        id: CampaignId,
        amount: Amount,
    ) -> Result<PendingWrite, LedgerError> {
        self.record(RecordedWrite::Contribute(id, amount), ActionKind::Contribute)
    }

    async fn submit_finalize(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        self.record(RecordedWrite::Finalize(id), ActionKind::Finalize)
    }

    async fn submit_claim_refund(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        self.record(RecordedWrite::ClaimRefund(id), ActionKind::ClaimRefund)
    }

    async fn submit_create_campaign(
        &self,
        title: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<PendingWrite, LedgerError> {
        self.record(
            RecordedWrite::CreateCampaign {
                title: title.to_string(),
                goal,
                duration_secs,
            },
            ActionKind::CreateCampaign,
        )
    }

    async fn await_settlement(&self, write: &PendingWrite) -> Result<Settlement, LedgerError> {
        self.settlement_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.settlement_gate.read().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| LedgerError::Gateway("Mock settlement gate closed".to_string()))?
                .forget();
        }

        let behavior = self.write_behavior.read().clone();
        match behavior {
            WriteBehavior::Settle | WriteBehavior::RejectOnSubmit(_) => Ok(Settlement {
                tx_hash: write.tx_hash,
                block_number: Some(1),
            }),
            WriteBehavior::RejectOnSettlement(reason) => Err(LedgerError::Rejected(reason)),
            WriteBehavior::GatewayFailure(reason) => Err(LedgerError::Gateway(reason)),
        }
    }
}

#[async_trait]
impl BalanceReader for MockLedgerGateway {
    async fn native_balance(&self, _identity: Address) -> Result<Amount, LedgerError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.native_balance.read())
    }

    async fn token_balance(
        &self,
        _identity: Address,
    ) -> Result<Option<TokenBalance>, LedgerError> {
        Ok(None)
    }
}
