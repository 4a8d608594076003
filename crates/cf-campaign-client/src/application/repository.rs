//! # Campaign Repository
//!
//! Fetches the campaign set and the caller's contributions into an immutable
//! [`CampaignSnapshot`] and swaps it in atomically.
//!
//! Every refresh takes a ticket from a monotonic counter and the ticket becomes
//! the snapshot's generation. A refresh completing after a newer one has been
//! installed is discarded, so concurrent refreshes can race without the
//! rendered state ever moving backwards.

use crate::domain::{
    check_entry_transition, Address, Amount, CampaignEntry, CampaignId, CampaignSnapshot,
    LedgerError, Timestamp,
};
use crate::ports::{Clock, LedgerGateway};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Refresh counters.
#[derive(Debug, Default)]
pub struct RefreshStats {
    /// Refreshes started (full and targeted).
    pub attempts: AtomicU64,
    /// Refreshes that installed a snapshot.
    pub installed: AtomicU64,
    /// Refreshes that failed on a read.
    pub failures: AtomicU64,
    /// Refreshes discarded because a newer snapshot was already installed.
    pub discarded: AtomicU64,
}

/// Point-in-time copy of [`RefreshStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshCounts {
    /// Refreshes started.
    pub attempts: u64,
    /// Snapshots installed.
    pub installed: u64,
    /// Failed refreshes.
    pub failures: u64,
    /// Stale refreshes dropped.
    pub discarded: u64,
}

/// Read-through cache of the ledger's campaigns.
pub struct CampaignRepository<G: LedgerGateway + ?Sized> {
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    snapshot: RwLock<Arc<CampaignSnapshot>>,
    tickets: AtomicU64,
    stats: RefreshStats,
}

impl<G: LedgerGateway + ?Sized> CampaignRepository<G> {
    /// Create a repository holding the empty snapshot.
    pub fn new(gateway: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            snapshot: RwLock::new(Arc::new(CampaignSnapshot::empty())),
            tickets: AtomicU64::new(0),
            stats: RefreshStats::default(),
        }
    }

    /// Currently installed snapshot.
    pub fn snapshot(&self) -> Arc<CampaignSnapshot> {
        self.snapshot.read().clone()
    }

    /// Refresh counters.
    pub fn counts(&self) -> RefreshCounts {
        RefreshCounts {
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            installed: self.stats.installed.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
        }
    }

    fn take_ticket(&self) -> u64 {
        self.stats.attempts.fetch_add(1, Ordering::Relaxed);
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Re-read every campaign.
    ///
    /// On failure the installed snapshot is untouched.
    pub async fn refresh(&self) -> Result<Arc<CampaignSnapshot>, LedgerError> {
        let ticket = self.take_ticket();
        let fetched_at = self.clock.now();

        let result = async {
            let identity = self.gateway.current_identity().await?;
            self.fetch_all(identity, ticket, fetched_at).await
        }
        .await;

        match result {
            Ok(snapshot) => Ok(self.install(snapshot)),
            Err(e) => Err(self.record_failure(ticket, e)),
        }
    }

    /// Re-read a single campaign and install a snapshot with that entry
    /// replaced.
    ///
    /// Falls back to a full refresh when `id` is not in the cached snapshot or
    /// the identity changed since it was built.
    pub async fn invalidate(&self, id: CampaignId) -> Result<Arc<CampaignSnapshot>, LedgerError> {
        let ticket = self.take_ticket();
        let fetched_at = self.clock.now();

        let identity = match self.gateway.current_identity().await {
            Ok(identity) => identity,
            Err(e) => return Err(self.record_failure(ticket, e)),
        };

        let base = self.snapshot();
        if base.identity != identity || base.get(id).is_none() {
            debug!(campaign = %id, "Targeted refresh not possible, reading all campaigns");
            return match self.fetch_all(identity, ticket, fetched_at).await {
                Ok(snapshot) => Ok(self.install(snapshot)),
                Err(e) => Err(self.record_failure(ticket, e)),
            };
        }

        match self.fetch_entry(id, identity).await {
            Ok(entry) => Ok(self.install_entry(entry, identity, ticket, fetched_at)),
            Err(e) => Err(self.record_failure(ticket, e)),
        }
    }

    async fn fetch_all(
        &self,
        identity: Option<Address>,
        generation: u64,
        fetched_at: Timestamp,
    ) -> Result<CampaignSnapshot, LedgerError> {
        let count = self.gateway.campaign_count().await?;
        debug!(count, generation, "Reading campaigns");

        let mut entries = Vec::new();
        for index in 0..count {
            entries.push(self.fetch_entry(CampaignId(index), identity).await?);
        }

        Ok(CampaignSnapshot {
            identity,
            entries,
            generation,
            fetched_at,
        })
    }

    async fn fetch_entry(
        &self,
        id: CampaignId,
        identity: Option<Address>,
    ) -> Result<CampaignEntry, LedgerError> {
        let campaign = self.gateway.campaign(id).await?;
        let contribution = match identity {
            Some(who) => self.gateway.contribution_of(id, who).await?,
            None => Amount::zero(),
        };
        Ok(CampaignEntry {
            campaign,
            contribution,
        })
    }

    fn record_failure(&self, ticket: u64, error: LedgerError) -> LedgerError {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        warn!(generation = ticket, "Refresh failed: {}", error);
        error
    }

    fn install(&self, next: CampaignSnapshot) -> Arc<CampaignSnapshot> {
        let mut current = self.snapshot.write();
        if next.generation < current.generation {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                generation = next.generation,
                installed = current.generation,
                "Discarding stale refresh"
            );
            return current.clone();
        }

        if current.identity == next.identity {
            for (previous, entry) in current.entries.iter().zip(next.entries.iter()) {
                for violation in check_entry_transition(previous, entry) {
                    warn!(campaign = %entry.campaign.id, "Ledger reported {}", violation);
                }
            }
        }

        let next = Arc::new(next);
        *current = Arc::clone(&next);
        self.stats.installed.fetch_add(1, Ordering::Relaxed);
        info!(
            generation = next.generation,
            campaigns = next.len(),
            "Snapshot replaced"
        );
        next
    }

    fn install_entry(
        &self,
        entry: CampaignEntry,
        identity: Option<Address>,
        generation: u64,
        fetched_at: Timestamp,
    ) -> Arc<CampaignSnapshot> {
        let mut current = self.snapshot.write();
        let id = entry.campaign.id;

        let next = if generation < current.generation || current.identity != identity {
            None
        } else {
            if let Some(previous) = current.get(id) {
                for violation in check_entry_transition(previous, &entry) {
                    warn!(campaign = %id, "Ledger reported {}", violation);
                }
            }
            current.with_entry(entry, generation, fetched_at)
        };

        match next {
            Some(next) => {
                let next = Arc::new(next);
                *current = Arc::clone(&next);
                self.stats.installed.fetch_add(1, Ordering::Relaxed);
                info!(campaign = %id, generation, "Snapshot entry replaced");
                next
            }
            None => {
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(campaign = %id, generation, "Discarding stale targeted refresh");
                current.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Campaign};
    use crate::ports::{ManualClock, MockLedgerGateway};

    fn me() -> Address {
        Address::repeat_byte(0x11)
    }

    fn campaigns(n: u64) -> Vec<Campaign> {
        (0..n)
            .map(|i| {
                Campaign::new(
                    CampaignId(i),
                    Address::repeat_byte(0x22),
                    format!("Campaign {}", i),
                    Amount::from(10),
                    2_000,
                )
            })
            .collect()
    }

    fn repository(mock: MockLedgerGateway) -> (Arc<MockLedgerGateway>, CampaignRepository<MockLedgerGateway>) {
        let mock = Arc::new(mock);
        let repo = CampaignRepository::new(Arc::clone(&mock), Arc::new(ManualClock::new(1_000)));
        (mock, repo)
    }

    #[tokio::test]
    async fn test_refresh_builds_ordered_snapshot() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(3)));
        mock.set_contribution(CampaignId(1), me(), Amount::from(4));

        let snapshot = repo.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.fetched_at, 1_000);
        assert_eq!(snapshot.identity, Some(me()));
        assert_eq!(snapshot.get(CampaignId(1)).unwrap().contribution, Amount::from(4));
        assert!(snapshot.get(CampaignId(0)).unwrap().contribution.is_zero());
        assert_eq!(repo.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_failure_mid_refresh_keeps_previous_snapshot() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(3)));
        let before = repo.refresh().await.unwrap();

        mock.set_fail_reads_from(Some(2));
        assert!(matches!(repo.refresh().await, Err(LedgerError::Gateway(_))));
        assert_eq!(repo.snapshot(), before);
        assert_eq!(repo.counts().failures, 1);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_empty_snapshot() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(2)));
        mock.set_fail_reads_from(Some(1));
        assert!(repo.refresh().await.is_err());
        assert!(repo.snapshot().is_empty());
        assert_eq!(repo.snapshot().generation, 0);
    }

    #[tokio::test]
    async fn test_without_identity_contributions_are_zero() {
        let (mock, repo) = repository(MockLedgerGateway::new(None).with_campaigns(campaigns(2)));
        let snapshot = repo.refresh().await.unwrap();
        assert_eq!(snapshot.identity, None);
        assert!(snapshot.iter().all(|e| e.contribution.is_zero()));
        // count + one campaign read per index, no contribution reads
        assert_eq!(mock.read_calls(), 3);
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let (_mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(1)));
        let newer = repo.refresh().await.unwrap();

        let stale = CampaignSnapshot {
            generation: 0,
            ..CampaignSnapshot::empty()
        };
        let installed = repo.install(stale);
        assert_eq!(installed, newer);
        assert_eq!(repo.snapshot(), newer);
        assert_eq!(repo.counts().discarded, 1);
    }

    #[tokio::test]
    async fn test_invalidate_replaces_single_entry() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(3)));
        repo.refresh().await.unwrap();
        let reads_before = mock.read_calls();

        mock.campaigns.write()[1].raised = Amount::from(7);
        mock.set_contribution(CampaignId(1), me(), Amount::from(7));

        let snapshot = repo.invalidate(CampaignId(1)).await.unwrap();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.get(CampaignId(1)).unwrap().campaign.raised, Amount::from(7));
        assert_eq!(snapshot.get(CampaignId(1)).unwrap().contribution, Amount::from(7));
        // campaign + contribution for one index only
        assert_eq!(mock.read_calls() - reads_before, 2);
    }

    #[tokio::test]
    async fn test_invalidate_unknown_index_falls_back_to_full_refresh() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(1)));
        repo.refresh().await.unwrap();

        mock.campaigns.write().extend(campaigns(2).into_iter().skip(1));
        let snapshot = repo.invalidate(CampaignId(1)).await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_after_identity_switch_reads_everything() {
        let (mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(2)));
        repo.refresh().await.unwrap();

        let other = Address::repeat_byte(0x99);
        *mock.identity.write() = Some(other);
        mock.set_contribution(CampaignId(0), other, Amount::from(3));

        let snapshot = repo.invalidate(CampaignId(1)).await.unwrap();
        assert_eq!(snapshot.identity, Some(other));
        assert_eq!(snapshot.get(CampaignId(0)).unwrap().contribution, Amount::from(3));
    }

    #[tokio::test]
    async fn test_counts_track_attempts() {
        let (_mock, repo) = repository(MockLedgerGateway::new(Some(me())).with_campaigns(campaigns(1)));
        repo.refresh().await.unwrap();
        repo.invalidate(CampaignId(0)).await.unwrap();
        let counts = repo.counts();
        assert_eq!(counts.attempts, 2);
        assert_eq!(counts.installed, 2);
        assert_eq!(counts.failures, 0);
    }
}
