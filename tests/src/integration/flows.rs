//! # Campaign Lifecycle Flows
//!
//! Walks campaigns through every phase against the in-memory ledger:
//!
//! 1. **Failed campaign**: create → contribute → deadline → finalize → refund
//! 2. **Successful campaign**: goal reached, creator paid, no refunds
//! 3. **Targeted refresh**: same outcome with per-index invalidation
//! 4. **Clock skew**: client validation passes, the ledger reverts
//! 5. **Connection**: network mismatch and missing identity

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cf_campaign_client::{
        ActionKind, CampaignClient, CampaignClientApi, CampaignClientConfig, CampaignClientError,
        CampaignId, Clock, InMemoryLedger, ManualClock, Phase, RefreshStrategy, ValidationError,
    };

    use crate::integration::{
        client_for, eth, funded_ledger, setup, BACKER, CREATOR, OTHER_BACKER,
    };

    const ID: CampaignId = CampaignId(0);

    // =============================================================================
    // FAILED CAMPAIGN
    // =============================================================================

    #[tokio::test]
    async fn test_failed_campaign_refund_flow() {
        let (ledger, client) = setup();

        let created = client.create_campaign("Solar roof", "1", "10").await.unwrap();
        assert!(created.is_fresh());
        let view = client.view(ID).unwrap();
        assert_eq!(view.phase, Phase::Active);
        assert!(view.is_creator);
        assert_eq!(view.time_left, 600);

        ledger.set_identity(Some(BACKER));
        client.contribute(ID, "0.4").await.unwrap();
        client.contribute(ID, "0.4").await.unwrap();

        let view = client.view(ID).unwrap();
        assert_eq!(view.contribution, eth("0.8"));
        assert_eq!(view.raised, eth("0.8"));
        assert!(!view.is_creator);
        assert_eq!(ledger.balance_of(BACKER), eth("9.2"));

        // Too early to finalize: rejected locally, nothing submitted
        let err = client.finalize(ID).await.unwrap_err();
        assert!(matches!(
            err,
            CampaignClientError::Validation(ValidationError::NotPermitted {
                action: ActionKind::Finalize,
                phase: Phase::Active,
            })
        ));
        assert_eq!(ledger.pending_writes(), 0);

        ledger.advance_time(601);
        assert_eq!(client.view(ID).unwrap().phase, Phase::AwaitingFinalization);
        assert!(matches!(
            client.contribute(ID, "0.1").await,
            Err(CampaignClientError::Validation(_))
        ));

        client.finalize(ID).await.unwrap();
        let view = client.view(ID).unwrap();
        assert_eq!(view.phase, Phase::FinalizedFailed);
        assert!(view.permitted.claim_refund);

        client.claim_refund(ID).await.unwrap();
        let view = client.view(ID).unwrap();
        assert!(view.contribution.is_zero());
        assert!(view.permitted.is_empty());
        assert_eq!(ledger.balance_of(BACKER), eth("10"));

        // Refund is one-shot
        assert!(matches!(
            client.claim_refund(ID).await,
            Err(CampaignClientError::Validation(_))
        ));
    }

    // =============================================================================
    // SUCCESSFUL CAMPAIGN
    // =============================================================================

    #[tokio::test]
    async fn test_successful_campaign_pays_creator() {
        let (ledger, client) = setup();
        client.create_campaign("Bike lanes", "1", "1").await.unwrap();

        ledger.set_identity(Some(BACKER));
        client.contribute(ID, "0.7").await.unwrap();
        ledger.set_identity(Some(OTHER_BACKER));
        client.contribute(ID, "0.5").await.unwrap();

        ledger.advance_time(60);
        client.finalize(ID).await.unwrap();

        let view = client.view(ID).unwrap();
        assert_eq!(view.phase, Phase::FinalizedSuccessful);
        assert_eq!(view.progress_percent(), 100);
        assert!(view.permitted.is_empty());
        assert_eq!(ledger.balance_of(CREATOR), eth("11.2"));

        assert!(matches!(
            client.claim_refund(ID).await,
            Err(CampaignClientError::Validation(ValidationError::NotPermitted {
                phase: Phase::FinalizedSuccessful,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_views_keep_index_order() {
        let (ledger, client) = setup();
        for title in ["First", "Second", "Third"] {
            client.create_campaign(title, "1", "5").await.unwrap();
        }
        let titles: Vec<String> = client.views().into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert_eq!(client.snapshot().len(), 3);
    }

    // =============================================================================
    // TARGETED REFRESH
    // =============================================================================

    #[tokio::test]
    async fn test_targeted_strategy_matches_full_refresh() {
        let ledger = funded_ledger(InMemoryLedger::new());
        let config = CampaignClientConfig {
            refresh_strategy: RefreshStrategy::Targeted,
            ..CampaignClientConfig::for_testing()
        };
        let client = client_for(&ledger, config);

        client.create_campaign("Alpha", "2", "10").await.unwrap();
        client.create_campaign("Beta", "2", "10").await.unwrap();
        ledger.set_identity(Some(BACKER));
        client.refresh().await.unwrap();

        let before = client.snapshot();
        client.contribute(CampaignId(1), "1.5").await.unwrap();
        let after = client.snapshot();

        assert!(after.generation > before.generation);
        assert_eq!(after.get(CampaignId(0)), before.get(CampaignId(0)));
        assert_eq!(
            after.get(CampaignId(1)).unwrap().contribution,
            eth("1.5")
        );

        // A full reload agrees with the targeted one
        let full = client.refresh().await.unwrap();
        assert_eq!(full.entries, after.entries);
    }

    // =============================================================================
    // CLOCK SKEW
    // =============================================================================

    #[tokio::test]
    async fn test_ledger_revert_when_client_clock_lags() {
        let ledger = funded_ledger(InMemoryLedger::new());
        let client_clock = Arc::new(ManualClock::new(ledger.now()));
        let client = CampaignClient::new(
            CampaignClientConfig::for_testing(),
            Arc::clone(&ledger),
            Arc::clone(&client_clock) as Arc<dyn Clock>,
        )
        .unwrap();

        client.create_campaign("Skewed", "1", "1").await.unwrap();
        ledger.set_identity(Some(BACKER));
        client.refresh().await.unwrap();
        let before = client.snapshot();

        // Ledger is past the deadline, the client still thinks it is open
        ledger.advance_time(120);
        client_clock.advance(30);

        let err = client.contribute(ID, "0.1").await.unwrap_err();
        assert_eq!(
            err,
            CampaignClientError::Rejected("execution reverted: Deadline passed".to_string())
        );
        assert!(Arc::ptr_eq(&before, &client.snapshot()));
        assert_eq!(ledger.balance_of(BACKER), eth("10"));
        assert!(client
            .orchestrator()
            .locks()
            .try_acquire(cf_campaign_client::ActionKey::campaign(ID, ActionKind::Contribute))
            .is_ok());
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected_at_submit() {
        let (ledger, client) = setup();
        client.create_campaign("Big dream", "100", "10").await.unwrap();
        ledger.set_identity(Some(BACKER));

        let err = client.contribute(ID, "50").await.unwrap_err();
        assert!(matches!(err, CampaignClientError::Rejected(_)));
        assert_eq!(ledger.pending_writes(), 0);
        assert!(client.view(ID).unwrap().raised.is_zero());
    }

    // =============================================================================
    // CONNECTION
    // =============================================================================

    #[tokio::test]
    async fn test_network_mismatch_is_reported() {
        let ledger = funded_ledger(InMemoryLedger::new().with_network_id(1));
        let client = client_for(&ledger, CampaignClientConfig::for_testing());

        let info = client.connect().await.unwrap();
        assert_eq!(info.identity, CREATOR);
        assert_eq!(info.network_id, 1);
        assert!(!info.on_expected_network);

        // Still usable
        client.create_campaign("Mainnet by mistake", "1", "5").await.unwrap();
        assert_eq!(client.views().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_identity() {
        let (ledger, client) = setup();
        client.create_campaign("Orphan", "1", "5").await.unwrap();
        ledger.set_identity(None);

        assert_eq!(client.connect().await, Err(CampaignClientError::NotConnected));
        assert_eq!(
            client.contribute(ID, "0.1").await,
            Err(CampaignClientError::NotConnected)
        );
        assert_eq!(client.balances().await, Err(CampaignClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_balances_follow_contributions() {
        let (ledger, client) = setup();
        client.create_campaign("Choir", "1", "5").await.unwrap();
        ledger.set_identity(Some(BACKER));
        client.contribute(ID, "2.5").await.unwrap();

        let balances = client.balances().await.unwrap();
        assert_eq!(balances.identity, BACKER);
        assert_eq!(balances.native, eth("7.5"));
        assert!(balances.token.is_none());
    }
}
