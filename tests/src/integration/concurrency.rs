//! # Action Concurrency
//!
//! Settlement is slowed down so actions overlap:
//!
//! - Same key: second caller gets `ActionAlreadyInFlight`, first is unaffected
//! - Different keys: interleave freely
//! - Dropped caller: settlement and refresh still complete, lock released
//! - Events: every transition is broadcast in order

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cf_campaign_client::{
        ActionKey, ActionKind, ActionPhase, CampaignClientApi, CampaignClientConfig,
        CampaignClientError, CampaignId, InMemoryLedger,
    };
    use tokio::time::{sleep, timeout};

    use crate::integration::{client_for, eth, funded_ledger, TestClient, BACKER};

    const SETTLEMENT_DELAY: Duration = Duration::from_millis(50);

    /// Two active campaigns, `BACKER` connected, slow settlement.
    async fn slow_setup() -> (Arc<InMemoryLedger>, Arc<TestClient>) {
        let ledger =
            funded_ledger(InMemoryLedger::new().with_settlement_delay(SETTLEMENT_DELAY));
        let client = client_for(&ledger, CampaignClientConfig::for_testing());
        client.create_campaign("Alpha", "5", "10").await.unwrap();
        client.create_campaign("Beta", "5", "10").await.unwrap();
        ledger.set_identity(Some(BACKER));
        client.refresh().await.unwrap();
        (ledger, client)
    }

    async fn wait_for_phase(client: &TestClient, key: ActionKey, phase: ActionPhase) {
        timeout(Duration::from_secs(2), async {
            while client.action_phase(key) != phase {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("phase not reached");
    }

    fn contribute_key(index: u64) -> ActionKey {
        ActionKey::campaign(CampaignId(index), ActionKind::Contribute)
    }

    #[tokio::test]
    async fn test_same_key_is_rejected_while_in_flight() {
        let (ledger, client) = slow_setup().await;
        let key = contribute_key(0);

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.contribute(CampaignId(0), "1").await })
        };
        wait_for_phase(&client, key, ActionPhase::AwaitingSettlement).await;

        let second = client.contribute(CampaignId(0), "2").await;
        assert_eq!(second, Err(CampaignClientError::ActionAlreadyInFlight(key)));

        first.await.unwrap().unwrap();
        assert_eq!(client.action_phase(key), ActionPhase::Idle);
        assert_eq!(client.view(CampaignId(0)).unwrap().contribution, eth("1"));
        assert_eq!(ledger.balance_of(BACKER), eth("9"));
    }

    #[tokio::test]
    async fn test_different_keys_interleave() {
        let (ledger, client) = slow_setup().await;

        let (a, b) = tokio::join!(
            client.contribute(CampaignId(0), "1"),
            client.contribute(CampaignId(1), "2"),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(client.view(CampaignId(0)).unwrap().raised, eth("1"));
        assert_eq!(client.view(CampaignId(1)).unwrap().raised, eth("2"));
        assert_eq!(ledger.balance_of(BACKER), eth("7"));
    }

    #[tokio::test]
    async fn test_different_kinds_on_one_campaign_do_not_contend() {
        let (ledger, client) = slow_setup().await;
        let contribute = contribute_key(0);

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.contribute(CampaignId(0), "1").await })
        };
        wait_for_phase(&client, contribute, ActionPhase::AwaitingSettlement).await;

        // Finalize takes its own lock and fails on the lifecycle table instead
        let err = client.finalize(CampaignId(0)).await.unwrap_err();
        assert!(matches!(err, CampaignClientError::Validation(_)));

        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_settlement() {
        let (ledger, client) = slow_setup().await;
        let key = contribute_key(1);

        let caller = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.contribute(CampaignId(1), "3").await })
        };
        wait_for_phase(&client, key, ActionPhase::AwaitingSettlement).await;
        caller.abort();

        // Still held until the detached settlement finishes
        assert!(client.orchestrator().locks().is_held(key));
        wait_for_phase(&client, key, ActionPhase::Idle).await;

        assert_eq!(ledger.balance_of(BACKER), eth("7"));
        assert_eq!(client.view(CampaignId(1)).unwrap().contribution, eth("3"));
    }

    #[tokio::test]
    async fn test_events_trace_every_transition() {
        let (ledger, client) = slow_setup().await;
        let key = contribute_key(0);
        let mut events = client.subscribe();

        let outcome = client.contribute(CampaignId(0), "0.25").await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event.key == key {
                seen.push(event);
            }
        }
        let phases: Vec<ActionPhase> = seen.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                ActionPhase::Submitting,
                ActionPhase::AwaitingSettlement,
                ActionPhase::Succeeded
            ]
        );
        assert_eq!(seen[1].tx_hash, Some(outcome.settlement.tx_hash));
        assert!(seen.iter().all(|e| e.error.is_none()));
    }

    #[tokio::test]
    async fn test_failed_settlement_event_carries_reason() {
        let (ledger, client) = slow_setup().await;
        let key = contribute_key(0);
        let mut events = client.subscribe();

        // Deadline passes on the ledger while the write is in flight
        let action = client.contribute(CampaignId(0), "1");
        let advance = async {
            wait_for_phase(&client, key, ActionPhase::AwaitingSettlement).await;
            ledger.advance_time(3_600);
        };
        let (result, ()) = tokio::join!(action, advance);

        assert_eq!(
            result,
            Err(CampaignClientError::Rejected(
                "execution reverted: Deadline passed".to_string()
            ))
        );
        let last = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| e.key == key)
            .last()
            .unwrap();
        assert_eq!(last.phase, ActionPhase::Failed);
        assert_eq!(
            last.error.as_deref(),
            Some("Rejected: execution reverted: Deadline passed")
        );
        assert_eq!(ledger.balance_of(BACKER), eth("10"));
    }
}
