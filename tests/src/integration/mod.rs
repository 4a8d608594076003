//! # Integration Tests
//!
//! `CampaignClient` wired to `InMemoryLedger`, which also serves as the
//! clock unless a test needs the two clocks to disagree.

pub mod concurrency;
pub mod flows;

use std::sync::Arc;

use cf_campaign_client::{
    parse_ether, Address, Amount, CampaignClient, CampaignClientConfig, Clock, InMemoryLedger,
};

/// Campaign creator.
pub const CREATOR: Address = Address::repeat_byte(0xC1);
/// First backer.
pub const BACKER: Address = Address::repeat_byte(0xB1);
/// Second backer.
pub const OTHER_BACKER: Address = Address::repeat_byte(0xB2);

/// Client over an in-memory ledger.
pub type TestClient = CampaignClient<InMemoryLedger>;

/// `text` ETH in wei.
pub fn eth(text: &str) -> Amount {
    parse_ether(text).unwrap()
}

/// Funded ledger with `CREATOR` connected.
pub fn funded_ledger(ledger: InMemoryLedger) -> Arc<InMemoryLedger> {
    let ledger = Arc::new(ledger);
    for account in [CREATOR, BACKER, OTHER_BACKER] {
        ledger.fund(account, eth("10"));
    }
    ledger.set_identity(Some(CREATOR));
    ledger
}

/// Client sharing the ledger's clock.
pub fn client_for(ledger: &Arc<InMemoryLedger>, config: CampaignClientConfig) -> Arc<TestClient> {
    let clock: Arc<dyn Clock> = ledger.clone();
    Arc::new(CampaignClient::new(config, Arc::clone(ledger), clock).unwrap())
}

/// Ledger plus client with default test config.
pub fn setup() -> (Arc<InMemoryLedger>, Arc<TestClient>) {
    let ledger = funded_ledger(InMemoryLedger::new());
    let client = client_for(&ledger, CampaignClientConfig::for_testing());
    (ledger, client)
}
