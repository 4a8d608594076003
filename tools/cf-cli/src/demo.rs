//! Demo ledger with sample campaigns.
//!
//! Every invocation starts from the same seeded state. After seeding the
//! connected account is [`DEMO_USER`] and the campaigns are:
//!
//! | # | Title | State |
//! |---|-------|-------|
//! | 0 | Community garden | active, 7 days left |
//! | 1 | Street library | deadline passed, goal reached |
//! | 2 | Robotics club | finalized, goal missed (refundable) |
//! | 3 | Night market | active, 20 minutes left |

use cf_campaign_client::{
    parse_ether, Address, CampaignId, InMemoryLedger, LedgerWriter, PendingWrite,
};

/// Account the demo runs as.
pub const DEMO_USER: Address = Address::repeat_byte(0xD0);

const ALICE: Address = Address::repeat_byte(0xA1);
const BOB: Address = Address::repeat_byte(0xB0);

async fn settle(
    ledger: &InMemoryLedger,
    pending: Result<PendingWrite, cf_campaign_client::LedgerError>,
) -> anyhow::Result<()> {
    ledger.await_settlement(&pending?).await?;
    Ok(())
}

async fn create(
    ledger: &InMemoryLedger,
    creator: Address,
    title: &str,
    goal: &str,
    secs: u64,
) -> anyhow::Result<()> {
    ledger.set_identity(Some(creator));
    let pending = ledger
        .submit_create_campaign(title, parse_ether(goal)?, secs)
        .await;
    settle(ledger, pending).await
}

async fn contribute(
    ledger: &InMemoryLedger,
    from: Address,
    id: u64,
    amount: &str,
) -> anyhow::Result<()> {
    ledger.set_identity(Some(from));
    let pending = ledger
        .submit_contribute(CampaignId(id), parse_ether(amount)?)
        .await;
    settle(ledger, pending).await
}

/// Build the seeded ledger.
pub async fn seeded_ledger() -> anyhow::Result<InMemoryLedger> {
    let ledger = InMemoryLedger::new();
    for account in [ALICE, BOB, DEMO_USER] {
        ledger.fund(account, parse_ether("10")?);
    }

    create(&ledger, ALICE, "Community garden", "2", 7 * 24 * 3600).await?;
    create(&ledger, ALICE, "Street library", "1", 60).await?;
    create(&ledger, BOB, "Robotics club", "5", 120).await?;

    contribute(&ledger, DEMO_USER, 0, "0.5").await?;
    contribute(&ledger, BOB, 1, "0.6").await?;
    contribute(&ledger, DEMO_USER, 1, "0.6").await?;
    contribute(&ledger, DEMO_USER, 2, "0.3").await?;

    ledger.advance_time(300);
    ledger.set_identity(Some(BOB));
    let pending = ledger.submit_finalize(CampaignId(2)).await;
    settle(&ledger, pending).await?;

    create(&ledger, BOB, "Night market", "0.5", 20 * 60).await?;

    ledger.set_identity(Some(DEMO_USER));
    Ok(ledger)
}
