//! # Crowdfund Campaign Client
//!
//! Client for a ledger-hosted crowdfunding contract: discover campaigns, fund
//! them, finalize them and claim refunds.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! The client holds no campaign state of its own. It reads the ledger into
//! immutable snapshots, derives each campaign's phase from the wall clock and
//! drives writes through a latent, fallible gateway without ever submitting
//! an action it can prove invalid locally.
//!
//! ## Lifecycle
//!
//! | Phase | contribute | finalize | claim refund |
//! |-------|------------|----------|--------------|
//! | Active | yes | no | no |
//! | AwaitingFinalization | no | yes | no |
//! | FinalizedSuccessful | no | no | no |
//! | FinalizedFailed | no | no | if contribution > 0 |
//!
//! ## Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | No torn reads | Snapshots replaced whole, behind a generation guard |
//! | One action per key | `ActionLocks` ownership token, no queueing |
//! | Settlement not cancellable | Settlement task owns the lock guard |
//! | Fresh state after writes | Refresh before the action returns |
//!
//! ## Module Structure
//!
//! ```text
//! cf-campaign-client/
//! ├── domain/          # Campaign, snapshot, phases, action keys, errors
//! ├── algorithms/      # Lifecycle engine, amount parsing
//! ├── ports/           # API trait (inbound) + ledger/clock traits (outbound)
//! ├── adapters/        # JSON-RPC gateway, ABI codec, in-memory ledger
//! ├── application/     # Repository, locks, orchestrator, view models, service
//! └── config.rs        # CampaignClientConfig, JsonRpcConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{AbiError, InMemoryLedger, JsonRpcLedgerGateway};
pub use algorithms::{
    check_action, format_ether, format_units, parse_duration_minutes, parse_ether,
    parse_positive_units, parse_units, permitted_actions, phase_of, time_left,
};
pub use application::{
    build_views, ActionOrchestrator, CampaignClient, CampaignRepository, CampaignView,
    RefreshCounts,
};
pub use config::{CampaignClientConfig, ConfigError, JsonRpcConfig, RefreshStrategy};
pub use domain::{
    ActionEvent, ActionKey, ActionKind, ActionOutcome, ActionPhase, ActionSlot, Address, Amount,
    Balances, Campaign, CampaignClientError, CampaignEntry, CampaignId, CampaignSnapshot,
    ConnectionInfo, LedgerError, PendingWrite, PermittedActions, Phase, Settlement, Timestamp,
    TokenBalance, TxHash, ValidationError, NATIVE_DECIMALS, SEPOLIA_CHAIN_ID,
};
pub use ports::{
    BalanceReader, CampaignClientApi, Clock, IdentityProvider, LedgerGateway, LedgerReader,
    LedgerWriter, ManualClock, MockLedgerGateway, SystemClock, WriteBehavior,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
