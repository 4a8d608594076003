//! # Domain Errors
//!
//! Error taxonomy for the campaign client.
//!
//! | Error | Resolved | Retryable |
//! |-------|----------|-----------|
//! | `NotConnected` | client-side | after connecting |
//! | `Validation` | client-side | no |
//! | `ActionAlreadyInFlight` | client-side | once the action settles |
//! | `Gateway` | remote infrastructure | yes |
//! | `Rejected` | remote collaborator | no |

use super::value_objects::{ActionKey, ActionKind, CampaignId, Phase};
use thiserror::Error;

/// Failure reported by a ledger gateway port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Transient infrastructure failure (transport, node, decoding).
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Write explicitly refused by the ledger (reverted, precondition failed).
    #[error("Rejected by ledger: {0}")]
    Rejected(String),
}

/// Locally detectable malformed input or lifecycle violation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty amount string.
    #[error("Amount is empty")]
    EmptyAmount,

    /// Amount string is not a non-negative decimal number.
    #[error("Malformed amount: {0}")]
    MalformedAmount(String),

    /// Amount parsed to zero.
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// Campaign title empty after trimming.
    #[error("Title must not be empty")]
    EmptyTitle,

    /// Campaign goal parsed to zero.
    #[error("Goal must be positive")]
    NonPositiveGoal,

    /// Duration string is not a decimal number of minutes.
    #[error("Malformed duration: {0}")]
    MalformedDuration(String),

    /// Duration rounds down to zero seconds.
    #[error("Duration must be positive")]
    NonPositiveDuration,

    /// Campaign index is not in the cached snapshot.
    #[error("Campaign {0} is not in the current snapshot")]
    UnknownCampaign(CampaignId),

    /// The lifecycle table forbids the action in this phase.
    #[error("Cannot {action} while campaign is {phase}")]
    NotPermitted {
        /// Attempted action
        action: ActionKind,
        /// Phase at validation time
        phase: Phase,
    },

    /// Refund requested with no recorded contribution.
    #[error("Nothing to refund: no contribution recorded for this account")]
    NothingToRefund,
}

/// Error surfaced by the campaign client to the presentation layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CampaignClientError {
    /// No identity available from the identity provider.
    #[error("Not connected: no account available")]
    NotConnected,

    /// Input or lifecycle validation failed before contacting the gateway.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Another action holds the same lock key.
    #[error("Action already in flight: {0}")]
    ActionAlreadyInFlight(ActionKey),

    /// Transient infrastructure failure on read or write.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Write refused by the ledger.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<LedgerError> for CampaignClientError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Gateway(msg) => CampaignClientError::Gateway(msg),
            LedgerError::Rejected(msg) => CampaignClientError::Rejected(msg),
        }
    }
}

impl CampaignClientError {
    /// Only infrastructure failures are worth retrying. Writes are never
    /// retried automatically regardless.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CampaignClientError::Gateway(_))
    }

    /// Stable label for user-facing messaging.
    pub fn category(&self) -> &'static str {
        match self {
            CampaignClientError::NotConnected => "not-connected",
            CampaignClientError::Validation(_) => "validation",
            CampaignClientError::ActionAlreadyInFlight(_) => "busy",
            CampaignClientError::Gateway(_) => "gateway",
            CampaignClientError::Rejected(_) => "rejected",
        }
    }
}
