//! # Campaign Lifecycle Engine
//!
//! Pure decision logic: phase of a campaign at a given wall-clock time and
//! the actions the phase permits.
//!
//! | Phase | contribute | finalize | claim refund |
//! |-------|------------|----------|--------------|
//! | Active | yes | no | no |
//! | AwaitingFinalization | no | yes | no |
//! | FinalizedSuccessful | no | no | no |
//! | FinalizedFailed | no | no | if contribution > 0 |
//!
//! Time is the client's wall clock. It is never reconciled with the ledger's
//! clock, so near the deadline the client and the ledger can disagree.

use crate::domain::{
    ActionKind, Amount, Campaign, Phase, PermittedActions, Timestamp, ValidationError,
};

/// Phase of `campaign` at `now`.
///
/// `successful` is only consulted once `finalized` is set.
pub fn phase_of(campaign: &Campaign, now: Timestamp) -> Phase {
    match (campaign.finalized, campaign.successful) {
        (true, true) => Phase::FinalizedSuccessful,
        (true, false) => Phase::FinalizedFailed,
        (false, _) if now >= campaign.deadline => Phase::AwaitingFinalization,
        (false, _) => Phase::Active,
    }
}

/// Actions permitted for a caller with `contribution` in `phase`.
pub fn permitted_in_phase(phase: Phase, contribution: Amount) -> PermittedActions {
    match phase {
        Phase::Active => PermittedActions {
            contribute: true,
            ..PermittedActions::NONE
        },
        Phase::AwaitingFinalization => PermittedActions {
            finalize: true,
            ..PermittedActions::NONE
        },
        Phase::FinalizedSuccessful => PermittedActions::NONE,
        Phase::FinalizedFailed => PermittedActions {
            claim_refund: !contribution.is_zero(),
            ..PermittedActions::NONE
        },
    }
}

/// Actions permitted on `campaign` at `now` for a caller with `contribution`.
pub fn permitted_actions(
    campaign: &Campaign,
    contribution: Amount,
    now: Timestamp,
) -> PermittedActions {
    permitted_in_phase(phase_of(campaign, now), contribution)
}

/// Precondition check applied before any write.
///
/// Creation is not campaign-scoped and is always rejected here.
pub fn check_action(
    kind: ActionKind,
    campaign: &Campaign,
    contribution: Amount,
    now: Timestamp,
) -> Result<Phase, ValidationError> {
    let phase = phase_of(campaign, now);
    if permitted_in_phase(phase, contribution).allows(kind) {
        return Ok(phase);
    }
    if kind == ActionKind::ClaimRefund && phase == Phase::FinalizedFailed {
        return Err(ValidationError::NothingToRefund);
    }
    Err(ValidationError::NotPermitted {
        action: kind,
        phase,
    })
}

/// Seconds until the deadline, zero once it has passed.
pub fn time_left(campaign: &Campaign, now: Timestamp) -> u64 {
    campaign.deadline.saturating_sub(now)
}
