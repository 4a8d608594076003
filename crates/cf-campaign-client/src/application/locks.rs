//! # Action Locks
//!
//! Process-local set of in-flight action keys. A key is held by exactly one
//! [`ActionLockGuard`]; dropping the guard releases it on every exit path,
//! including early returns and panics inside a settlement task.

use crate::domain::{ActionKey, ActionPhase, CampaignClientError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-flight action registry.
#[derive(Debug, Default)]
pub struct ActionLocks {
    held: Mutex<HashMap<ActionKey, ActionPhase>>,
}

impl ActionLocks {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the lock for `key`, entering `Submitting`.
    ///
    /// Fails with `ActionAlreadyInFlight` when the key is held. There is no
    /// queueing.
    pub fn try_acquire(
        self: &Arc<Self>,
        key: ActionKey,
    ) -> Result<ActionLockGuard, CampaignClientError> {
        let mut held = self.held.lock();
        if held.contains_key(&key) {
            return Err(CampaignClientError::ActionAlreadyInFlight(key));
        }
        held.insert(key, ActionPhase::Submitting);
        debug!(action = %key, "Lock acquired");

        Ok(ActionLockGuard {
            locks: Arc::clone(self),
            key,
        })
    }

    /// Phase of `key`, `Idle` when not held.
    pub fn phase(&self, key: ActionKey) -> ActionPhase {
        self.held
            .lock()
            .get(&key)
            .copied()
            .unwrap_or(ActionPhase::Idle)
    }

    /// Whether `key` is held.
    pub fn is_held(&self, key: ActionKey) -> bool {
        self.held.lock().contains_key(&key)
    }

    /// Number of held keys.
    pub fn in_flight(&self) -> usize {
        self.held.lock().len()
    }

    fn set_phase(&self, key: ActionKey, phase: ActionPhase) {
        if let Some(slot) = self.held.lock().get_mut(&key) {
            *slot = phase;
        }
    }

    fn release(&self, key: ActionKey) {
        self.held.lock().remove(&key);
        debug!(action = %key, "Lock released");
    }
}

/// Ownership token for one action key.
#[derive(Debug)]
pub struct ActionLockGuard {
    locks: Arc<ActionLocks>,
    key: ActionKey,
}

impl ActionLockGuard {
    /// Key this guard holds.
    pub fn key(&self) -> ActionKey {
        self.key
    }

    /// Record the phase of the held action.
    pub fn set_phase(&self, phase: ActionPhase) {
        self.locks.set_phase(self.key, phase);
    }
}

impl Drop for ActionLockGuard {
    fn drop(&mut self) {
        self.locks.release(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKind, CampaignId};

    fn key(index: u64, kind: ActionKind) -> ActionKey {
        ActionKey::campaign(CampaignId(index), kind)
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let locks = ActionLocks::new();
        let _guard = locks.try_acquire(key(3, ActionKind::Contribute)).unwrap();

        assert_eq!(
            locks.try_acquire(key(3, ActionKind::Contribute)).unwrap_err(),
            CampaignClientError::ActionAlreadyInFlight(key(3, ActionKind::Contribute))
        );
    }

    #[test]
    fn test_different_keys_do_not_contend() {
        let locks = ActionLocks::new();
        let _a = locks.try_acquire(key(3, ActionKind::Contribute)).unwrap();
        let _b = locks.try_acquire(key(3, ActionKind::Finalize)).unwrap();
        let _c = locks.try_acquire(key(4, ActionKind::Contribute)).unwrap();
        let _d = locks.try_acquire(ActionKey::creation()).unwrap();
        assert_eq!(locks.in_flight(), 4);
    }

    #[test]
    fn test_drop_releases() {
        let locks = ActionLocks::new();
        let k = key(1, ActionKind::Finalize);
        {
            let guard = locks.try_acquire(k).unwrap();
            guard.set_phase(ActionPhase::AwaitingSettlement);
            assert_eq!(locks.phase(k), ActionPhase::AwaitingSettlement);
        }
        assert!(!locks.is_held(k));
        assert_eq!(locks.phase(k), ActionPhase::Idle);
        assert!(locks.try_acquire(k).is_ok());
    }

    #[test]
    fn test_acquire_enters_submitting() {
        let locks = ActionLocks::new();
        let k = key(0, ActionKind::ClaimRefund);
        let _guard = locks.try_acquire(k).unwrap();
        assert_eq!(locks.phase(k), ActionPhase::Submitting);
    }
}
