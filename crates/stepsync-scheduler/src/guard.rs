use std::sync::Arc;

use dashmap::DashSet;
use stepsync_core::AccountId;

/// Accounts with an execution currently in flight.
///
/// Shared by the clock (to skip busy accounts) and the manual execution
/// path, so both observe the same exclusion set. Different accounts never
/// contend with each other.
#[derive(Debug, Default)]
pub struct InFlight {
    running: DashSet<AccountId>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. Returns `None` if it is already running.
    pub fn try_acquire(self: &Arc<Self>, id: AccountId) -> Option<InFlightPermit> {
        if self.running.insert(id) {
            Some(InFlightPermit {
                set: Arc::clone(self),
                id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, id: AccountId) -> bool {
        self.running.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

/// Releases the account slot on drop.
#[derive(Debug)]
pub struct InFlightPermit {
    set: Arc<InFlight>,
    id: AccountId,
}

impl InFlightPermit {
    pub fn account_id(&self) -> AccountId {
        self.id
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.set.running.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_account_fails() {
        let guard = Arc::new(InFlight::new());
        let permit = guard.try_acquire(AccountId(1)).unwrap();
        assert!(guard.try_acquire(AccountId(1)).is_none());
        assert!(guard.is_running(AccountId(1)));
        assert_eq!(permit.account_id(), AccountId(1));
    }

    #[test]
    fn other_accounts_are_independent() {
        let guard = Arc::new(InFlight::new());
        let _a = guard.try_acquire(AccountId(1)).unwrap();
        let _b = guard.try_acquire(AccountId(2)).unwrap();
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn drop_releases_slot() {
        let guard = Arc::new(InFlight::new());
        drop(guard.try_acquire(AccountId(7)).unwrap());
        assert!(!guard.is_running(AccountId(7)));
        assert!(guard.try_acquire(AccountId(7)).is_some());
        assert!(guard.is_empty());
    }
}
