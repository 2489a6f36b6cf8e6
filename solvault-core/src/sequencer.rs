//! Round sequencing: which operation is legal at which round.
//!
//! The round index lives in process memory only. Execution requests hold a
//! [`RoundGuard`] from branch selection until the transaction is built, so
//! exactly one request owns any given round. Readers see the last committed
//! index without waiting on the guard.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

/// Every tenth upcoming round offers a partial payout.
pub const PAYOUT_PERIOD: u64 = 10;

/// Upcoming round at which the partial payout is replaced by the full payout.
pub const FINAL_ROUND: u64 = 100;

/// Index at which a plain execution request pays out the whole vault.
pub const FULL_PAYOUT_INDEX: u64 = FINAL_ROUND - 1;

/// Index at which the reset offer is shown.
pub const RESET_OFFER_INDEX: u64 = 2;

/// Number of distinct round icons.
pub const ICON_COUNT: u64 = 100;

/// The operation an execution request resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    /// Deposit into the vault, initializing it first if needed.
    Deposit,
    /// Pay half of the vault to the selected contributor.
    PartialPayout,
    /// Pay the whole vault to the selected contributor.
    FullPayout,
    /// Reset the round counter; no transaction.
    Reset,
}

impl Branch {
    /// Whether this branch builds a transaction and advances the round.
    pub fn advances_round(&self) -> bool {
        !matches!(self, Branch::Reset)
    }
}

/// Pick the execution branch for a request observed at `index`.
pub fn select_branch(index: u64, distribute: bool, reset: bool) -> Branch {
    if reset {
        Branch::Reset
    } else if distribute {
        Branch::PartialPayout
    } else if index == FULL_PAYOUT_INDEX {
        Branch::FullPayout
    } else {
        Branch::Deposit
    }
}

/// Whether discovery at `index` offers the deposit-and-distribute trio.
pub fn offers_distribute(index: u64) -> bool {
    let upcoming = index + 1;
    upcoming % PAYOUT_PERIOD == 0 && upcoming != FINAL_ROUND
}

/// Whether discovery at `index` offers the reset action.
pub fn offers_reset(index: u64) -> bool {
    index == RESET_OFFER_INDEX
}

/// 1-based icon number for `index`.
pub fn icon_number(index: u64) -> u64 {
    (index % ICON_COUNT) + 1
}

/// Process-wide round counter.
#[derive(Debug, Default)]
pub struct RoundSequencer {
    /// Writer lock; held by at most one execution request.
    index: Mutex<u64>,
    /// Last committed index, published on advance and reset.
    committed: AtomicU64,
}

impl RoundSequencer {
    pub fn new() -> Self {
        Self::with_index(0)
    }

    /// Start at a given index.
    pub fn with_index(index: u64) -> Self {
        Self {
            index: Mutex::new(index),
            committed: AtomicU64::new(index),
        }
    }

    /// Last committed index. Never waits on an in-flight execution.
    pub fn current_index(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// Take exclusive ownership of the current round.
    pub async fn begin(&self) -> RoundGuard<'_> {
        RoundGuard {
            index: self.index.lock().await,
            committed: &self.committed,
        }
    }
}

/// Exclusive handle on the round counter for one execution request.
///
/// Dropping the guard without calling [`advance`](Self::advance) or
/// [`reset`](Self::reset) leaves the index untouched.
pub struct RoundGuard<'a> {
    index: MutexGuard<'a, u64>,
    committed: &'a AtomicU64,
}

impl RoundGuard<'_> {
    pub fn index(&self) -> u64 {
        *self.index
    }

    /// Move to the next round. Returns the new index.
    pub fn advance(mut self) -> u64 {
        *self.index += 1;
        self.committed.store(*self.index, Ordering::Release);
        *self.index
    }

    /// Reset the round to 0.
    pub fn reset(mut self) {
        *self.index = 0;
        self.committed.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_distribute_offer_schedule() {
        for index in 0..300u64 {
            let expected = (index + 1) % 10 == 0 && index + 1 != 100;
            assert_eq!(offers_distribute(index), expected, "index {}", index);
        }
        assert!(offers_distribute(9));
        assert!(offers_distribute(89));
        assert!(!offers_distribute(99));
        assert!(offers_distribute(109));
    }

    #[test]
    fn test_reset_offer_only_at_two() {
        assert!(offers_reset(2));
        assert!(!offers_reset(1));
        assert!(!offers_reset(102));
    }

    #[test]
    fn test_branch_precedence() {
        assert_eq!(select_branch(99, true, true), Branch::Reset);
        assert_eq!(select_branch(99, true, false), Branch::PartialPayout);
        assert_eq!(select_branch(99, false, false), Branch::FullPayout);
        assert_eq!(select_branch(98, false, false), Branch::Deposit);
        assert_eq!(select_branch(199, false, false), Branch::Deposit);
        assert_eq!(select_branch(0, false, false), Branch::Deposit);
    }

    #[test]
    fn test_only_reset_keeps_round() {
        assert!(!Branch::Reset.advances_round());
        assert!(Branch::Deposit.advances_round());
        assert!(Branch::PartialPayout.advances_round());
        assert!(Branch::FullPayout.advances_round());
    }

    #[test]
    fn test_icon_wraps() {
        assert_eq!(icon_number(0), 1);
        assert_eq!(icon_number(99), 100);
        assert_eq!(icon_number(100), 1);
    }

    #[tokio::test]
    async fn test_advance_and_reset() {
        let seq = RoundSequencer::with_index(41);
        assert_eq!(seq.begin().await.advance(), 42);
        assert_eq!(seq.current_index(), 42);
        seq.begin().await.reset();
        assert_eq!(seq.current_index(), 0);
    }

    #[tokio::test]
    async fn test_dropped_guard_keeps_index() {
        let seq = RoundSequencer::with_index(7);
        {
            let guard = seq.begin().await;
            assert_eq!(guard.index(), 7);
        }
        assert_eq!(seq.current_index(), 7);
    }

    #[tokio::test]
    async fn test_readers_see_committed_index_while_round_is_owned() {
        let seq = RoundSequencer::with_index(3);
        let guard = seq.begin().await;
        assert_eq!(seq.current_index(), 3);
        assert_eq!(guard.advance(), 4);
        assert_eq!(seq.current_index(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_rounds_are_distinct() {
        let seq = Arc::new(RoundSequencer::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let seq = seq.clone();
            handles.push(tokio::spawn(async move {
                let guard = seq.begin().await;
                let owned = guard.index();
                tokio::task::yield_now().await;
                guard.advance();
                owned
            }));
        }
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<u64>>());
        assert_eq!(seq.current_index(), 50);
    }
}
