//! Voting flow.
//!
//! An in-memory, process-lifetime ledger makes repeat votes within one
//! session a no-op. This guard is UX only: it resets on restart and never
//! consults the stored `votedBy` field, so it does not prevent the same
//! user from voting again later.

use crate::domain::{MatchRepository, SessionContext};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Session-scoped record of which (user, match) pairs already voted.
#[derive(Debug, Default)]
pub struct VoteLedger {
    voted: Mutex<HashSet<(String, Uuid)>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, user_id: &str, match_id: Uuid) -> bool {
        self.lock().contains(&(user_id.to_string(), match_id))
    }

    /// Marks the pair as voted; false when already marked.
    fn try_mark(&self, user_id: &str, match_id: Uuid) -> bool {
        self.lock().insert((user_id.to_string(), match_id))
    }

    fn unmark(&self, user_id: &str, match_id: Uuid) {
        self.lock().remove(&(user_id.to_string(), match_id));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<(String, Uuid)>> {
        self.voted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The increment went through; carries the new count.
    Applied { votes: u64 },
    /// Session guard hit: nothing was issued to the store.
    AlreadyVoted,
    /// Store or user context not ready: nothing was issued.
    NotReady,
    /// The increment failed; the guard was rolled back so a retry works.
    Failed,
}

impl VoteOutcome {
    pub fn success(&self) -> bool {
        matches!(self, VoteOutcome::Applied { .. })
    }

    pub fn new_votes(&self) -> Option<u64> {
        match self {
            VoteOutcome::Applied { votes } => Some(*votes),
            _ => None,
        }
    }
}

/// Applies the at-most-once-per-session guard, then issues a single
/// atomic increment. The mark is optimistic and rolled back on failure.
pub async fn cast_vote(
    repo: &dyn MatchRepository,
    ledger: &VoteLedger,
    ctx: &SessionContext,
    match_id: Uuid,
) -> VoteOutcome {
    if !ctx.store_ready || ctx.user_id.is_empty() {
        return VoteOutcome::NotReady;
    }
    if !ledger.try_mark(&ctx.user_id, match_id) {
        return VoteOutcome::AlreadyVoted;
    }

    match repo.increment_vote(match_id).await {
        Ok(votes) => {
            tracing::debug!(%match_id, votes, user = %ctx.user_id, "Vote applied");
            VoteOutcome::Applied { votes }
        }
        Err(e) => {
            tracing::warn!(%match_id, error = %e, "Failed to record vote; releasing session guard");
            ledger.unmark(&ctx.user_id, match_id);
            VoteOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryRepository;

    fn ctx() -> SessionContext {
        SessionContext {
            user_id: "user-1".to_string(),
            store_ready: true,
        }
    }

    #[tokio::test]
    async fn double_vote_issues_exactly_one_increment() {
        let repo = MemoryRepository::ready();
        let id = repo.seed_match("celebrity", 1);
        let ledger = VoteLedger::new();

        let first = cast_vote(&repo, &ledger, &ctx(), id).await;
        let second = cast_vote(&repo, &ledger, &ctx(), id).await;

        assert_eq!(first, VoteOutcome::Applied { votes: 2 });
        assert_eq!(second, VoteOutcome::AlreadyVoted);
        assert_eq!(repo.vote_calls(), 1);
    }

    #[tokio::test]
    async fn failed_vote_rolls_back_the_guard() {
        let repo = MemoryRepository::ready();
        let id = repo.seed_match("celebrity", 5);
        let ledger = VoteLedger::new();

        repo.fail_votes();
        assert_eq!(cast_vote(&repo, &ledger, &ctx(), id).await, VoteOutcome::Failed);
        assert!(!ledger.has_voted("user-1", id));

        repo.recover_votes();
        assert_eq!(
            cast_vote(&repo, &ledger, &ctx(), id).await,
            VoteOutcome::Applied { votes: 6 }
        );
        assert_eq!(repo.vote_calls(), 2);
    }

    #[tokio::test]
    async fn unready_context_is_a_no_op() {
        let repo = MemoryRepository::ready();
        let id = repo.seed_match("celebrity", 1);
        let ledger = VoteLedger::new();

        let outcome = cast_vote(
            &repo,
            &ledger,
            &SessionContext {
                user_id: "user-1".to_string(),
                store_ready: false,
            },
            id,
        )
        .await;

        assert_eq!(outcome, VoteOutcome::NotReady);
        assert!(!ledger.has_voted("user-1", id));
        assert_eq!(repo.vote_calls(), 0);
    }

    #[tokio::test]
    async fn distinct_users_vote_independently() {
        let repo = MemoryRepository::ready();
        let id = repo.seed_match("celebrity", 1);
        let ledger = VoteLedger::new();

        let first = cast_vote(&repo, &ledger, &ctx(), id).await;
        let second = cast_vote(
            &repo,
            &ledger,
            &SessionContext {
                user_id: "user-2".to_string(),
                store_ready: true,
            },
            id,
        )
        .await;

        assert_eq!(first, VoteOutcome::Applied { votes: 2 });
        assert_eq!(second, VoteOutcome::Applied { votes: 3 });
    }

    #[tokio::test]
    async fn vote_counts_never_decrease() {
        let repo = MemoryRepository::ready();
        let id = repo.seed_match("celebrity", 1);
        let ledger = VoteLedger::new();

        let mut last = 1;
        for n in 0..5 {
            let user = SessionContext {
                user_id: format!("user-{}", n),
                store_ready: true,
            };
            if let VoteOutcome::Applied { votes } = cast_vote(&repo, &ledger, &user, id).await {
                assert!(votes > last);
                last = votes;
            } else {
                panic!("vote unexpectedly rejected");
            }
        }
        assert_eq!(last, 6);
    }
}
