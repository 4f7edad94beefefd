//! Live view plumbing.
//!
//! Writes publish a change event onto a process-wide broadcast feed; each
//! live view holds its own receiver and re-derives a fresh snapshot of
//! its record set per event. Dropping a receiver releases the
//! subscription, so stream lifetime is owned by the consuming view.

use crate::domain::MatchRepository;
use crate::errors::RepoError;
use crate::leaderboard::RECENT_LIMIT;
use crate::models::MatchRecord;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 64;

/// A store write worth re-deriving views for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    MatchCreated,
    VoteRecorded,
}

/// Process-wide fan-out of store change events.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StoreEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publishes a change. Having no live subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Which record-set snapshot a live subscription serves.
#[derive(Debug, Clone)]
pub enum LiveView {
    /// The browse list, optionally restricted to one theme.
    Matches { theme_id: Option<String> },
    /// The most-recent ranking.
    Recent,
}

/// Fetches the current snapshot for a view. Each subscription calls this
/// independently; a failure here belongs to that subscription alone.
pub async fn fetch_view(
    repo: &dyn MatchRepository,
    view: &LiveView,
) -> Result<Vec<MatchRecord>, RepoError> {
    match view {
        LiveView::Matches { theme_id } => repo.list(theme_id.as_deref()).await,
        LiveView::Recent => repo.list_recent(RECENT_LIMIT).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryRepository;

    #[tokio::test]
    async fn events_reach_subscribers() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(StoreEvent::MatchCreated);
        feed.publish(StoreEvent::VoteRecorded);

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::MatchCreated);
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::VoteRecorded);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::new();
        feed.publish(StoreEvent::MatchCreated);
    }

    #[tokio::test]
    async fn views_fetch_their_own_snapshots() {
        let repo = MemoryRepository::ready();
        repo.seed_match("celebrity", 3);
        repo.seed_match("cartoon", 7);

        let all = fetch_view(&repo, &LiveView::Matches { theme_id: None })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filtered = fetch_view(
            &repo,
            &LiveView::Matches {
                theme_id: Some("cartoon".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].theme_id, "cartoon");

        let recent = fetch_view(&repo, &LiveView::Recent).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
