use crate::errors::{RepoError, SimilarityError};
use crate::models::{InlineImage, MatchRecord, NewMatch, SimilarityMatch};
use async_trait::async_trait;
use uuid::Uuid;

/// Cap on records returned by an unfiltered or theme-filtered listing.
pub const LIST_CAP: usize = 50;

/// Per-request identity and readiness context, injected into each flow's
/// entry point rather than read from ambient global state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub store_ready: bool,
}

/// Trait defining operations against the hosted match collection.
#[async_trait]
pub trait MatchRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Lists up to [`LIST_CAP`] match records, optionally restricted to one
    /// theme. No ordering guarantee with respect to votes.
    async fn list(&self, theme_id: Option<&str>) -> Result<Vec<MatchRecord>, RepoError>;

    /// Lists the `limit` most recent matches, ordered by timestamp
    /// descending.
    async fn list_recent(&self, limit: usize) -> Result<Vec<MatchRecord>, RepoError>;

    /// Persists a new match, assigning id, votes (= 1, the creator's
    /// implicit vote), votedBy and timestamp at write time. Fails with
    /// [`RepoError::Unready`] before the store bootstrap completes.
    async fn create(&self, new_match: NewMatch) -> Result<MatchRecord, RepoError>;

    /// Atomically increments a match's vote counter and returns the new
    /// count. Never reads-then-writes.
    async fn increment_vote(&self, id: Uuid) -> Result<u64, RepoError>;
}

/// Trait defining the opaque similarity boundary: one image plus a theme's
/// prompt and system instruction in, a structured match guess out.
#[async_trait]
pub trait SimilarityAnalyzer: Send + Sync + 'static {
    async fn analyze(
        &self,
        image: &InlineImage,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<SimilarityMatch, SimilarityError>;
}
