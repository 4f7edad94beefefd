use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a match record came to exist; fixes which optional fields are set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    AiGenerated,
    UserSuggested,
}

/// A stored look-alike submission. The only persisted entity.
///
/// Field names follow the public collection's document schema.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: Uuid,
    pub theme_id: String,
    pub theme_name: String,
    pub celebrity_name: String,
    /// Free-text rationale, AI-generated or user-entered.
    pub analysis: String,
    pub match_type: MatchType,
    /// The uploaded "double" photo, inline base64.
    pub user_image_base64: String,
    /// Present only for user-suggested matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub famous_image_base64: Option<String>,
    /// Present only for user-suggested matches. Order is preserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<Vec<String>>,
    pub votes: u64,
    pub voted_by: Vec<String>,
    pub creator_id: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
}

/// Input to `MatchRepository::create`. The store assigns id, votes,
/// votedBy and timestamp at write time.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub theme_id: String,
    pub theme_name: String,
    pub celebrity_name: String,
    pub analysis: String,
    pub match_type: MatchType,
    pub user_image_base64: String,
    pub famous_image_base64: Option<String>,
    pub custom_tags: Option<Vec<String>>,
    pub creator_id: String,
}

/// An inline image payload as sent to the similarity endpoint and stored
/// on match records.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub data_base64: String,
    pub mime_type: String,
}

/// Structured result parsed out of the similarity endpoint's free-text
/// answer. `celebrity_match` is best-effort; callers must tolerate noisy
/// output when the model's phrasing is unrecognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityMatch {
    pub celebrity_match: String,
    pub analysis: String,
}
