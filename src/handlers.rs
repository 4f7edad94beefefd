use crate::{
    AppState,
    domain::SessionContext,
    errors::AppError,
    leaderboard,
    models::{InlineImage, MatchRecord},
    submission::{self, AiSubmission, SuggestedSubmission},
    subscriptions::{LiveView, StoreEvent, fetch_view},
    voting,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Sse,
        sse::{Event, KeepAlive},
    },
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures::stream::{Stream, unfold};
use mime_guess;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing;
use uuid::Uuid;

/// Header carrying the caller's stable anonymous identity.
pub const USER_ID_HEADER: &str = "x-user-id";

fn session_context(state: &AppState, headers: &HeaderMap) -> Result<SessionContext, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing {} header", USER_ID_HEADER)))?
        .to_string();

    Ok(SessionContext {
        user_id,
        store_ready: state.store_ready(),
    })
}

/// Reads an uploaded file field into an inline base64 payload, falling
/// back to a filename-based content-type guess when the part carries none.
async fn read_image_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<InlineImage, AppError> {
    let filename = field.file_name().map(|name| name.to_string());
    let declared_type = field.content_type().map(|mime| mime.to_string());
    let bytes = field.bytes().await?;

    let mime_type = declared_type
        .or_else(|| {
            filename
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(|mime| mime.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(InlineImage {
        data_base64: BASE64.encode(&bytes),
        mime_type,
    })
}

// --- Submission handlers ---

pub async fn create_ai_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let ctx = session_context(&state, &headers)?;
    let mut theme_id = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "theme" => theme_id = Some(field.text().await?),
            "image" => image = Some(read_image_field(field).await?),
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let theme_id = theme_id.ok_or_else(|| AppError::MissingFormField("theme".to_string()))?;

    let record =
        submission::submit_ai_match(&*state.match_repo, &*state.analyzer, &ctx, AiSubmission {
            theme_id,
            image,
        })
        .await?;

    state.feed.publish(StoreEvent::MatchCreated);
    tracing::info!(match_id = %record.id, "AI match created via handler");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn create_suggested_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let ctx = session_context(&state, &headers)?;
    let mut theme_id = None;
    let mut famous_name = None;
    let mut description = None;
    let mut tags = None;
    let mut famous_image = None;
    let mut candidate_image = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "theme" => theme_id = Some(field.text().await?),
            "famous_name" => famous_name = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            "tags" => tags = Some(field.text().await?),
            "famous_image" => famous_image = Some(read_image_field(field).await?),
            "candidate_image" => candidate_image = Some(read_image_field(field).await?),
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let record = submission::submit_suggested_match(&*state.match_repo, &ctx, SuggestedSubmission {
        theme_id: theme_id.ok_or_else(|| AppError::MissingFormField("theme".to_string()))?,
        famous_name: famous_name
            .ok_or_else(|| AppError::MissingFormField("famous_name".to_string()))?,
        description: description
            .ok_or_else(|| AppError::MissingFormField("description".to_string()))?,
        tags: tags.ok_or_else(|| AppError::MissingFormField("tags".to_string()))?,
        famous_image,
        candidate_image,
    })
    .await?;

    state.feed.publish(StoreEvent::MatchCreated);
    tracing::info!(match_id = %record.id, "Suggested match created via handler");
    Ok((StatusCode::CREATED, Json(record)))
}

// --- Listing handlers ---

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    theme: Option<String>,
}

impl ListQuery {
    /// "all" and absent both mean unfiltered.
    fn theme_filter(self) -> Option<String> {
        self.theme.filter(|theme| theme != "all")
    }
}

pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MatchRecord>>, AppError> {
    let theme = query.theme_filter();
    let matches = state.match_repo.list(theme.as_deref()).await?;
    Ok(Json(matches))
}

pub async fn top_matches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MatchRecord>>, AppError> {
    let matches = state.match_repo.list(None).await?;
    Ok(Json(leaderboard::top_matches(matches)))
}

pub async fn recent_matches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MatchRecord>>, AppError> {
    let matches = state.match_repo.list_recent(leaderboard::RECENT_LIMIT).await?;
    Ok(Json(matches))
}

// --- Voting handler ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    success: bool,
    new_votes: Option<u64>,
}

/// Vote failures come back as `success: false`, not an error status.
pub async fn vote(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id_str): Path<String>,
) -> Result<Json<VoteResponse>, AppError> {
    let match_id = Uuid::parse_str(&id_str)?;
    let ctx = session_context(&state, &headers)?;

    let outcome = voting::cast_vote(&*state.match_repo, &state.ledger, &ctx, match_id).await;
    if outcome.success() {
        state.feed.publish(StoreEvent::VoteRecorded);
    }

    Ok(Json(VoteResponse {
        success: outcome.success(),
        new_votes: outcome.new_votes(),
    }))
}

// --- Readiness handler ---

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    ready: bool,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.store_ready(),
    })
}

// --- Live view handlers ---

pub async fn live_matches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let view = LiveView::Matches {
        theme_id: query.theme_filter(),
    };
    let stream = snapshot_stream(state.match_repo.clone(), state.feed.subscribe(), view);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn live_recent(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = snapshot_stream(
        state.match_repo.clone(),
        state.feed.subscribe(),
        LiveView::Recent,
    );
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::ListQuery;

    #[test]
    fn all_and_absent_both_mean_unfiltered() {
        assert_eq!(
            ListQuery {
                theme: Some("all".to_string())
            }
            .theme_filter(),
            None
        );
        assert_eq!(ListQuery { theme: None }.theme_filter(), None);
        assert_eq!(
            ListQuery {
                theme: Some("cartoon".to_string())
            }
            .theme_filter(),
            Some("cartoon".to_string())
        );
    }
}

enum FeedPhase {
    Initial,
    Waiting,
}

/// One live subscription: an initial snapshot, then a fresh snapshot per
/// store change. The receiver is dropped with the stream when the client
/// disconnects, releasing the subscription. A fetch failure is reported
/// on this stream only and the stream keeps serving.
fn snapshot_stream(
    repo: Arc<dyn crate::domain::MatchRepository>,
    rx: broadcast::Receiver<StoreEvent>,
    view: LiveView,
) -> impl Stream<Item = Result<Event, Infallible>> {
    unfold(
        (repo, rx, view, FeedPhase::Initial),
        |(repo, mut rx, view, phase)| async move {
            if matches!(phase, FeedPhase::Waiting) {
                loop {
                    match rx.recv().await {
                        Ok(_) => break,
                        // Fell behind the feed: resynchronize with a fresh snapshot.
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Live view lagged behind the change feed");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }

            let event = match fetch_view(&*repo, &view).await {
                Ok(records) => Event::default()
                    .event("snapshot")
                    .json_data(&records)
                    .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
                Err(e) => {
                    tracing::warn!(error = %e, "Live view snapshot fetch failed");
                    Event::default().event("error").data(e.to_string())
                }
            };

            Some((Ok(event), (repo, rx, view, FeedPhase::Waiting)))
        },
    )
}
