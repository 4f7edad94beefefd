//! Match submission flows.
//!
//! Two variants produce a match record: AI-assisted (one image, the
//! similarity client names the double) and user-suggested (two images
//! plus metadata, no AI call). Both end in `MatchRepository::create`.

use crate::domain::{MatchRepository, SessionContext, SimilarityAnalyzer};
use crate::errors::{RepoError, SubmissionError};
use crate::models::{InlineImage, MatchRecord, MatchType, NewMatch};
use crate::themes;

/// Input for the AI-assisted variant.
#[derive(Debug, Clone)]
pub struct AiSubmission {
    pub theme_id: String,
    pub image: Option<InlineImage>,
}

/// Input for the user-suggested variant. All five user inputs are
/// mandatory.
#[derive(Debug, Clone)]
pub struct SuggestedSubmission {
    pub theme_id: String,
    pub famous_name: String,
    pub description: String,
    /// Comma-separated; split and trimmed before storage.
    pub tags: String,
    pub famous_image: Option<InlineImage>,
    pub candidate_image: Option<InlineImage>,
}

/// Splits a comma-separated tag string, trimming each token and dropping
/// empty ones. Order is preserved.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn require_image(
    image: Option<InlineImage>,
    message: &str,
) -> Result<InlineImage, SubmissionError> {
    match image {
        Some(image) if !image.data_base64.is_empty() => Ok(image),
        _ => Err(SubmissionError::Validation(message.to_string())),
    }
}

fn require_text(value: &str, field: &str) -> Result<(), SubmissionError> {
    if value.trim().is_empty() {
        Err(SubmissionError::Validation(format!(
            "{} must not be empty",
            field
        )))
    } else {
        Ok(())
    }
}

fn ai_theme(theme_id: &str) -> Result<(&'static themes::Theme, &'static str, &'static str), SubmissionError> {
    let theme =
        themes::get(theme_id).ok_or_else(|| SubmissionError::UnknownTheme(theme_id.to_string()))?;
    match (theme.prompt, theme.system_instruction) {
        (Some(prompt), Some(system_instruction)) => Ok((theme, prompt, system_instruction)),
        _ => Err(SubmissionError::Validation(format!(
            "Theme '{}' is not open for submissions",
            theme_id
        ))),
    }
}

/// AI-assisted submission: exactly one image and a theme selection.
/// Readiness wins over missing input when both would apply.
pub async fn submit_ai_match(
    repo: &dyn MatchRepository,
    analyzer: &dyn SimilarityAnalyzer,
    ctx: &SessionContext,
    submission: AiSubmission,
) -> Result<MatchRecord, SubmissionError> {
    if !ctx.store_ready {
        return Err(SubmissionError::Store(RepoError::Unready));
    }
    let image = require_image(submission.image, "Please select an image.")?;
    let (theme, prompt, system_instruction) = ai_theme(&submission.theme_id)?;

    tracing::debug!(theme = %theme.id, user = %ctx.user_id, "Running similarity analysis");
    let similarity = analyzer.analyze(&image, prompt, system_instruction).await?;

    let record = repo
        .create(NewMatch {
            theme_id: theme.id.to_string(),
            theme_name: theme.name.to_string(),
            celebrity_name: similarity.celebrity_match,
            analysis: similarity.analysis,
            match_type: MatchType::AiGenerated,
            user_image_base64: image.data_base64,
            famous_image_base64: None,
            custom_tags: None,
            creator_id: ctx.user_id.clone(),
        })
        .await?;

    tracing::info!(match_id = %record.id, celebrity = %record.celebrity_name, "AI match created");
    Ok(record)
}

/// User-suggested submission: two images, a name, a description and tags,
/// all mandatory.
pub async fn submit_suggested_match(
    repo: &dyn MatchRepository,
    ctx: &SessionContext,
    submission: SuggestedSubmission,
) -> Result<MatchRecord, SubmissionError> {
    if !ctx.store_ready {
        return Err(SubmissionError::Store(RepoError::Unready));
    }
    let famous_image = require_image(submission.famous_image, "Please select a famous person photo.")?;
    let candidate_image =
        require_image(submission.candidate_image, "Please select a candidate double photo.")?;
    require_text(&submission.famous_name, "Famous person name")?;
    require_text(&submission.description, "Description")?;
    require_text(&submission.tags, "Tags")?;
    let (theme, _, _) = ai_theme(&submission.theme_id)?;

    let record = repo
        .create(NewMatch {
            theme_id: theme.id.to_string(),
            theme_name: theme.name.to_string(),
            celebrity_name: submission.famous_name,
            analysis: submission.description,
            match_type: MatchType::UserSuggested,
            user_image_base64: candidate_image.data_base64,
            famous_image_base64: Some(famous_image.data_base64),
            custom_tags: Some(parse_tags(&submission.tags)),
            creator_id: ctx.user_id.clone(),
        })
        .await?;

    tracing::info!(match_id = %record.id, celebrity = %record.celebrity_name, "Suggested match created");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SimilarityError;
    use crate::testutil::{MemoryRepository, StubAnalyzer};

    fn ctx() -> SessionContext {
        SessionContext {
            user_id: "user-1".to_string(),
            store_ready: true,
        }
    }

    fn image(data: &str) -> Option<InlineImage> {
        Some(InlineImage {
            data_base64: data.to_string(),
            mime_type: "image/jpeg".to_string(),
        })
    }

    fn suggestion() -> SuggestedSubmission {
        SuggestedSubmission {
            theme_id: "celebrity".to_string(),
            famous_name: "Jane Doe".to_string(),
            description: "Looks alike".to_string(),
            tags: "funny, sports".to_string(),
            famous_image: image("ZmFtb3Vz"),
            candidate_image: image("Y2FuZGlkYXRl"),
        }
    }

    #[test]
    fn tags_are_split_trimmed_and_pruned() {
        assert_eq!(parse_tags(" a, b ,, c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn tag_order_is_preserved() {
        assert_eq!(parse_tags("zebra,apple"), vec!["zebra", "apple"]);
    }

    #[tokio::test]
    async fn suggested_submission_round_trip() {
        let repo = MemoryRepository::ready();

        let record = submit_suggested_match(&repo, &ctx(), suggestion())
            .await
            .unwrap();

        assert_eq!(record.match_type, MatchType::UserSuggested);
        assert_eq!(record.celebrity_name, "Jane Doe");
        assert_eq!(record.analysis, "Looks alike");
        assert_eq!(
            record.custom_tags,
            Some(vec!["funny".to_string(), "sports".to_string()])
        );
        assert_eq!(record.votes, 1);
        assert_eq!(record.voted_by, vec!["user-1".to_string()]);
        assert_eq!(record.user_image_base64, "Y2FuZGlkYXRl");
        assert_eq!(record.famous_image_base64.as_deref(), Some("ZmFtb3Vz"));

        let stored = repo.records();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
    }

    #[tokio::test]
    async fn suggested_submission_requires_every_field() {
        let repo = MemoryRepository::ready();

        for broken in [
            SuggestedSubmission { famous_image: None, ..suggestion() },
            SuggestedSubmission { candidate_image: None, ..suggestion() },
            SuggestedSubmission { famous_name: "  ".to_string(), ..suggestion() },
            SuggestedSubmission { description: String::new(), ..suggestion() },
            SuggestedSubmission { tags: " ".to_string(), ..suggestion() },
        ] {
            let err = submit_suggested_match(&repo, &ctx(), broken).await.unwrap_err();
            assert!(matches!(err, SubmissionError::Validation(_)));
        }
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn ai_submission_round_trip() {
        let repo = MemoryRepository::ready();
        let analyzer = StubAnalyzer::answering("Keanu Reeves", "You look like Keanu Reeves.");

        let record = submit_ai_match(
            &repo,
            &analyzer,
            &ctx(),
            AiSubmission {
                theme_id: "celebrity".to_string(),
                image: image("aGVsbG8="),
            },
        )
        .await
        .unwrap();

        assert_eq!(record.match_type, MatchType::AiGenerated);
        assert_eq!(record.celebrity_name, "Keanu Reeves");
        assert_eq!(record.theme_name, "Global Celebrity or Icon");
        assert_eq!(record.votes, 1);
        assert!(record.famous_image_base64.is_none());
        assert!(record.custom_tags.is_none());
    }

    #[tokio::test]
    async fn ai_submission_without_image_is_rejected() {
        let repo = MemoryRepository::ready();
        let analyzer = StubAnalyzer::answering("x", "x");

        let err = submit_ai_match(
            &repo,
            &analyzer,
            &ctx(),
            AiSubmission {
                theme_id: "celebrity".to_string(),
                image: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmissionError::Validation(msg) if msg == "Please select an image."));
    }

    #[tokio::test]
    async fn unready_store_wins_over_missing_image() {
        let repo = MemoryRepository::unready();
        let analyzer = StubAnalyzer::answering("x", "x");

        let err = submit_ai_match(
            &repo,
            &analyzer,
            &SessionContext {
                user_id: "user-1".to_string(),
                store_ready: false,
            },
            AiSubmission {
                theme_id: "celebrity".to_string(),
                image: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmissionError::Store(RepoError::Unready)));
    }

    #[tokio::test]
    async fn filter_only_theme_is_not_open_for_submissions() {
        let repo = MemoryRepository::ready();
        let analyzer = StubAnalyzer::answering("x", "x");

        let err = submit_ai_match(
            &repo,
            &analyzer,
            &ctx(),
            AiSubmission {
                theme_id: "world_cup_squads".to_string(),
                image: image("aGVsbG8="),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn ai_and_store_failures_stay_distinguishable() {
        let failing_analyzer = StubAnalyzer::failing(SimilarityError::EmptyResponse);
        let repo = MemoryRepository::ready();
        let err = submit_ai_match(
            &repo,
            &failing_analyzer,
            &ctx(),
            AiSubmission {
                theme_id: "celebrity".to_string(),
                image: image("aGVsbG8="),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SubmissionError::Similarity(_)));

        let analyzer = StubAnalyzer::answering("x", "x");
        let broken_repo = MemoryRepository::ready();
        broken_repo.fail_creates();
        let err = submit_ai_match(
            &broken_repo,
            &analyzer,
            &ctx(),
            AiSubmission {
                theme_id: "celebrity".to_string(),
                image: image("aGVsbG8="),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SubmissionError::Store(_)));
    }
}
