use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error; // Use thiserror for cleaner error definitions
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database not ready for saving")]
    Unready,

    #[error("Match not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Stored match data is corrupt: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from the store layer
}

#[derive(Error, Debug)]
pub enum SimilarityError {
    /// The endpoint kept rate-limiting through every retry attempt.
    #[error("Similarity endpoint rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Any non-2xx, non-429 response; carries the response body as detail.
    #[error("API Error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Similarity request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response carried no text at all (e.g. safety-filtered).
    #[error("Could not extract text from similarity analysis")]
    EmptyResponse,
}

/// Failures of either submission variant. AI and store causes stay
/// distinct so user-facing messages can tell them apart.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    #[error("AI similarity analysis failed")]
    Similarity(#[from] SimilarityError),

    #[error("Could not save match data")]
    Store(#[from] RepoError),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Invalid match ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    // Domain/Service level errors
    #[error("Match not found with ID: {0}")]
    MatchNotFound(Uuid),
    #[error("Database not ready")]
    StoreUnready,
    #[error("AI similarity analysis failed")]
    SimilarityFailed(#[source] SimilarityError),
    #[error("Could not read or write match data")]
    RepositoryError(#[source] RepoError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Unready => AppError::StoreUnready,
            RepoError::NotFound(id) => AppError::MatchNotFound(id),
            e => AppError::RepositoryError(e),
        }
    }
}

impl From<SimilarityError> for AppError {
    fn from(err: SimilarityError) -> Self {
        AppError::SimilarityFailed(err)
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(msg) => AppError::Validation(msg),
            SubmissionError::UnknownTheme(id) => AppError::UnknownTheme(id),
            SubmissionError::Similarity(e) => AppError::SimilarityFailed(e),
            SubmissionError::Store(e) => e.into(),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing form field: {}", field),
            ),
            AppError::MultipartError(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart form data: {}", e),
            ),
            AppError::InvalidUuid(e) => {
                (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e))
            }
            AppError::UnknownTheme(id) => (StatusCode::BAD_REQUEST, format!("Unknown theme: {}", id)),
            AppError::MatchNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Match not found with ID: {}", id),
            ),

            // Readiness
            AppError::StoreUnready => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Database not ready. Try again once initialization completes.".to_string(),
            ),

            // Upstream failures. The AI and store causes must stay
            // distinguishable in the user-facing message.
            AppError::SimilarityFailed(e) => {
                tracing::error!(error.source = ?e, "Similarity analysis failed");
                (StatusCode::BAD_GATEWAY, format!("AI Error. Details: {}", e))
            }
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database Error. Details: {}", e),
                )
            }

            // 5xx Server Errors
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server initialization error".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        // Log the specific error variant and message
        tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");

        // Build JSON response
        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
