use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws_clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod leaderboard;
mod models;
mod repositories;
mod routes;
mod similarity;
mod startup;
mod submission;
mod subscriptions;
#[cfg(test)]
mod testutil;
mod themes;
mod voting;

use crate::config::Config;
use crate::domain::{MatchRepository, SimilarityAnalyzer};
use crate::errors::AppError;
use crate::repositories::DynamoDbMatchRepository;
use crate::similarity::GenerativeSimilarityClient;
use crate::subscriptions::ChangeFeed;
use crate::voting::VoteLedger;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub match_repo: Arc<dyn MatchRepository>,
    pub analyzer: Arc<dyn SimilarityAnalyzer>,
    pub ledger: VoteLedger,
    pub feed: ChangeFeed,
    store_ready: Arc<AtomicBool>,
}

impl AppState {
    /// Whether the store bootstrap has completed.
    pub fn store_ready(&self) -> bool {
        self.store_ready.load(Ordering::Acquire)
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "doppelverse=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(app_id = %config.app_id, "Starting Doppelverse service");

    // --- AWS Client Initialization ---
    let sdk_config = aws_clients::create_sdk_config(&config).await;
    let db_client = aws_clients::create_dynamodb_client(&sdk_config);

    let table_name = config.matches_table_name();
    let store_ready = Arc::new(AtomicBool::new(false));

    // Serve immediately; the table bootstrap flips readiness when it
    // completes, and writes are rejected as Unready until then.
    tokio::spawn(startup::bootstrap_store(
        db_client.clone(),
        table_name.clone(),
        store_ready.clone(),
    ));

    let match_repo: Arc<dyn MatchRepository> = Arc::new(DynamoDbMatchRepository::new(
        db_client,
        table_name,
        store_ready.clone(),
    ));
    let analyzer: Arc<dyn SimilarityAnalyzer> = Arc::new(
        GenerativeSimilarityClient::new(config.similarity_endpoint())
            .map_err(|e| AppError::InitError(format!("Failed to build similarity client: {}", e)))?,
    );

    // --- Application State ---
    let state = Arc::new(AppState {
        match_repo,
        analyzer,
        ledger: VoteLedger::new(),
        feed: ChangeFeed::new(),
        store_ready,
    });

    // --- Router Definition ---
    let app = routes::create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .map_err(|e| {
            AppError::InitError(format!("Failed to bind {}: {}", config.bind_address, e))
        })?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Server error: {}", e)))?;

    Ok(())
}
