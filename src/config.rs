use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

pub const DEFAULT_SIMILARITY_MODEL: &str = "gemini-2.5-flash-preview-05-20";

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    /// Tenant identifier scoping the public match collection.
    pub app_id: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack / DynamoDB Local
    pub aws_endpoint: Option<String>,
    pub similarity_base_url: String,
    pub similarity_model: String,
    pub similarity_api_key: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let app_id = env::var("DOPPELVERSE_APP_ID")
            .unwrap_or_else(|_| "default-double-finder-app".to_string());

        let aws_region = env::var("AWS_DEFAULT_REGION")
            .unwrap_or_else(|_| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let aws_endpoint = env::var("AWS_ENDPOINT_URL").ok(); // Optional

        let similarity_base_url = env::var("SIMILARITY_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        let similarity_model =
            env::var("SIMILARITY_MODEL").unwrap_or_else(|_| DEFAULT_SIMILARITY_MODEL.to_string());
        let similarity_api_key = env::var("SIMILARITY_API_KEY")
            .map_err(|_| ConfigError::MissingVar("SIMILARITY_API_KEY".into()))?;

        Ok(Config {
            bind_address,
            app_id,
            aws_region,
            aws_endpoint,
            similarity_base_url,
            similarity_model,
            similarity_api_key,
        })
    }

    /// Table name backing the public match collection, derived from the
    /// collection path `/artifacts/{app_id}/public/data/doubles_ratings`.
    pub fn matches_table_name(&self) -> String {
        format!("artifacts.{}.public.data.doubles_ratings", self.app_id)
    }

    /// Full generateContent endpoint URL for the configured model.
    pub fn similarity_endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.similarity_base_url, self.similarity_model, self.similarity_api_key
        )
    }
}
