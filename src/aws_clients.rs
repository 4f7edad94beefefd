use crate::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing;

// Creates the base AWS SDK configuration based on application config.
// Reads region and optional endpoint URL from `Config`.
// Uses the default credential provider chain (which reads env vars, profiles, etc.).
pub async fn create_sdk_config(config: &Config) -> SdkConfig {
    let region = Region::new(config.aws_region.clone());
    tracing::info!(sdk_region = %config.aws_region, "Setting SDK region");

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

    if let Some(endpoint_url) = &config.aws_endpoint {
        tracing::info!("Using local endpoint override: {}", endpoint_url);
        config_loader = config_loader.endpoint_url(endpoint_url);
    } else {
        tracing::info!("Using default AWS endpoints and credential resolution.");
    }

    config_loader.load().await
}

// Creates a DynamoDB client from a shared SdkConfig.
pub fn create_dynamodb_client(sdk_config: &SdkConfig) -> DynamoDbClient {
    DynamoDbClient::new(sdk_config)
}
