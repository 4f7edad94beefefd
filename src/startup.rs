use crate::errors::AppError;
use aws_sdk_dynamodb::{
    Client as DynamoDbClient,
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing;

/// Creates the match table if it doesn't exist.
async fn create_matches_table_if_not_exists(
    client: &DynamoDbClient,
    table_name: &str,
) -> Result<(), AppError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("id")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| AppError::InitError(format!("Failed to build attribute definition: {}", e)))?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("id")
                .key_type(KeyType::Hash)
                .build()
                .map_err(|e| AppError::InitError(format!("Failed to build key schema: {}", e)))?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating table '{}'", table_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, e)))
                }
            } else {
                let context = format!("Startup: SDK error creating table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Background bootstrap for the match store. Writes are rejected as
/// Unready until this completes and flips the readiness flag. On failure
/// the flag stays down and the service keeps reporting not-ready.
pub async fn bootstrap_store(client: DynamoDbClient, table_name: String, ready: Arc<AtomicBool>) {
    tracing::info!("Startup: Initializing match store...");
    match create_matches_table_if_not_exists(&client, &table_name).await {
        Ok(()) => {
            ready.store(true, Ordering::Release);
            tracing::info!("Startup: Match store ready.");
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup: Match store initialization failed; staying not-ready");
        }
    }
}
