use crate::{
    domain::{LIST_CAP, MatchRepository},
    errors::RepoError,
    models::{MatchRecord, MatchType, NewMatch},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client as DynamoDbClient,
    error::SdkError,
    types::{AttributeValue, ReturnValue},
};
use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbMatchRepository {
    client: DynamoDbClient,
    table_name: String, // Store the table name
    /// Flipped by the startup bootstrap once the table is known to exist.
    ready: Arc<AtomicBool>,
}

impl DynamoDbMatchRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String, ready: Arc<AtomicBool>) -> Self {
        info!(%table_name, "Initializing DynamoDbMatchRepository");
        Self {
            client,
            table_name,
            ready,
        }
    }

    fn ensure_ready(&self) -> Result<(), RepoError> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RepoError::Unready)
        }
    }

    fn parse_items(&self, items: Vec<HashMap<String, AttributeValue>>) -> Result<Vec<MatchRecord>, RepoError> {
        let mut matches = Vec::with_capacity(items.len());
        for item in items {
            match item_to_match(&item) {
                Some(record) => matches.push(record),
                None => {
                    let item_id = item.get("id").and_then(|v| v.as_s().ok());
                    tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item into MatchRecord");
                    // Fail fast if data in the table is corrupt
                    return Err(RepoError::DataCorruption(format!(
                        "Failed to parse item {:?} from table '{}'",
                        item_id, self.table_name
                    )));
                }
            }
        }
        Ok(matches)
    }
}

#[async_trait]
impl MatchRepository for DynamoDbMatchRepository {
    /// Lists up to [`LIST_CAP`] matches using a bounded Scan, with a
    /// server-side filter expression when a theme is given.
    async fn list(&self, theme_id: Option<&str>) -> Result<Vec<MatchRecord>, RepoError> {
        tracing::debug!(table_name = %self.table_name, theme = ?theme_id, "DynamoDB: Scanning matches");

        let mut request_builder = self.client.scan().table_name(&self.table_name).limit(LIST_CAP as i32);
        if let Some(theme) = theme_id {
            request_builder = request_builder
                .filter_expression("themeId = :theme")
                .expression_attribute_values(":theme", AttributeValue::S(theme.to_string()));
        }

        let resp = request_builder
            .send()
            .await
            .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
            .map_err(RepoError::BackendError)?;

        let matches = self.parse_items(resp.items.unwrap_or_default())?;
        tracing::info!(table_name = %self.table_name, count = matches.len(), "DynamoDB: Listed matches");
        Ok(matches)
    }

    /// Lists the most recent matches. The bounded fetch is unordered, so the
    /// gateway itself guarantees the timestamp-descending contract.
    async fn list_recent(&self, limit: usize) -> Result<Vec<MatchRecord>, RepoError> {
        let mut matches = self.list(None).await?;
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches.truncate(limit);
        Ok(matches)
    }

    /// Stores a new match using PutItem, assigning id, votes, votedBy and
    /// timestamp at write time.
    async fn create(&self, new_match: NewMatch) -> Result<MatchRecord, RepoError> {
        self.ensure_ready()?;

        let record = MatchRecord {
            id: Uuid::new_v4(),
            theme_id: new_match.theme_id,
            theme_name: new_match.theme_name,
            celebrity_name: new_match.celebrity_name,
            analysis: new_match.analysis,
            match_type: new_match.match_type,
            user_image_base64: new_match.user_image_base64,
            famous_image_base64: new_match.famous_image_base64,
            custom_tags: new_match.custom_tags,
            votes: 1,
            voted_by: vec![new_match.creator_id.clone()],
            creator_id: new_match.creator_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let mut request_builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("id", AttributeValue::S(record.id.to_string()))
            .item("themeId", AttributeValue::S(record.theme_id.clone()))
            .item("themeName", AttributeValue::S(record.theme_name.clone()))
            .item("celebrityName", AttributeValue::S(record.celebrity_name.clone()))
            .item("analysis", AttributeValue::S(record.analysis.clone()))
            .item("matchType", AttributeValue::S(match_type_tag(record.match_type).to_string()))
            .item("userImageBase64", AttributeValue::S(record.user_image_base64.clone()))
            .item("votes", AttributeValue::N(record.votes.to_string()))
            .item("votedBy", AttributeValue::Ss(record.voted_by.clone()))
            .item("creatorId", AttributeValue::S(record.creator_id.clone()))
            .item("timestamp", AttributeValue::N(record.timestamp.to_string()));

        if let Some(famous) = &record.famous_image_base64 {
            request_builder = request_builder.item("famousImageBase64", AttributeValue::S(famous.clone()));
        }
        if let Some(tags) = &record.custom_tags {
            // A list attribute, not a set: tag order is part of the record.
            let values = tags.iter().map(|t| AttributeValue::S(t.clone())).collect();
            request_builder = request_builder.item("customTags", AttributeValue::L(values));
        }

        request_builder
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to put match (id: {})",
                self.table_name, record.id
            ))
            .map_err(RepoError::BackendError)?;

        tracing::info!(match_id = %record.id, table_name = %self.table_name, "DynamoDB: Match stored");
        Ok(record)
    }

    /// Bumps a match's vote counter with a single atomic ADD expression.
    async fn increment_vote(&self, id: Uuid) -> Result<u64, RepoError> {
        self.ensure_ready()?;
        let id_str = id.to_string();

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id_str.clone()))
            .update_expression("ADD votes :one")
            .condition_expression("attribute_exists(id)")
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        tracing::warn!(match_id = %id_str, "DynamoDB: Vote for unknown match");
                        return Err(RepoError::NotFound(id));
                    }
                }
                return Err(RepoError::BackendError(anyhow::Error::new(e).context(
                    format!(
                        "DynamoDB (table: {}): Failed to increment votes (id: {})",
                        self.table_name, id_str
                    ),
                )));
            }
        };

        let new_votes = resp
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get("votes"))
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| {
                RepoError::DataCorruption(format!(
                    "Vote counter for match {} came back unreadable",
                    id_str
                ))
            })?;

        tracing::debug!(match_id = %id_str, votes = new_votes, "DynamoDB: Vote recorded");
        Ok(new_votes)
    }
}

fn match_type_tag(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::AiGenerated => "ai_generated",
        MatchType::UserSuggested => "user_suggested",
    }
}

fn parse_match_type(tag: &str) -> Option<MatchType> {
    match tag {
        "ai_generated" => Some(MatchType::AiGenerated),
        "user_suggested" => Some(MatchType::UserSuggested),
        _ => None,
    }
}

// Helper function to convert a DynamoDB item map to a MatchRecord.
// Remains internal to this module.
fn item_to_match(item: &HashMap<String, AttributeValue>) -> Option<MatchRecord> {
    let id = item
        .get("id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let theme_id = item.get("themeId")?.as_s().ok()?.to_string();
    let theme_name = item.get("themeName")?.as_s().ok()?.to_string();
    let celebrity_name = item.get("celebrityName")?.as_s().ok()?.to_string();
    let analysis = item.get("analysis")?.as_s().ok()?.to_string();
    let match_type = parse_match_type(item.get("matchType")?.as_s().ok()?)?;
    let user_image_base64 = item.get("userImageBase64")?.as_s().ok()?.to_string();
    let votes = item.get("votes")?.as_n().ok()?.parse::<u64>().ok()?;
    let voted_by = item.get("votedBy")?.as_ss().ok()?.clone();
    let creator_id = item.get("creatorId")?.as_s().ok()?.to_string();
    let timestamp = item.get("timestamp")?.as_n().ok()?.parse::<i64>().ok()?;

    let famous_image_base64 = match item.get("famousImageBase64") {
        Some(av) => Some(av.as_s().ok()?.to_string()),
        None => None,
    };
    let custom_tags = match item.get("customTags") {
        Some(av) => {
            let values = av.as_l().ok()?;
            let mut tags = Vec::with_capacity(values.len());
            for value in values {
                tags.push(value.as_s().ok()?.to_string());
            }
            Some(tags)
        }
        None => None,
    };

    Some(MatchRecord {
        id,
        theme_id,
        theme_name,
        celebrity_name,
        analysis,
        match_type,
        user_image_base64,
        famous_image_base64,
        custom_tags,
        votes,
        voted_by,
        creator_id,
        timestamp,
    })
}
