//! In-memory fakes shared by the flow tests.

use crate::domain::{LIST_CAP, MatchRepository, SimilarityAnalyzer};
use crate::errors::{RepoError, SimilarityError};
use crate::models::{InlineImage, MatchRecord, MatchType, NewMatch, SimilarityMatch};
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use uuid::Uuid;

/// A match repository backed by a Vec, with injectable failures and call
/// counters for asserting flow behavior.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<MatchRecord>>,
    ready: AtomicBool,
    clock: AtomicI64,
    vote_calls: AtomicU32,
    create_fails: AtomicBool,
    vote_fails: AtomicBool,
}

impl MemoryRepository {
    pub fn ready() -> Self {
        let repo = Self::default();
        repo.ready.store(true, Ordering::SeqCst);
        repo
    }

    pub fn unready() -> Self {
        Self::default()
    }

    pub fn fail_creates(&self) {
        self.create_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_votes(&self) {
        self.vote_fails.store(true, Ordering::SeqCst);
    }

    pub fn recover_votes(&self) {
        self.vote_fails.store(false, Ordering::SeqCst);
    }

    pub fn vote_calls(&self) -> u32 {
        self.vote_calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Inserts a record directly, bypassing the create contract.
    pub fn seed_match(&self, theme_id: &str, votes: u64) -> Uuid {
        let mut record = record_with_votes(votes);
        record.theme_id = theme_id.to_string();
        record.timestamp = self.clock.fetch_add(1, Ordering::SeqCst);
        let id = record.id;
        self.records.lock().unwrap().push(record);
        id
    }
}

#[async_trait]
impl MatchRepository for MemoryRepository {
    async fn list(&self, theme_id: Option<&str>) -> Result<Vec<MatchRecord>, RepoError> {
        let mut matches: Vec<MatchRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|m| theme_id.is_none_or(|t| m.theme_id == t))
            .cloned()
            .collect();
        matches.truncate(LIST_CAP);
        Ok(matches)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<MatchRecord>, RepoError> {
        let mut matches = self.list(None).await?;
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn create(&self, new_match: NewMatch) -> Result<MatchRecord, RepoError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(RepoError::Unready);
        }
        if self.create_fails.load(Ordering::SeqCst) {
            return Err(RepoError::BackendError(anyhow!("injected create failure")));
        }
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
            timestamp: self.clock.fetch_add(1, Ordering::SeqCst),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn increment_vote(&self, id: Uuid) -> Result<u64, RepoError> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        if !self.ready.load(Ordering::SeqCst) {
            return Err(RepoError::Unready);
        }
        if self.vote_fails.load(Ordering::SeqCst) {
            return Err(RepoError::BackendError(anyhow!("injected vote failure")));
        }
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|m| m.id == id) {
            Some(record) => {
                record.votes += 1;
                Ok(record.votes)
            }
            None => Err(RepoError::NotFound(id)),
        }
    }
}

/// A similarity analyzer with a canned answer or a canned failure.
pub struct StubAnalyzer {
    celebrity: String,
    analysis: String,
    failure: Mutex<Option<SimilarityError>>,
}

impl StubAnalyzer {
    pub fn answering(celebrity: &str, analysis: &str) -> Self {
        Self {
            celebrity: celebrity.to_string(),
            analysis: analysis.to_string(),
            failure: Mutex::new(None),
        }
    }

    pub fn failing(error: SimilarityError) -> Self {
        Self {
            celebrity: String::new(),
            analysis: String::new(),
            failure: Mutex::new(Some(error)),
        }
    }
}

#[async_trait]
impl SimilarityAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _image: &InlineImage,
        _prompt: &str,
        _system_instruction: &str,
    ) -> Result<SimilarityMatch, SimilarityError> {
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        Ok(SimilarityMatch {
            celebrity_match: self.celebrity.clone(),
            analysis: self.analysis.clone(),
        })
    }
}

pub fn record_with_votes(votes: u64) -> MatchRecord {
    MatchRecord {
        id: Uuid::new_v4(),
        theme_id: "celebrity".to_string(),
        theme_name: "Global Celebrity or Icon".to_string(),
        celebrity_name: "Someone Famous".to_string(),
        analysis: "Striking resemblance.".to_string(),
        match_type: MatchType::AiGenerated,
        user_image_base64: "aGVsbG8=".to_string(),
        famous_image_base64: None,
        custom_tags: None,
        votes,
        voted_by: vec!["user-1".to_string()],
        creator_id: "user-1".to_string(),
        timestamp: 0,
    }
}
