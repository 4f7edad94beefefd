//! Client for the generative similarity endpoint.
//!
//! Sends one image plus a theme prompt to the hosted generateContent API
//! and parses the free-text answer into a structured match guess.

use crate::domain::SimilarityAnalyzer;
use crate::errors::SimilarityError;
use crate::models::{InlineImage, SimilarityMatch};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.7;

/// Known lead-in phrases the model tends to open with. Stripping them is
/// best-effort: unrecognized phrasing passes through verbatim and callers
/// must tolerate noisy output.
const LEAD_INS: &[&str] = &[
    "The person in this image strongly resembles",
    "The person looks like",
    "You look like",
    "The match is",
    "You resemble",
    "The resemblance is to",
];

// --- Wire format (generateContent) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    data: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, if any.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

// --- Retry policy ---

/// Retry schedule for rate-limited requests: `max_attempts` total tries,
/// starting at `initial_delay` and doubling between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Deterministic doubling schedule. Randomization is disabled so the
    /// delays are exactly initial, 2x, 4x, ...
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(None)
            .build()
    }
}

// --- Client ---

pub struct GenerativeSimilarityClient {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl GenerativeSimilarityClient {
    pub fn new(endpoint: String) -> Result<Self, SimilarityError> {
        Self::with_retry(endpoint, RetryPolicy::default())
    }

    pub fn with_retry(endpoint: String, retry: RetryPolicy) -> Result<Self, SimilarityError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            retry,
        })
    }

    /// Posts the payload, retrying on HTTP 429 (and transport errors) with
    /// the doubling schedule, up to `max_attempts` total attempts. Any
    /// other non-2xx response fails immediately with the body as detail.
    async fn fetch_with_retry(
        &self,
        payload: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, SimilarityError> {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts;

        let response = backoff::future::retry(self.retry.schedule(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                let resp = self
                    .http
                    .post(&self.endpoint)
                    .json(payload)
                    .send()
                    .await
                    .map_err(|e| retryable(SimilarityError::from(e), attempt, max_attempts))?;

                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!(attempt, "Similarity endpoint rate limited");
                    return Err(retryable(
                        SimilarityError::RateLimited { attempts: attempt },
                        attempt,
                        max_attempts,
                    ));
                }
                let body = resp.text().await.unwrap_or_default();
                Err(backoff::Error::permanent(SimilarityError::Api {
                    status: status.as_u16(),
                    body,
                }))
            }
        })
        .await?;

        response.json().await.map_err(SimilarityError::from)
    }
}

fn retryable(
    err: SimilarityError,
    attempt: u32,
    max_attempts: u32,
) -> backoff::Error<SimilarityError> {
    if attempt < max_attempts {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

#[async_trait]
impl SimilarityAnalyzer for GenerativeSimilarityClient {
    async fn analyze(
        &self,
        image: &InlineImage,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<SimilarityMatch, SimilarityError> {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part {
                        text: Some(prompt),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            data: &image.data_base64,
                            mime_type: &image.mime_type,
                        }),
                    },
                ],
            }],
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: system_instruction,
                }],
            },
            config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self.fetch_with_retry(&payload).await?;
        let text = response.first_text().ok_or(SimilarityError::EmptyResponse)?;

        Ok(SimilarityMatch {
            celebrity_match: extract_match_name(&text),
            analysis: text,
        })
    }
}

/// Pulls a match name out of the model's free-text answer: the text up to
/// the first ". ", minus a recognized lead-in phrase and a trailing period.
pub fn extract_match_name(text: &str) -> String {
    let first_sentence = text.split(". ").next().unwrap_or(text).trim();

    let mut name = first_sentence;
    for lead_in in LEAD_INS {
        if let Some(head) = name.get(..lead_in.len()) {
            if head.eq_ignore_ascii_case(lead_in) {
                name = name[lead_in.len()..].trim_start();
                break;
            }
        }
    }

    name.strip_suffix('.').unwrap_or(name).trim().to_string()
}
