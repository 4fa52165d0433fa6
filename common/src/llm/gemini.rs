//! Google Gemini `generateContent` client.
//!
//! Each stage keeps its own history; the client is stateless and replays the
//! history on every call, with the stage's system instruction sent as
//! `systemInstruction`.

use crate::error::{AskDbError, Result};
use crate::llm::message::{Message, MessageRole};
use crate::llm::provider::{ChatModel, ChatRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn build_request<'a>(request: &'a ChatRequest<'a>) -> GenerateRequest<'a> {
    let mut contents: Vec<Content<'a>> = request
        .history
        .iter()
        .map(|m: &'a Message| Content {
            role: Some(role_name(m.role)),
            parts: vec![Part { text: &m.content }],
        })
        .collect();

    contents.push(Content {
        role: Some(role_name(MessageRole::User)),
        parts: vec![Part {
            text: request.prompt,
        }],
    });

    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system,
            }],
        },
        contents,
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

/// concatenated text of the first candidate
fn response_text(response: GenerateResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(AskDbError::Provider(format!(
            "gemini returned no candidates: {}",
            reason
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AskDbError::Provider(format!(
            "gemini candidate had no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// map a non-2xx reply to an error. during the startup key check a 400, 401
/// or 403 means the key itself is bad, which is a configuration problem;
/// anything else, and every failure of a real call, is a provider error.
fn status_error(status: StatusCode, body: &str, preflight: bool) -> AskDbError {
    let rejected_key = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    );

    match (preflight, rejected_key) {
        (true, true) => AskDbError::Config(format!(
            "gemini rejected the api key (HTTP {}): {}",
            status,
            truncate(body, 200)
        )),
        (true, false) => AskDbError::Provider(format!(
            "gemini key check failed with HTTP {}: {}",
            status,
            truncate(body, 200)
        )),
        (false, _) => AskDbError::Provider(format!("HTTP {}: {}", status, truncate(body, 200))),
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AskDbError::Config("gemini api key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// startup preflight: look up `model` so a rejected key fails before any
    /// question is asked
    #[tracing::instrument(skip(self))]
    pub async fn verify_key(&self, model: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, model);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("gemini key accepted for {}", model);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body, true))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[tracing::instrument(
        skip(self, request),
        fields(llm.model = request.model, history_len = request.history.len())
    )]
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, request.model);
        let body = build_request(request);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!("gemini api error: {} - {}", status, truncate(&text, 500));
            return Err(status_error(status, &text, false));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            AskDbError::Provider(format!("could not decode gemini response: {}", e))
        })?;

        response_text(parsed)
    }
}
