//! Remote backend abstraction and the HTTP implementation.
//!
//! Search, summarization, and speech synthesis all happen on a remote
//! service. This module defines the [`Backend`] trait the workflow is written
//! against and [`HttpBackend`], which speaks the service's HTTP contract:
//!
//! | Call | Method | Path |
//! |------|--------|------|
//! | search | `POST` | `/search` (`{"query": ...}`) |
//! | summarize | `GET` | `/summarize/{index}` |
//! | summarize direct | `POST` | `/summarize-direct` (`{"paper_id": ...}`) |
//! | upload PDF | `POST` | `/upload-pdf` (multipart `file`) |
//! | register summary | `POST` | `/store-summary/{id}` (`{"summary": ...}`) |
//! | generate audio | `POST` | `/audio/{id}?t={cache-buster}` |
//! | health | `GET` | `/health` |
//!
//! Response bodies are returned as raw text; interpreting them is the job of
//! the parsers in [`crate::results`], [`crate::summary`], and [`crate::upload`].
//!
//! # Error bodies
//!
//! Non-success responses are turned into a [`BackendError::Status`] whose
//! message is decoded by [`describe_error_body`]: structured JSON first, then
//! plain text, then a generic status description.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::models::Identifier;

/// Longest response prefix written to debug logs.
const LOG_PREVIEW_CHARS: usize = 100;

/// Errors from a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (connection, timeout, body read).
    #[error("could not reach backend: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// The remote service the workflow drives.
///
/// Implementations must be cheap to share: the orchestrator holds one behind
/// an `Arc` and hands clones to detached registration tasks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a search and return the raw result listing.
    async fn search(&self, query: &str) -> Result<String, BackendError>;

    /// Summarize the result at `index` of the backend's latest search.
    async fn summarize(&self, index: &Identifier) -> Result<String, BackendError>;

    /// Summarize a paper given by URL or arXiv id.
    async fn summarize_direct(&self, paper_id: &str) -> Result<String, BackendError>;

    /// Upload a PDF and summarize it.
    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, BackendError>;

    /// Cache `summary` under `identifier` so audio can later be generated for it.
    async fn store_summary(&self, identifier: &Identifier, summary: &str) -> Result<(), BackendError>;

    /// Synthesize audio for the summary cached under `identifier`.
    async fn generate_audio(
        &self,
        identifier: &Identifier,
        cache_buster: u64,
    ) -> Result<(), BackendError>;

    /// URL under which the generated audio for `identifier` can be played.
    fn audio_url(&self, identifier: &Identifier, cache_buster: u64) -> String;

    /// Liveness check.
    async fn health(&self) -> Result<String, BackendError>;
}

/// [`Backend`] over HTTP.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    /// Separate client so synthesis can use its own, longer timeout.
    audio_client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let audio_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.audio_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            audio_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Download the audio behind a playback URL.
    pub async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        tracing::debug!(url, "GET audio");
        let response = self.audio_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn search(&self, query: &str) -> Result<String, BackendError> {
        tracing::debug!(query, "POST /search");
        let response = self
            .client
            .post(self.url("/search"))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        read_text("/search", response).await
    }

    async fn summarize(&self, index: &Identifier) -> Result<String, BackendError> {
        let path = format!("/summarize/{}", encode(index));
        tracing::debug!(%path, "GET");
        let response = self.client.get(self.url(&path)).send().await?;
        read_text(&path, response).await
    }

    async fn summarize_direct(&self, paper_id: &str) -> Result<String, BackendError> {
        tracing::debug!(paper_id, "POST /summarize-direct");
        let response = self
            .client
            .post(self.url("/summarize-direct"))
            .json(&json!({ "paper_id": paper_id }))
            .send()
            .await?;
        read_text("/summarize-direct", response).await
    }

    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        tracing::debug!(file_name, size = bytes.len(), "POST /upload-pdf");
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("/upload-pdf"))
            .multipart(form)
            .send()
            .await?;
        read_text("/upload-pdf", response).await
    }

    async fn store_summary(&self, identifier: &Identifier, summary: &str) -> Result<(), BackendError> {
        let path = format!("/store-summary/{}", encode(identifier));
        tracing::debug!(%path, "POST");
        let response = self
            .client
            .post(self.url(&path))
            .json(&json!({ "summary": summary }))
            .send()
            .await?;
        read_text(&path, response).await.map(|_| ())
    }

    async fn generate_audio(
        &self,
        identifier: &Identifier,
        cache_buster: u64,
    ) -> Result<(), BackendError> {
        let url = self.audio_url(identifier, cache_buster);
        tracing::debug!(%url, "POST audio");
        let response = self.audio_client.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        // The body is the audio itself; it is fetched again through the
        // playback URL when needed.
        Ok(())
    }

    fn audio_url(&self, identifier: &Identifier, cache_buster: u64) -> String {
        format!("{}/audio/{}?t={}", self.base_url, encode(identifier), cache_buster)
    }

    async fn health(&self) -> Result<String, BackendError> {
        let response = self.client.get(self.url("/health")).send().await?;
        read_text("/health", response).await
    }
}

fn encode(identifier: &Identifier) -> String {
    urlencoding::encode(identifier.as_str()).into_owned()
}

async fn read_text(path: &str, response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::debug!(path, %status, "backend error response");
        return Err(status_error(status, &body));
    }
    tracing::debug!(path, response = %preview(&body), "backend response");
    Ok(body)
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    BackendError::Status {
        status: status.as_u16(),
        message: describe_error_body(status, body),
    }
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Turn an error response body into a user-facing message.
///
/// Tries, in order: a JSON `detail` field (FastAPI style; strings are used
/// as-is, anything else is rendered as compact JSON), `error.message`,
/// `message`, a string `error`; then the trimmed body as plain text; then
/// `"Request failed with status <code> <reason>"`.
pub fn describe_error_body(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let structured = match map.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
        .or_else(|| {
            map.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| map.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| map.get("error").and_then(Value::as_str).map(str::to_string));

        if let Some(message) = structured.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    match status.canonical_reason() {
        Some(reason) => format!("Request failed with status {} {}", status.as_u16(), reason),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}
