//! Extraction providers: the single point of entry for every third-party model call.
//!
//! ARCHITECTURAL RULE: no other module talks to a vendor API directly. Handlers and the
//! extraction service only see `Arc<dyn DocumentExtractionProvider>`, chosen at startup
//! from `EXTRACTION_PROVIDER`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::extraction::document::PdfDocument;

pub mod anthropic;
pub mod assistants;
pub mod openai;

#[cfg(test)]
pub(crate) mod test_support;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{stage} failed (status {status}): {message}")]
    Api {
        stage: &'static str,
        status: u16,
        message: String,
    },

    #[error("Provider returned no text content")]
    EmptyContent,

    #[error("Run ended with status '{status}': {message}")]
    RunTerminated { status: String, message: String },

    #[error("Run did not finish within {seconds}s")]
    PollTimeout { seconds: u64 },
}

/// API key for the extraction provider, supplied per request.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// `None` for blank input, so an empty form field counts as "no credential".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| ApiCredential(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

/// How the adapter gets the document in front of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// The PDF bytes are sent (inline or uploaded); the prompt names the file.
    Attachment,
    /// The caller extracts the text locally and embeds it in the prompt.
    InlineText,
}

/// One vendor integration. Implement this to add a provider without touching
/// handlers or the extraction service.
#[async_trait]
pub trait DocumentExtractionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn submission_mode(&self) -> SubmissionMode {
        SubmissionMode::Attachment
    }

    /// Delivers `document` and `instructions`, returning the model's raw text answer.
    async fn submit(
        &self,
        document: &PdfDocument,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAiResponses,
    OpenAiAssistants,
    OpenAiText,
}

impl ProviderKind {
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAiResponses => "openai-responses",
            ProviderKind::OpenAiAssistants => "openai-assistants",
            ProviderKind::OpenAiText => "openai-text",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai-responses" | "openai" => Ok(ProviderKind::OpenAiResponses),
            "openai-assistants" => Ok(ProviderKind::OpenAiAssistants),
            "openai-text" => Ok(ProviderKind::OpenAiText),
            other => Err(anyhow::anyhow!(
                "Unknown extraction provider '{other}' (expected anthropic, openai-responses, openai-assistants or openai-text)"
            )),
        }
    }
}

/// Everything needed to construct a provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

/// Constructs the configured adapter.
pub fn build_provider(
    settings: &ProviderSettings,
) -> anyhow::Result<Arc<dyn DocumentExtractionProvider>> {
    let client = Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .with_context(|| format!("building HTTP client for {} provider", settings.kind.id()))?;
    let model = settings.model.clone();
    let base_url = settings.base_url.clone();

    let provider: Arc<dyn DocumentExtractionProvider> = match settings.kind {
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(
            client,
            base_url.unwrap_or_else(|| anthropic::DEFAULT_BASE_URL.to_string()),
            model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
        )),
        ProviderKind::OpenAiResponses => Arc::new(openai::OpenAiResponsesProvider::new(
            openai::OpenAiHttp::new(client, base_url),
            model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
        )),
        ProviderKind::OpenAiText => Arc::new(openai::OpenAiTextProvider::new(
            openai::OpenAiHttp::new(client, base_url),
            model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
        )),
        ProviderKind::OpenAiAssistants => Arc::new(assistants::AssistantsProvider::new(
            openai::OpenAiHttp::new(client, base_url),
            model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            settings.poll_interval,
            settings.poll_timeout,
        )),
    };

    Ok(provider)
}

#[derive(Debug, Deserialize)]
struct VendorError {
    error: VendorErrorBody,
}

#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    message: String,
}

/// Passes successful responses through; turns anything else into `ProviderError::Api`
/// carrying the vendor's own error message when it sent one.
pub(crate) async fn check_status(
    response: Response,
    stage: &'static str,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<VendorError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(ProviderError::Api {
        stage,
        status: status.as_u16(),
        message,
    })
}
