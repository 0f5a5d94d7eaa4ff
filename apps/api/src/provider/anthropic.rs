//! Anthropic Messages API adapter. The PDF travels inline as a base64 `document` block,
//! so the whole exchange is one HTTP call.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::document::{PdfDocument, PDF_MEDIA_TYPE};
use crate::extraction::prompts::EXTRACTION_SYSTEM;
use crate::provider::{check_status, ApiCredential, DocumentExtractionProvider, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Document { source: DocumentSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct DocumentSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(client: Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl DocumentExtractionProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn submit(
        &self,
        document: &PdfDocument,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: EXTRACTION_SYSTEM,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Document {
                        source: DocumentSource {
                            kind: "base64",
                            media_type: PDF_MEDIA_TYPE,
                            data: base64::engine::general_purpose::STANDARD
                                .encode(&document.bytes),
                        },
                    },
                    ContentPart::Text { text: instructions },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await?;
        let response = check_status(response, "message generation").await?;

        let body: MessagesResponse = response.json().await?;
        if let Some(usage) = &body.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic extraction call succeeded"
            );
        }

        body.text()
            .map(str::to_string)
            .ok_or(ProviderError::EmptyContent)
    }
}
